use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::AssessmentDefinition;
use super::questions::QuestionResponse;
use super::validation::{validate_answer, ValidationError};

/// One session record exists per tool and user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub tool_id: String,
    pub user_id: String,
}

impl SessionKey {
    pub fn new(tool_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tool_id, self.user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    InProgress,
    Completed,
}

/// Requests that are well-formed but not allowed in the session's current state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessingError {
    #[error("no assessment session for {0}")]
    NoSession(SessionKey),
    #[error("assessment incomplete: {answered} of {required} required questions answered")]
    Incomplete { answered: usize, required: usize },
    #[error("assessment already archived as result `{0}`")]
    AlreadyArchived(String),
    #[error("back navigation is disabled for this assessment")]
    NavigationLocked,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

/// Full, persistable snapshot of one user's run through an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSession {
    pub tool_id: String,
    pub user_id: String,
    pub state: SessionState,
    pub current_index: usize,
    pub responses: Vec<QuestionResponse>,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub completion_rate: f64,
    pub time_spent_seconds: u64,
    pub is_completed: bool,
    /// Set once a result has been produced; the session is then archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
}

impl AssessmentSession {
    pub fn new(key: &SessionKey, now: DateTime<Utc>) -> Self {
        Self {
            tool_id: key.tool_id.clone(),
            user_id: key.user_id.clone(),
            state: SessionState::Created,
            current_index: 0,
            responses: Vec::new(),
            started_at: now,
            last_updated_at: now,
            completion_rate: 0.0,
            time_spent_seconds: 0,
            is_completed: false,
            result_id: None,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.tool_id.clone(), self.user_id.clone())
    }

    pub fn is_archived(&self) -> bool {
        self.result_id.is_some()
    }

    pub fn response(&self, question_id: &str) -> Option<&QuestionResponse> {
        self.responses
            .iter()
            .find(|response| response.question_id == question_id)
    }

    /// Validates and upserts a response, then advances the lifecycle.
    ///
    /// Completed sessions keep accepting corrections and optional answers until
    /// they are archived. An empty answer to an optional question withdraws any
    /// earlier response.
    pub fn record_response(
        &mut self,
        definition: &AssessmentDefinition,
        response: QuestionResponse,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if let Some(result_id) = &self.result_id {
            return Err(ProcessingError::AlreadyArchived(result_id.clone()).into());
        }

        let question = definition
            .question(&response.question_id)
            .ok_or_else(|| ValidationError::UnknownQuestion(response.question_id.clone()))?;
        validate_answer(question, &response.answer)?;

        self.time_spent_seconds += u64::from(response.time_spent_seconds);
        let existing = self
            .responses
            .iter()
            .position(|candidate| candidate.question_id == response.question_id);
        match (existing, response.answer.is_empty()) {
            (Some(index), true) => {
                self.responses.remove(index);
            }
            (None, true) => {}
            (Some(index), false) => self.responses[index] = response,
            (None, false) => self.responses.push(response),
        }

        self.refresh(definition, now);
        Ok(())
    }

    /// Moves forward one question, stopping at the last one.
    pub fn next_question(&mut self, definition: &AssessmentDefinition, now: DateTime<Utc>) -> usize {
        if self.current_index + 1 < definition.questions.len() {
            self.current_index += 1;
        }
        self.last_updated_at = now;
        self.current_index
    }

    pub fn previous_question(
        &mut self,
        definition: &AssessmentDefinition,
        now: DateTime<Utc>,
    ) -> Result<usize, ProcessingError> {
        if !definition.allow_back_navigation {
            return Err(ProcessingError::NavigationLocked);
        }
        self.current_index = self.current_index.saturating_sub(1);
        self.last_updated_at = now;
        Ok(self.current_index)
    }

    /// True once every required question has a response.
    pub fn is_complete(&self, definition: &AssessmentDefinition) -> bool {
        definition
            .required_questions()
            .all(|question| self.response(&question.id).is_some())
    }

    pub fn answered_required(&self, definition: &AssessmentDefinition) -> (usize, usize) {
        let mut answered = 0;
        let mut required = 0;
        for question in definition.required_questions() {
            required += 1;
            if self.response(&question.id).is_some() {
                answered += 1;
            }
        }
        (answered, required)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated_at = now;
    }

    fn refresh(&mut self, definition: &AssessmentDefinition, now: DateTime<Utc>) {
        let total = definition.questions.len();
        self.completion_rate = if total == 0 {
            0.0
        } else {
            (self.responses.len() as f64 / total as f64).clamp(0.0, 1.0)
        };
        self.is_completed = self.is_complete(definition);
        self.state = if self.is_completed {
            SessionState::Completed
        } else {
            SessionState::InProgress
        };
        self.last_updated_at = now;
    }
}
