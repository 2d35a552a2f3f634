use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::catalog::{AssessmentCatalog, ResolvedAssessment};
use super::insights::Insight;
use super::questions::QuestionResponse;
use super::repository::{AssessmentResult, ResultStore, SessionStore};
use super::scoring::AssessmentScores;
use super::session::{AssessmentSession, ProcessingError, SessionError, SessionKey};
use super::validation::ValidationError;
use crate::store::{acquire, Clock, RepositoryError, SubjectLocks, SystemClock};

/// Drives assessment sessions against injected session and result stores.
pub struct AssessmentService<S, T> {
    catalog: Arc<AssessmentCatalog>,
    sessions: Arc<S>,
    results: Arc<T>,
    clock: Arc<dyn Clock>,
    locks: SubjectLocks<SessionKey>,
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("unknown assessment `{0}`")]
    UnknownAssessment(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<SessionError> for AssessmentError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Validation(error) => Self::Validation(error),
            SessionError::Processing(error) => Self::Processing(error),
        }
    }
}

impl<S, T> AssessmentService<S, T>
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    pub fn new(catalog: Arc<AssessmentCatalog>, sessions: Arc<S>, results: Arc<T>) -> Self {
        Self::with_clock(catalog, sessions, results, Arc::new(SystemClock))
    }

    pub fn with_clock(
        catalog: Arc<AssessmentCatalog>,
        sessions: Arc<S>,
        results: Arc<T>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            sessions,
            results,
            clock,
            locks: SubjectLocks::default(),
        }
    }

    pub fn catalog(&self) -> &AssessmentCatalog {
        &self.catalog
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn definition(&self, tool_id: &str) -> Result<Arc<ResolvedAssessment>, AssessmentError> {
        self.catalog
            .get(tool_id)
            .ok_or_else(|| AssessmentError::UnknownAssessment(tool_id.to_string()))
    }

    /// Resumes the stored session, or starts a fresh one when none exists or the
    /// stored one has already been archived as a result.
    pub fn start_session(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<AssessmentSession, AssessmentError> {
        self.definition(tool_id)?;
        let key = SessionKey::new(tool_id, user_id);
        let handle = self.locks.handle(&key)?;
        let _guard = acquire(&handle)?;

        if let Some(session) = self.sessions.load(&key)? {
            if !session.is_archived() {
                debug!(session = %key, index = session.current_index, "resuming assessment session");
                return Ok(session);
            }
        }

        let session = AssessmentSession::new(&key, self.clock.now());
        self.sessions.save(session.clone())?;
        info!(session = %key, "assessment session started");
        Ok(session)
    }

    pub fn submit_response(
        &self,
        tool_id: &str,
        user_id: &str,
        response: QuestionResponse,
    ) -> Result<AssessmentSession, AssessmentError> {
        self.update(tool_id, user_id, |assessment, session, now| {
            let was_completed = session.is_completed;
            session.record_response(assessment.definition(), response, now)?;
            if session.is_completed && !was_completed {
                info!(tool_id, user_id, "all required questions answered");
            }
            Ok(())
        })
    }

    pub fn next_question(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<AssessmentSession, AssessmentError> {
        self.update(tool_id, user_id, |assessment, session, now| {
            session.next_question(assessment.definition(), now);
            Ok(())
        })
    }

    pub fn previous_question(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<AssessmentSession, AssessmentError> {
        self.update(tool_id, user_id, |assessment, session, now| {
            session.previous_question(assessment.definition(), now)?;
            Ok(())
        })
    }

    /// Persists the current snapshot unchanged apart from `last_updated_at`.
    pub fn save_progress(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<AssessmentSession, AssessmentError> {
        self.update(tool_id, user_id, |_, session, now| {
            session.touch(now);
            Ok(())
        })
    }

    pub fn is_complete(&self, tool_id: &str, user_id: &str) -> Result<bool, AssessmentError> {
        let assessment = self.definition(tool_id)?;
        let session = self.session(tool_id, user_id)?;
        Ok(session.is_complete(assessment.definition()))
    }

    /// Scores the responses given so far; the session does not need to be complete.
    pub fn calculate_scores(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<AssessmentScores, AssessmentError> {
        let assessment = self.definition(tool_id)?;
        let session = self.session(tool_id, user_id)?;
        Ok(assessment.score(&session.responses))
    }

    pub fn generate_insights(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<Vec<Insight>, AssessmentError> {
        let assessment = self.definition(tool_id)?;
        let session = self.session(tool_id, user_id)?;
        let scores = assessment.score(&session.responses);
        Ok(assessment.insights(&scores))
    }

    /// Scores a complete session, appends the result and archives the session.
    pub fn complete_assessment(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<AssessmentResult, AssessmentError> {
        let assessment = self.definition(tool_id)?;
        let definition = assessment.definition();
        let key = SessionKey::new(tool_id, user_id);
        let handle = self.locks.handle(&key)?;
        let _guard = acquire(&handle)?;

        let mut session = self.load(&key)?;
        if let Some(result_id) = &session.result_id {
            return Err(ProcessingError::AlreadyArchived(result_id.clone()).into());
        }
        if !session.is_complete(definition) {
            let (answered, required) = session.answered_required(definition);
            return Err(ProcessingError::Incomplete { answered, required }.into());
        }

        let completed_at = self.clock.now();
        let scores = assessment.score(&session.responses);
        let result = AssessmentResult {
            id: AssessmentResult::result_id(&key, completed_at),
            tool_id: key.tool_id.clone(),
            user_id: key.user_id.clone(),
            insights: assessment.insights(&scores),
            recommendations: assessment.recommendations(&scores),
            scores,
            completed_at,
            started_at: session.started_at,
            time_spent_seconds: session.time_spent_seconds,
            response_count: session.responses.len(),
        };
        self.results.append(result.clone())?;

        session.result_id = Some(result.id.clone());
        session.touch(completed_at);
        self.sessions.save(session)?;

        info!(
            session = %key,
            result_id = %result.id,
            percentage = result.scores.percentage,
            tier = result.scores.tier.as_ref().map(|tier| tier.id.as_str()),
            "assessment completed"
        );
        Ok(result)
    }

    /// Drops the stored snapshot; archived results are kept.
    pub fn clear_session(&self, tool_id: &str, user_id: &str) -> Result<(), AssessmentError> {
        self.definition(tool_id)?;
        let key = SessionKey::new(tool_id, user_id);
        let handle = self.locks.handle(&key)?;
        let _guard = acquire(&handle)?;
        self.sessions.delete(&key)?;
        info!(session = %key, "assessment session cleared");
        Ok(())
    }

    pub fn session(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<AssessmentSession, AssessmentError> {
        self.definition(tool_id)?;
        self.load(&SessionKey::new(tool_id, user_id))
    }

    pub fn results(
        &self,
        tool_id: &str,
        user_id: &str,
    ) -> Result<Vec<AssessmentResult>, AssessmentError> {
        self.definition(tool_id)?;
        Ok(self.results.list(&SessionKey::new(tool_id, user_id))?)
    }

    fn load(&self, key: &SessionKey) -> Result<AssessmentSession, AssessmentError> {
        self.sessions
            .load(key)?
            .ok_or_else(|| ProcessingError::NoSession(key.clone()).into())
    }

    /// Locked load-modify-save of one session snapshot.
    fn update<F>(
        &self,
        tool_id: &str,
        user_id: &str,
        apply: F,
    ) -> Result<AssessmentSession, AssessmentError>
    where
        F: FnOnce(
            &ResolvedAssessment,
            &mut AssessmentSession,
            DateTime<Utc>,
        ) -> Result<(), AssessmentError>,
    {
        let assessment = self.definition(tool_id)?;
        let key = SessionKey::new(tool_id, user_id);
        let handle = self.locks.handle(&key)?;
        let _guard = acquire(&handle)?;

        let mut session = self.load(&key)?;
        apply(assessment.as_ref(), &mut session, self.clock.now())?;
        self.sessions.save(session.clone())?;
        Ok(session)
    }
}
