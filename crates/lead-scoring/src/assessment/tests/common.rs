use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::assessment::catalog::AssessmentCatalog;
use crate::assessment::config::{
    AssessmentDefinition, CategoryDefinition, ResultTier, ScoringConfig,
};
use crate::assessment::questions::{Answer, ChoiceOption, Question, QuestionKind, QuestionResponse};
use crate::assessment::repository::{AssessmentResult, ResultStore, SessionStore};
use crate::assessment::service::AssessmentService;
use crate::assessment::session::{AssessmentSession, SessionKey};
use crate::assessment::strategy::StrategyRegistry;
use crate::store::{Clock, RepositoryError};

pub(super) const TOOL: &str = "growth-mindset";
pub(super) const USER: &str = "user-1";

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Manually advanced clock.
pub(super) struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

pub(super) fn scale(id: &str, min: i32, max: i32, category: Option<&str>) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("Rate {id}"),
        required: true,
        weight: None,
        category: category.map(str::to_string),
        kind: QuestionKind::Scale {
            min,
            max,
            labels: Default::default(),
        },
    }
}

pub(super) fn choice(id: &str, options: &[(&str, f64)], category: Option<&str>) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("Pick {id}"),
        required: true,
        weight: None,
        category: category.map(str::to_string),
        kind: QuestionKind::MultipleChoice {
            options: options
                .iter()
                .map(|(option, score)| ChoiceOption {
                    id: option.to_string(),
                    label: option.to_uppercase(),
                    score: *score,
                })
                .collect(),
            allow_multiple: false,
        },
    }
}

pub(super) fn optional_text(id: &str) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("Describe {id}"),
        required: false,
        weight: None,
        category: None,
        kind: QuestionKind::Text {
            min_length: 0,
            max_length: Some(200),
        },
    }
}

pub(super) fn tier(id: &str, min: f64, max: f64) -> ResultTier {
    ResultTier {
        id: id.to_string(),
        label: id.replace('-', " "),
        min_percentage: min,
        max_percentage: max,
        description: format!("{id} description"),
        insights: vec![format!("{id} insight")],
        recommendations: vec![format!("{id} next step"), "Revisit in 30 days".to_string()],
    }
}

pub(super) fn standard_tiers() -> Vec<ResultTier> {
    vec![
        tier("fixed", 0.0, 39.0),
        tier("developing", 40.0, 69.0),
        tier("growth", 70.0, 100.0),
    ]
}

/// Two categories (resilience, curiosity) plus an optional reflection.
pub(super) fn mindset_definition() -> AssessmentDefinition {
    AssessmentDefinition {
        tool_id: TOOL.to_string(),
        title: "Growth Mindset".to_string(),
        description: String::new(),
        questions: vec![
            scale("persist", 1, 5, Some("resilience")),
            choice(
                "feedback",
                &[("avoid", 0.0), ("consider", 2.0), ("seek", 4.0)],
                Some("resilience"),
            ),
            scale("challenge", 1, 5, Some("curiosity")),
            optional_text("reflection"),
        ],
        scoring: ScoringConfig::CategoryBased {
            categories: vec![
                CategoryDefinition {
                    id: "resilience".to_string(),
                    name: "Resilience".to_string(),
                    weight: 1.0,
                    question_ids: vec!["persist".to_string(), "feedback".to_string()],
                },
                CategoryDefinition {
                    id: "curiosity".to_string(),
                    name: "Curiosity".to_string(),
                    weight: 1.0,
                    question_ids: vec!["challenge".to_string()],
                },
            ],
        },
        result_tiers: standard_tiers(),
        allow_back_navigation: true,
        insight_strategy: None,
    }
}

pub(super) fn simple_definition(tool_id: &str, questions: Vec<Question>) -> AssessmentDefinition {
    AssessmentDefinition {
        tool_id: tool_id.to_string(),
        title: tool_id.to_string(),
        description: String::new(),
        questions,
        scoring: ScoringConfig::Simple,
        result_tiers: standard_tiers(),
        allow_back_navigation: false,
        insight_strategy: None,
    }
}

pub(super) fn response(question_id: &str, answer: Answer, seconds: u32) -> QuestionResponse {
    QuestionResponse {
        question_id: question_id.to_string(),
        answer,
        time_spent_seconds: seconds,
        timestamp: base_time(),
    }
}

pub(super) fn pick(option: &str) -> Answer {
    Answer::Choice(vec![option.to_string()])
}

pub(super) type TestService = AssessmentService<MemorySessions, MemoryResults>;

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) sessions: Arc<MemorySessions>,
    pub(super) results: Arc<MemoryResults>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn harness(definitions: Vec<AssessmentDefinition>) -> Harness {
    let catalog = AssessmentCatalog::from_definitions(StrategyRegistry::new(), definitions)
        .expect("valid catalog");
    let sessions = Arc::new(MemorySessions::default());
    let results = Arc::new(MemoryResults::default());
    let clock = Arc::new(FixedClock::new(base_time()));
    let service = AssessmentService::with_clock(
        Arc::new(catalog),
        sessions.clone(),
        results.clone(),
        clock.clone(),
    );
    Harness {
        service,
        sessions,
        results,
        clock,
    }
}

/// Keeps snapshots as JSON text so every load goes through serde.
#[derive(Default)]
pub(super) struct MemorySessions {
    snapshots: Mutex<HashMap<SessionKey, String>>,
}

impl MemorySessions {
    pub(super) fn len(&self) -> usize {
        self.snapshots.lock().expect("session mutex poisoned").len()
    }
}

impl SessionStore for MemorySessions {
    fn load(&self, key: &SessionKey) -> Result<Option<AssessmentSession>, RepositoryError> {
        let guard = self.snapshots.lock().expect("session mutex poisoned");
        guard
            .get(key)
            .map(|raw| {
                serde_json::from_str(raw)
                    .map_err(|error| RepositoryError::Unavailable(error.to_string()))
            })
            .transpose()
    }

    fn save(&self, session: AssessmentSession) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(&session)
            .map_err(|error| RepositoryError::Unavailable(error.to_string()))?;
        let mut guard = self.snapshots.lock().expect("session mutex poisoned");
        guard.insert(session.key(), raw);
        Ok(())
    }

    fn delete(&self, key: &SessionKey) -> Result<(), RepositoryError> {
        let mut guard = self.snapshots.lock().expect("session mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryResults {
    results: Mutex<Vec<AssessmentResult>>,
}

impl ResultStore for MemoryResults {
    fn append(&self, result: AssessmentResult) -> Result<(), RepositoryError> {
        let mut guard = self.results.lock().expect("result mutex poisoned");
        if guard.iter().any(|existing| existing.id == result.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(result);
        Ok(())
    }

    fn list(&self, key: &SessionKey) -> Result<Vec<AssessmentResult>, RepositoryError> {
        let guard = self.results.lock().expect("result mutex poisoned");
        Ok(guard
            .iter()
            .filter(|result| result.tool_id == key.tool_id && result.user_id == key.user_id)
            .cloned()
            .collect())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
