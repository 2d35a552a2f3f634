use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::insights::Insight;
use super::scoring::AssessmentScores;
use super::session::{AssessmentSession, SessionKey};
use crate::store::RepositoryError;

/// Archived outcome of a completed assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub id: String,
    pub tool_id: String,
    pub user_id: String,
    pub scores: AssessmentScores,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<String>,
    pub completed_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub time_spent_seconds: u64,
    pub response_count: usize,
}

impl AssessmentResult {
    pub fn result_id(key: &SessionKey, completed_at: DateTime<Utc>) -> String {
        format!(
            "{}-{}-{}",
            key.tool_id,
            key.user_id,
            completed_at.timestamp_millis()
        )
    }
}

/// Storage abstraction for in-flight session snapshots, one per tool and user.
pub trait SessionStore: Send + Sync {
    fn load(&self, key: &SessionKey) -> Result<Option<AssessmentSession>, RepositoryError>;
    fn save(&self, session: AssessmentSession) -> Result<(), RepositoryError>;
    /// Removes the snapshot; deleting a missing session is not an error.
    fn delete(&self, key: &SessionKey) -> Result<(), RepositoryError>;
}

/// Append-only storage for completed results.
pub trait ResultStore: Send + Sync {
    /// Fails with `Conflict` when a result with the same id already exists.
    fn append(&self, result: AssessmentResult) -> Result<(), RepositoryError>;
    /// Results for one tool and user, oldest first.
    fn list(&self, key: &SessionKey) -> Result<Vec<AssessmentResult>, RepositoryError>;
}
