use serde::{Deserialize, Serialize};

use super::events::{InteractionEvent, LeadId};
use super::pipeline::LeadScore;
use crate::store::RepositoryError;

/// Stored history for one lead plus the last persisted score snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub events: Vec<InteractionEvent>,
    pub score: LeadScore,
}

/// Append-only event storage, one history per lead.
pub trait EventRepository: Send + Sync {
    fn fetch(&self, lead: &LeadId) -> Result<Option<LeadRecord>, RepositoryError>;
    /// Persists the full record; callers hold the lead's lock across fetch and save.
    fn save(&self, lead: &LeadId, record: LeadRecord) -> Result<(), RepositoryError>;
}
