use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::actions::{dispatch_all, ActionDispatcher, DispatchReport, InteractionOutcome};
use super::events::{InteractionEvent, LeadId};
use super::pipeline::{LeadScore, ScoringPipeline};
use super::repository::{EventRepository, LeadRecord};
use super::rules::ScoringRuleTable;
use super::summary::ScoringSummary;
use crate::store::{acquire, RepositoryError, SubjectLocks};

/// Service composing the event store, scoring pipeline, and action dispatcher.
pub struct InteractionService<R, D> {
    repository: Arc<R>,
    dispatcher: Arc<D>,
    pipeline: Arc<ScoringPipeline>,
    locks: SubjectLocks<LeadId>,
}

/// Outcome of recording an event, including what happened during dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedInteraction {
    #[serde(flatten)]
    pub outcome: InteractionOutcome,
    pub dispatch: DispatchReport,
}

impl<R, D> InteractionService<R, D>
where
    R: EventRepository + 'static,
    D: ActionDispatcher + 'static,
{
    pub fn new(repository: Arc<R>, dispatcher: Arc<D>) -> Self {
        Self::with_rules(repository, dispatcher, ScoringRuleTable::standard())
    }

    pub fn with_rules(repository: Arc<R>, dispatcher: Arc<D>, rules: ScoringRuleTable) -> Self {
        Self {
            repository,
            dispatcher,
            pipeline: Arc::new(ScoringPipeline::new(rules)),
            locks: SubjectLocks::default(),
        }
    }

    pub fn pipeline(&self) -> &ScoringPipeline {
        &self.pipeline
    }

    /// Append an event, persist the rescored history, then dispatch resulting actions.
    ///
    /// Dispatch runs after the save so a failing integration never affects the score.
    pub fn record(
        &self,
        lead: &LeadId,
        event: InteractionEvent,
    ) -> Result<RecordedInteraction, InteractionServiceError> {
        let handle = self.locks.handle(lead)?;
        let outcome = {
            let _guard = acquire(&handle)?;
            let mut record = self.repository.fetch(lead)?.unwrap_or_default();
            let outcome = self.pipeline.process_interaction(&record.events, &event);

            record.events.push(event);
            record.score = outcome.new_score.clone();
            self.repository.save(lead, record)?;
            outcome
        };

        if outcome.tier_changed {
            info!(
                lead = %lead,
                from = %outcome.previous_score.tier,
                to = %outcome.new_score.tier,
                "lead tier changed"
            );
        }

        let dispatch = dispatch_all(self.dispatcher.as_ref(), lead, &outcome.actions);
        Ok(RecordedInteraction { outcome, dispatch })
    }

    /// Current score recomputed from the stored history.
    pub fn score(&self, lead: &LeadId) -> Result<LeadScore, InteractionServiceError> {
        let record = self.fetch(lead)?;
        Ok(self.pipeline.score(&record.events))
    }

    pub fn summary(&self, lead: &LeadId) -> Result<ScoringSummary, InteractionServiceError> {
        let record = self.fetch(lead)?;
        Ok(self.pipeline.summary(&record.events))
    }

    pub fn history(&self, lead: &LeadId) -> Result<Vec<InteractionEvent>, InteractionServiceError> {
        Ok(self.fetch(lead)?.events)
    }

    fn fetch(&self, lead: &LeadId) -> Result<LeadRecord, InteractionServiceError> {
        let record = self
            .repository
            .fetch(lead)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }
}

/// Error raised by the interaction service.
#[derive(Debug, thiserror::Error)]
pub enum InteractionServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
