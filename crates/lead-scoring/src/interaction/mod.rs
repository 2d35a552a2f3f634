//! Interaction scoring: event stream in, lead score, tier and action tokens out.

pub mod actions;
pub mod events;
pub mod pipeline;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;
pub mod summary;
pub mod tier;

#[cfg(test)]
mod tests;

pub use actions::{
    dispatch_all, process_interaction, process_transition, ActionDispatcher, ActionToken,
    DispatchError, DispatchReport, InteractionOutcome,
};
pub use events::{EventPayload, EventType, InteractionEvent, LeadId};
pub use pipeline::{calculate_score, LeadScore, ScoringPipeline, TypeTally};
pub use repository::{EventRepository, LeadRecord};
pub use router::interaction_router;
pub use rules::{Multiplier, ScoreBucket, ScoringRule, ScoringRuleTable};
pub use service::{InteractionService, InteractionServiceError, RecordedInteraction};
pub use summary::{scoring_summary, ScoringSummary, TypeBreakdown};
pub use tier::Tier;
