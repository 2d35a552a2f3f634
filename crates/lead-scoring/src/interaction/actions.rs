use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::events::{InteractionEvent, LeadId};
use super::pipeline::{LeadScore, ScoringPipeline};
use super::tier::Tier;

pub const BADGE_MILESTONE: i32 = 100;
pub const CONVERSION_THRESHOLD: f64 = 80.0;
pub const TOOL_UNLOCK_COMPLETIONS: u32 = 2;

/// Opaque tag naming a side effect for an external dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionToken(pub String);

impl ActionToken {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

fn tier_welcome(tier: Tier) -> &'static [&'static str] {
    match tier {
        Tier::Browser => &[],
        Tier::Engaged => &["send_engagement_nurture", "enable_personalized_content"],
        Tier::SoftMember => &[
            "send_membership_welcome",
            "unlock_premium_content",
            "assign_referrer_connection",
        ],
        Tier::HotLead => &[
            "notify_sales_team",
            "schedule_consultation_offer",
            "prioritize_follow_up",
        ],
    }
}

/// Tokens for the change between two snapshots, first occurrence wins.
///
/// Every rule compares against `prior`, so passing the same score twice yields nothing.
pub fn process_transition(prior: Option<&LeadScore>, new: &LeadScore) -> Vec<ActionToken> {
    let baseline = LeadScore::default();
    let prior = prior.unwrap_or(&baseline);
    let mut actions = ActionList::default();

    // Any tier change, in either direction, announces the tier now held.
    if new.tier != prior.tier {
        actions.push(format!("tier_upgrade:{}", new.tier));
        for tag in tier_welcome(new.tier) {
            actions.push(*tag);
        }
    }

    if prior.total < BADGE_MILESTONE && new.total >= BADGE_MILESTONE {
        actions.push("award_engagement_badge");
    }

    if prior.conversion_probability < CONVERSION_THRESHOLD
        && new.conversion_probability >= CONVERSION_THRESHOLD
    {
        actions.push("start_conversion_sequence");
        actions.push("notify_sales_team");
    }

    if prior.tool_completions < TOOL_UNLOCK_COMPLETIONS
        && new.tool_completions >= TOOL_UNLOCK_COMPLETIONS
    {
        actions.push("unlock_advanced_tools");
    }

    actions.into_inner()
}

#[derive(Default)]
struct ActionList(Vec<ActionToken>);

impl ActionList {
    fn push(&mut self, tag: impl Into<String>) {
        let token = ActionToken(tag.into());
        if !self.0.contains(&token) {
            self.0.push(token);
        }
    }

    fn into_inner(self) -> Vec<ActionToken> {
        self.0
    }
}

/// Result of appending one event to a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    pub previous_score: LeadScore,
    pub new_score: LeadScore,
    pub tier_changed: bool,
    pub actions: Vec<ActionToken>,
}

impl ScoringPipeline {
    pub fn process_interaction(
        &self,
        prior_events: &[InteractionEvent],
        new_event: &InteractionEvent,
    ) -> InteractionOutcome {
        let previous_score = self.score(prior_events);
        let mut history = prior_events.to_vec();
        history.push(new_event.clone());
        let new_score = self.score(&history);
        let actions = process_transition(Some(&previous_score), &new_score);

        InteractionOutcome {
            tier_changed: previous_score.tier != new_score.tier,
            previous_score,
            new_score,
            actions,
        }
    }
}

/// Appends `new_event` to `prior_events` and scores both with the standard rules.
pub fn process_interaction(
    prior_events: &[InteractionEvent],
    new_event: &InteractionEvent,
) -> InteractionOutcome {
    ScoringPipeline::default().process_interaction(prior_events, new_event)
}

/// Outbound hook executing action tokens (CRM, e-mail, notification adapters).
pub trait ActionDispatcher: Send + Sync {
    fn dispatch(&self, lead: &LeadId, token: &ActionToken) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler registered for action `{0}`")]
    Unhandled(ActionToken),
    #[error("dispatch transport unavailable: {0}")]
    Transport(String),
}

/// Outcome of dispatching a batch of tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub dispatched: Vec<ActionToken>,
    pub failed: Vec<ActionToken>,
}

/// Executes each token independently; failures are logged and do not stop the batch.
pub fn dispatch_all<D>(dispatcher: &D, lead: &LeadId, actions: &[ActionToken]) -> DispatchReport
where
    D: ActionDispatcher + ?Sized,
{
    let mut report = DispatchReport::default();
    for token in actions {
        match dispatcher.dispatch(lead, token) {
            Ok(()) => {
                info!(lead = %lead, action = %token, "dispatched action");
                report.dispatched.push(token.clone());
            }
            Err(error) => {
                warn!(lead = %lead, action = %token, %error, "action dispatch failed");
                report.failed.push(token.clone());
            }
        }
    }
    report
}
