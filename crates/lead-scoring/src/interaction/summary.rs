use serde::{Deserialize, Serialize};

use super::actions::CONVERSION_THRESHOLD;
use super::events::{EventType, InteractionEvent};
use super::pipeline::{HistorySignals, LeadScore, ScoringPipeline, CONTENT_EXPLORER_THRESHOLD};
use super::tier::Tier;

/// Points attributed to one event type after caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub event_type: EventType,
    pub count: u32,
    pub points: i32,
    pub capped: bool,
}

/// Explanation of a lead score for dashboards and sales hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSummary {
    pub score: LeadScore,
    pub breakdown: Vec<TypeBreakdown>,
    pub recommendations: Vec<String>,
    pub points_to_next_tier: Option<i32>,
}

impl ScoringPipeline {
    pub fn summary(&self, events: &[InteractionEvent]) -> ScoringSummary {
        let score = self.score(events);

        let mut breakdown: Vec<TypeBreakdown> = self
            .tally(events)
            .into_iter()
            .map(|(event_type, tally)| TypeBreakdown {
                event_type,
                count: tally.count,
                points: tally.points,
                capped: tally.capped,
            })
            .collect();
        breakdown.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.event_type.cmp(&b.event_type))
        });

        let signals = self.signals(events);

        ScoringSummary {
            recommendations: recommendations(&score, &signals),
            points_to_next_tier: Tier::points_to_next(score.total),
            breakdown,
            score,
        }
    }
}

/// Summarises a history with the standard rule table.
pub fn scoring_summary(events: &[InteractionEvent]) -> ScoringSummary {
    ScoringPipeline::default().summary(events)
}

fn recommendations(score: &LeadScore, signals: &HistorySignals) -> Vec<String> {
    let mut items = Vec::new();

    if score.conversion_probability >= CONVERSION_THRESHOLD {
        items.push("Hand off to sales for a consultation call".to_string());
    }
    if !signals.email_captured {
        items.push("Offer the newsletter or a free guide to capture an email address".to_string());
    }
    if signals.tool_completions == 0 {
        items.push("Invite the lead to complete a self-assessment tool".to_string());
    }
    if signals.distinct_content < CONTENT_EXPLORER_THRESHOLD && score.tier <= Tier::Engaged {
        items.push("Recommend related articles to build content engagement".to_string());
    }
    if !signals.webinar_attended && score.tier >= Tier::Engaged {
        items.push("Invite the lead to the next live webinar".to_string());
    }
    if !signals.office_visit_requested && score.tier >= Tier::SoftMember {
        items.push("Offer an in-person office visit".to_string());
    }
    if !signals.phone_captured && score.tier == Tier::HotLead {
        items.push("Request a phone number to schedule a call".to_string());
    }

    items
}
