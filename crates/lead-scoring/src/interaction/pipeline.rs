use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::events::{EventPayload, EventType, InteractionEvent};
use super::rules::{ScoreBucket, ScoringRuleTable};
use super::tier::Tier;

pub const TOOL_COMPLETION_BONUS: i32 = 10;
pub const CONTENT_EXPLORER_BONUS: i32 = 15;
pub const CONTENT_EXPLORER_THRESHOLD: usize = 5;
pub const MULTI_SESSION_BONUS: i32 = 5;
pub const MULTI_SESSION_THRESHOLD: usize = 3;
pub const LONGEVITY_BONUS: i32 = 20;
pub const LONGEVITY_DAYS: i64 = 7;

pub const RECENCY_SAME_DAY_BONUS: i32 = 5;
pub const RECENCY_THREE_DAY_BONUS: i32 = 3;
pub const RECENCY_WEEK_BONUS: i32 = 1;
pub const RECENCY_CAP: i32 = 50;

pub const PROBABILITY_SCORE_WEIGHT: f64 = 60.0;
pub const PROBABILITY_SCORE_SATURATION: f64 = 250.0;

/// Snapshot of a lead's standing, recomputed from the full history on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub total: i32,
    pub engagement: i32,
    pub readiness: i32,
    pub behavioral: i32,
    pub tier: Tier,
    pub conversion_probability: f64,
    pub tool_completions: u32,
}

/// Per event type accounting used by scoring summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTally {
    pub count: u32,
    pub points: i32,
    pub capped: bool,
}

/// Scores event histories against a rule table.
#[derive(Debug, Clone, Default)]
pub struct ScoringPipeline {
    rules: ScoringRuleTable,
}

impl ScoringPipeline {
    pub fn new(rules: ScoringRuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ScoringRuleTable {
        &self.rules
    }

    pub fn score(&self, events: &[InteractionEvent]) -> LeadScore {
        let Some(reference) = reference_instant(self.registered(events)) else {
            return LeadScore::default();
        };

        let mut score = LeadScore::default();
        let tallies = self.tally(events);
        for (event_type, tally) in &tallies {
            let Some(rule) = self.rules.get(*event_type) else {
                continue;
            };
            score.total += tally.points;
            for bucket in &rule.buckets {
                match bucket {
                    ScoreBucket::Engagement => score.engagement += tally.points,
                    ScoreBucket::Readiness => score.readiness += tally.points,
                    ScoreBucket::Behavioral => score.behavioral += tally.points,
                }
            }
        }

        let signals = HistorySignals::collect(self.registered(events), reference);
        let bonus = signals.behavioral_bonus();
        score.total += bonus;
        score.behavioral += bonus;
        score.total += self.recency_bonus(events, reference);

        score.tool_completions = signals.tool_completions;
        score.tier = Tier::from_score(score.total);
        score.conversion_probability = conversion_probability(score.total, &signals);

        debug!(
            events = events.len(),
            total = score.total,
            tier = %score.tier,
            conversion_probability = score.conversion_probability,
            "scored interaction history"
        );

        score
    }

    /// Capped points per event type, in event order. Unregistered types are omitted.
    pub fn tally(&self, events: &[InteractionEvent]) -> BTreeMap<EventType, TypeTally> {
        let mut tallies: BTreeMap<EventType, TypeTally> = BTreeMap::new();

        for event in events {
            let event_type = event.event_type();
            let Some(rule) = self.rules.get(event_type) else {
                continue;
            };

            let tally = tallies.entry(event_type).or_default();
            tally.count += 1;

            let raw = rule.contribution(&event.event);
            let marginal = match rule.cap {
                Some(cap) if raw > 0 => {
                    let headroom = (cap - tally.points).max(0);
                    if raw > headroom {
                        tally.capped = true;
                    }
                    raw.min(headroom)
                }
                _ => raw,
            };
            tally.points += marginal;
        }

        tallies
    }

    /// Events whose type has a rule; everything else is invisible to scoring.
    pub(crate) fn registered<'a>(
        &'a self,
        events: &'a [InteractionEvent],
    ) -> impl Iterator<Item = &'a InteractionEvent> + 'a {
        events
            .iter()
            .filter(move |event| self.rules.get(event.event_type()).is_some())
    }

    pub(crate) fn signals(&self, events: &[InteractionEvent]) -> HistorySignals {
        reference_instant(self.registered(events))
            .map(|reference| HistorySignals::collect(self.registered(events), reference))
            .unwrap_or_default()
    }

    fn recency_bonus(&self, events: &[InteractionEvent], reference: DateTime<Utc>) -> i32 {
        let reference_day = reference.date_naive();
        let bonus: i32 = self
            .registered(events)
            .filter(|event| {
                self.rules
                    .get(event.event_type())
                    .map(|rule| rule.points >= 0)
                    .unwrap_or(false)
            })
            .map(|event| {
                let age = reference - event.timestamp;
                if event.timestamp.date_naive() == reference_day {
                    RECENCY_SAME_DAY_BONUS
                } else if age <= Duration::days(3) {
                    RECENCY_THREE_DAY_BONUS
                } else if age <= Duration::days(7) {
                    RECENCY_WEEK_BONUS
                } else {
                    0
                }
            })
            .sum();

        bonus.min(RECENCY_CAP)
    }
}

/// Scores a history with the standard rule table.
pub fn calculate_score(events: &[InteractionEvent]) -> LeadScore {
    ScoringPipeline::default().score(events)
}

/// Recency windows are measured from the latest scored event, never the wall clock.
pub(crate) fn reference_instant<'a>(
    events: impl Iterator<Item = &'a InteractionEvent>,
) -> Option<DateTime<Utc>> {
    events.map(|event| event.timestamp).max()
}

/// History-wide facts feeding bonuses and the conversion estimate.
#[derive(Debug, Default)]
pub(crate) struct HistorySignals {
    pub tool_completions: u32,
    pub distinct_content: usize,
    pub distinct_sessions: usize,
    pub span_days: i64,
    pub active_days: usize,
    pub events_last_day: usize,
    pub office_visit_requested: bool,
    pub webinar_attended: bool,
    pub direct_message: bool,
    pub phone_captured: bool,
    pub email_captured: bool,
    pub referred: bool,
}

impl HistorySignals {
    pub(crate) fn collect<'a>(
        events: impl Iterator<Item = &'a InteractionEvent>,
        reference: DateTime<Utc>,
    ) -> Self {
        let mut signals = HistorySignals::default();
        let mut content = BTreeSet::new();
        let mut sessions = BTreeSet::new();
        let mut days: BTreeSet<NaiveDate> = BTreeSet::new();
        let mut earliest = reference;

        for event in events {
            sessions.insert(event.session_id.as_str());
            days.insert(event.timestamp.date_naive());
            earliest = earliest.min(event.timestamp);
            if reference - event.timestamp <= Duration::hours(24) {
                signals.events_last_day += 1;
            }

            match &event.event {
                EventPayload::ToolComplete { .. } => signals.tool_completions += 1,
                EventPayload::ContentView { content_id } if !content_id.is_empty() => {
                    content.insert(content_id.as_str());
                }
                EventPayload::OfficeVisitRequest => signals.office_visit_requested = true,
                EventPayload::WebinarAttendance { .. } => signals.webinar_attended = true,
                EventPayload::DirectMessage => signals.direct_message = true,
                EventPayload::PhoneCapture => signals.phone_captured = true,
                EventPayload::EmailCapture => signals.email_captured = true,
                EventPayload::ReferralVisit { .. } => signals.referred = true,
                _ => {}
            }
        }

        signals.distinct_content = content.len();
        signals.distinct_sessions = sessions.len();
        signals.active_days = days.len();
        signals.span_days = (reference - earliest).num_days();
        signals
    }

    pub(crate) fn behavioral_bonus(&self) -> i32 {
        let mut bonus = 0;
        if self.tool_completions > 1 {
            bonus += TOOL_COMPLETION_BONUS * (self.tool_completions as i32 - 1);
        }
        if self.distinct_content >= CONTENT_EXPLORER_THRESHOLD {
            bonus += CONTENT_EXPLORER_BONUS;
        }
        if self.distinct_sessions >= MULTI_SESSION_THRESHOLD {
            bonus += MULTI_SESSION_BONUS * self.distinct_sessions as i32;
        }
        if self.span_days >= LONGEVITY_DAYS {
            bonus += LONGEVITY_BONUS;
        }
        bonus
    }
}

fn conversion_probability(total: i32, signals: &HistorySignals) -> f64 {
    let mut probability = (f64::from(total.max(0)) * PROBABILITY_SCORE_WEIGHT
        / PROBABILITY_SCORE_SATURATION)
        .min(PROBABILITY_SCORE_WEIGHT);

    if signals.office_visit_requested {
        probability += 15.0;
    }
    if signals.webinar_attended {
        probability += 10.0;
    }
    if signals.tool_completions >= 2 {
        probability += 10.0;
    }
    if signals.direct_message {
        probability += 10.0;
    }
    if signals.phone_captured {
        probability += 10.0;
    }
    if signals.active_days >= 5 {
        probability += 5.0;
    }
    if signals.events_last_day >= 3 {
        probability += 5.0;
    }
    if signals.referred {
        probability += 5.0;
    }

    let rounded = (probability * 10.0).round() / 10.0;
    rounded.clamp(0.0, 100.0)
}
