use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::events::{EventPayload, EventType};

/// Payload-derived factor applied to a rule's base points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplier {
    /// Minutes on page, from seconds capped at [`MAX_TIME_ON_PAGE_SECONDS`].
    TimeOnPage,
    /// Scroll depth as a fraction of the page.
    ScrollDepth,
    /// Consecutive-day visit streak.
    Streak,
}

pub const MAX_TIME_ON_PAGE_SECONDS: f64 = 300.0;

impl Multiplier {
    /// Reads the factor from the payload. Payloads that do not carry the field yield 1.
    pub fn factor(self, payload: &EventPayload) -> f64 {
        match (self, payload) {
            (Multiplier::TimeOnPage, EventPayload::PageView { duration_seconds, .. }) => {
                if duration_seconds.is_finite() {
                    duration_seconds.clamp(0.0, MAX_TIME_ON_PAGE_SECONDS) / 60.0
                } else {
                    0.0
                }
            }
            (Multiplier::ScrollDepth, EventPayload::ScrollDepth { depth_percent, .. }) => {
                if depth_percent.is_finite() {
                    depth_percent.clamp(0.0, 100.0) / 100.0
                } else {
                    0.0
                }
            }
            (Multiplier::Streak, EventPayload::ReturnVisit { consecutive_days }) => {
                f64::from((*consecutive_days).max(1))
            }
            _ => 1.0,
        }
    }
}

/// Named sub-score an event type feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBucket {
    Engagement,
    Readiness,
    Behavioral,
}

/// Static scoring configuration for one event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<Multiplier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<i32>,
    #[serde(default)]
    pub buckets: Vec<ScoreBucket>,
}

impl ScoringRule {
    const fn flat(points: i32, cap: Option<i32>) -> Self {
        Self {
            points,
            multiplier: None,
            cap,
            buckets: Vec::new(),
        }
    }

    fn multiplied(mut self, multiplier: Multiplier) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    fn feeding(mut self, buckets: &[ScoreBucket]) -> Self {
        self.buckets = buckets.to_vec();
        self
    }

    /// Raw contribution of one event before caps.
    pub fn contribution(&self, payload: &EventPayload) -> i32 {
        let factor = self
            .multiplier
            .map(|multiplier| multiplier.factor(payload))
            .unwrap_or(1.0);
        (f64::from(self.points) * factor).round() as i32
    }
}

/// Mapping from event type to scoring rule. Types without an entry score zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRuleTable {
    rules: BTreeMap<EventType, ScoringRule>,
}

impl ScoringRuleTable {
    pub fn new(rules: BTreeMap<EventType, ScoringRule>) -> Self {
        Self { rules }
    }

    pub fn get(&self, event_type: EventType) -> Option<&ScoringRule> {
        self.rules.get(&event_type)
    }

    pub fn insert(&mut self, event_type: EventType, rule: ScoringRule) -> Option<ScoringRule> {
        self.rules.insert(event_type, rule)
    }

    pub fn remove(&mut self, event_type: EventType) -> Option<ScoringRule> {
        self.rules.remove(&event_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventType, &ScoringRule)> {
        self.rules.iter().map(|(event_type, rule)| (*event_type, rule))
    }

    /// The production rule table.
    pub fn standard() -> Self {
        use ScoreBucket::{Behavioral, Engagement, Readiness};

        let entries = [
            (
                EventType::PageView,
                ScoringRule::flat(1, Some(50))
                    .multiplied(Multiplier::TimeOnPage)
                    .feeding(&[Engagement]),
            ),
            (
                EventType::ScrollDepth,
                ScoringRule::flat(2, Some(20))
                    .multiplied(Multiplier::ScrollDepth)
                    .feeding(&[Engagement]),
            ),
            (
                EventType::ContentView,
                ScoringRule::flat(3, Some(60)).feeding(&[Engagement]),
            ),
            (
                EventType::ResourceDownload,
                ScoringRule::flat(15, Some(45)).feeding(&[Engagement, Readiness]),
            ),
            (
                EventType::ToolStart,
                ScoringRule::flat(5, Some(25)).feeding(&[Behavioral]),
            ),
            (
                EventType::ToolComplete,
                ScoringRule::flat(25, Some(100)).feeding(&[Behavioral, Readiness]),
            ),
            (
                EventType::EmailCapture,
                ScoringRule::flat(50, Some(50)).feeding(&[Readiness]),
            ),
            (
                EventType::PhoneCapture,
                ScoringRule::flat(40, Some(40)).feeding(&[Readiness]),
            ),
            (
                EventType::WebinarRegistration,
                ScoringRule::flat(20, Some(40)).feeding(&[Engagement, Readiness]),
            ),
            (
                EventType::WebinarAttendance,
                ScoringRule::flat(40, Some(80)).feeding(&[Readiness]),
            ),
            (
                EventType::OfficeVisitRequest,
                ScoringRule::flat(75, Some(75)).feeding(&[Readiness]),
            ),
            (
                EventType::DirectMessage,
                ScoringRule::flat(30, Some(60)).feeding(&[Readiness]),
            ),
            (
                EventType::SocialShare,
                ScoringRule::flat(10, Some(30)).feeding(&[Behavioral]),
            ),
            (
                EventType::ReturnVisit,
                ScoringRule::flat(5, Some(50))
                    .multiplied(Multiplier::Streak)
                    .feeding(&[Behavioral]),
            ),
            (EventType::ReferralVisit, ScoringRule::flat(15, Some(15))),
            (
                EventType::Inactivity,
                ScoringRule::flat(-10, None).feeding(&[Behavioral]),
            ),
            (
                EventType::Bounce,
                ScoringRule::flat(-5, None).feeding(&[Engagement]),
            ),
        ];

        Self::new(entries.into_iter().collect())
    }
}

impl Default for ScoringRuleTable {
    fn default() -> Self {
        Self::standard()
    }
}
