use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier wrapper for a tracked lead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single timestamped user action, the pipeline's input unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub event: EventPayload,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl InteractionEvent {
    pub fn new(event: EventPayload, timestamp: DateTime<Utc>, session_id: impl Into<String>) -> Self {
        Self {
            event,
            timestamp,
            session_id: session_id.into(),
            user_id: None,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event.event_type()
    }
}

/// Type-specific payload. Unregistered `type` tags deserialize to [`EventPayload::Unknown`].
///
/// Known types never fail on their fields: missing or mistyped descriptive fields
/// become empty strings and numeric fields fall back to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    PageView {
        #[serde(default, deserialize_with = "lenient_text")]
        path: String,
        #[serde(default, deserialize_with = "lenient_number")]
        duration_seconds: f64,
    },
    ScrollDepth {
        #[serde(default, deserialize_with = "lenient_text")]
        path: String,
        #[serde(default, deserialize_with = "lenient_number")]
        depth_percent: f64,
    },
    ContentView {
        /// Empty ids still score but do not count towards distinct content.
        #[serde(default, deserialize_with = "lenient_text")]
        content_id: String,
    },
    ResourceDownload {
        #[serde(default, deserialize_with = "lenient_text")]
        resource_id: String,
    },
    ToolStart {
        #[serde(default, deserialize_with = "lenient_text")]
        tool_id: String,
    },
    ToolComplete {
        #[serde(default, deserialize_with = "lenient_text")]
        tool_id: String,
    },
    EmailCapture,
    PhoneCapture,
    WebinarRegistration {
        #[serde(default, deserialize_with = "lenient_text")]
        webinar_id: String,
    },
    WebinarAttendance {
        #[serde(default, deserialize_with = "lenient_text")]
        webinar_id: String,
    },
    OfficeVisitRequest,
    DirectMessage,
    SocialShare {
        #[serde(default, deserialize_with = "lenient_text")]
        channel: String,
    },
    ReturnVisit {
        #[serde(default, deserialize_with = "lenient_count")]
        consecutive_days: u32,
    },
    ReferralVisit {
        #[serde(default, deserialize_with = "lenient_text")]
        source: String,
    },
    Inactivity {
        #[serde(default, deserialize_with = "lenient_count")]
        idle_days: u32,
    },
    Bounce,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseValue {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match LooseValue::deserialize(deserializer)? {
        LooseValue::Number(value) => value,
        LooseValue::Text(text) => text.trim().parse().unwrap_or(0.0),
        LooseValue::Other(_) => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_number(deserializer)?;
    Ok(value.clamp(0.0, f64::from(u32::MAX)).floor() as u32)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LooseValue::deserialize(deserializer)? {
        LooseValue::Text(text) => text,
        LooseValue::Number(value) => value.to_string(),
        LooseValue::Other(_) => String::new(),
    })
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::PageView { .. } => EventType::PageView,
            EventPayload::ScrollDepth { .. } => EventType::ScrollDepth,
            EventPayload::ContentView { .. } => EventType::ContentView,
            EventPayload::ResourceDownload { .. } => EventType::ResourceDownload,
            EventPayload::ToolStart { .. } => EventType::ToolStart,
            EventPayload::ToolComplete { .. } => EventType::ToolComplete,
            EventPayload::EmailCapture => EventType::EmailCapture,
            EventPayload::PhoneCapture => EventType::PhoneCapture,
            EventPayload::WebinarRegistration { .. } => EventType::WebinarRegistration,
            EventPayload::WebinarAttendance { .. } => EventType::WebinarAttendance,
            EventPayload::OfficeVisitRequest => EventType::OfficeVisitRequest,
            EventPayload::DirectMessage => EventType::DirectMessage,
            EventPayload::SocialShare { .. } => EventType::SocialShare,
            EventPayload::ReturnVisit { .. } => EventType::ReturnVisit,
            EventPayload::ReferralVisit { .. } => EventType::ReferralVisit,
            EventPayload::Inactivity { .. } => EventType::Inactivity,
            EventPayload::Bounce => EventType::Bounce,
            EventPayload::Unknown => EventType::Unknown,
        }
    }
}

/// Closed vocabulary shared with event producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    ScrollDepth,
    ContentView,
    ResourceDownload,
    ToolStart,
    ToolComplete,
    EmailCapture,
    PhoneCapture,
    WebinarRegistration,
    WebinarAttendance,
    OfficeVisitRequest,
    DirectMessage,
    SocialShare,
    ReturnVisit,
    ReferralVisit,
    Inactivity,
    Bounce,
    #[serde(other)]
    Unknown,
}

impl EventType {
    /// Version of the vocabulary; bump when a variant is added.
    pub const VOCABULARY_VERSION: u16 = 1;

    pub const ALL: [EventType; 17] = [
        EventType::PageView,
        EventType::ScrollDepth,
        EventType::ContentView,
        EventType::ResourceDownload,
        EventType::ToolStart,
        EventType::ToolComplete,
        EventType::EmailCapture,
        EventType::PhoneCapture,
        EventType::WebinarRegistration,
        EventType::WebinarAttendance,
        EventType::OfficeVisitRequest,
        EventType::DirectMessage,
        EventType::SocialShare,
        EventType::ReturnVisit,
        EventType::ReferralVisit,
        EventType::Inactivity,
        EventType::Bounce,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::ScrollDepth => "scroll_depth",
            EventType::ContentView => "content_view",
            EventType::ResourceDownload => "resource_download",
            EventType::ToolStart => "tool_start",
            EventType::ToolComplete => "tool_complete",
            EventType::EmailCapture => "email_capture",
            EventType::PhoneCapture => "phone_capture",
            EventType::WebinarRegistration => "webinar_registration",
            EventType::WebinarAttendance => "webinar_attendance",
            EventType::OfficeVisitRequest => "office_visit_request",
            EventType::DirectMessage => "direct_message",
            EventType::SocialShare => "social_share",
            EventType::ReturnVisit => "return_visit",
            EventType::ReferralVisit => "referral_visit",
            EventType::Inactivity => "inactivity",
            EventType::Bounce => "bounce",
            EventType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
