use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::interaction::actions::{ActionDispatcher, ActionToken, DispatchError};
use crate::interaction::events::{EventPayload, InteractionEvent, LeadId};
use crate::interaction::pipeline::LeadScore;
use crate::interaction::repository::{EventRepository, LeadRecord};
use crate::interaction::service::InteractionService;
use crate::interaction::tier::Tier;
use crate::store::RepositoryError;

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn at(offset: Duration) -> DateTime<Utc> {
    base_time() + offset
}

pub(super) fn event(payload: EventPayload, timestamp: DateTime<Utc>) -> InteractionEvent {
    InteractionEvent::new(payload, timestamp, "session-1")
}

pub(super) fn event_in(
    payload: EventPayload,
    timestamp: DateTime<Utc>,
    session: &str,
) -> InteractionEvent {
    InteractionEvent::new(payload, timestamp, session)
}

pub(super) fn tool_complete(tool: &str) -> EventPayload {
    EventPayload::ToolComplete {
        tool_id: tool.to_string(),
    }
}

pub(super) fn content_view(content: &str) -> EventPayload {
    EventPayload::ContentView {
        content_id: content.to_string(),
    }
}

pub(super) fn score_with(total: i32, conversion_probability: f64, tool_completions: u32) -> LeadScore {
    LeadScore {
        total,
        tier: Tier::from_score(total),
        conversion_probability,
        tool_completions,
        ..LeadScore::default()
    }
}

pub(super) fn build_service() -> (
    InteractionService<MemoryEvents, RecordingDispatcher>,
    Arc<MemoryEvents>,
    Arc<RecordingDispatcher>,
) {
    let repository = Arc::new(MemoryEvents::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = InteractionService::new(repository.clone(), dispatcher.clone());
    (service, repository, dispatcher)
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    records: Arc<Mutex<HashMap<LeadId, LeadRecord>>>,
}

impl EventRepository for MemoryEvents {
    fn fetch(&self, lead: &LeadId) -> Result<Option<LeadRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(lead).cloned())
    }

    fn save(&self, lead: &LeadId, record: LeadRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(lead.clone(), record);
        Ok(())
    }
}

pub(super) struct UnavailableEvents;

impl EventRepository for UnavailableEvents {
    fn fetch(&self, _lead: &LeadId) -> Result<Option<LeadRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _lead: &LeadId, _record: LeadRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingDispatcher {
    events: Arc<Mutex<Vec<(LeadId, ActionToken)>>>,
}

impl RecordingDispatcher {
    pub(super) fn tokens(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("dispatch mutex poisoned")
            .iter()
            .map(|(_, token)| token.0.clone())
            .collect()
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&self, lead: &LeadId, token: &ActionToken) -> Result<(), DispatchError> {
        self.events
            .lock()
            .expect("dispatch mutex poisoned")
            .push((lead.clone(), token.clone()));
        Ok(())
    }
}

/// Fails for one named token and records everything else.
pub(super) struct FlakyDispatcher {
    pub(super) failing: &'static str,
    pub(super) inner: RecordingDispatcher,
}

impl ActionDispatcher for FlakyDispatcher {
    fn dispatch(&self, lead: &LeadId, token: &ActionToken) -> Result<(), DispatchError> {
        if token.as_str() == self.failing {
            return Err(DispatchError::Transport("crm timeout".to_string()));
        }
        self.inner.dispatch(lead, token)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
