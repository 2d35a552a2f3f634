use lead_scoring::assessment::{
    AssessmentCatalog, AssessmentDefinition, AssessmentResult, AssessmentService,
    AssessmentSession, CatalogError, ResultStore, SessionKey, SessionStore, StrategyRegistry,
};
use lead_scoring::config::CatalogConfig;
use lead_scoring::interaction::{
    ActionDispatcher, ActionToken, DispatchError, EventRepository, InteractionService, LeadId,
    LeadRecord,
};
use lead_scoring::store::RepositoryError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

const BUILTIN_ASSESSMENT: &str = include_str!("../assessments/growth-mindset.json");

pub(crate) type ApiInteractionService = InteractionService<InMemoryEventRepository, ActionOutbox>;
pub(crate) type ApiAssessmentService =
    AssessmentService<InMemorySessionStore, InMemoryResultStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEventRepository {
    records: Arc<Mutex<HashMap<LeadId, LeadRecord>>>,
}

impl EventRepository for InMemoryEventRepository {
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

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionKey, AssessmentSession>>>,
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, key: &SessionKey) -> Result<Option<AssessmentSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("session mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn save(&self, session: AssessmentSession) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        guard.insert(session.key(), session);
        Ok(())
    }

    fn delete(&self, key: &SessionKey) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryResultStore {
    results: Arc<Mutex<Vec<AssessmentResult>>>,
}

impl ResultStore for InMemoryResultStore {
    fn append(&self, result: AssessmentResult) -> Result<(), RepositoryError> {
        let mut guard = self.results.lock().expect("result mutex poisoned");
        if guard.iter().any(|existing| existing.id == result.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(result);
        Ok(())
    }

    fn list(&self, key: &SessionKey) -> Result<Vec<AssessmentResult>, RepositoryError> {
        let guard = self.results.lock().expect("result mutex poisoned");
        Ok(guard
            .iter()
            .filter(|result| result.tool_id == key.tool_id && result.user_id == key.user_id)
            .cloned()
            .collect())
    }
}

/// Records dispatched action tokens in place of the CRM and email integrations.
#[derive(Default, Clone)]
pub(crate) struct ActionOutbox {
    events: Arc<Mutex<Vec<(LeadId, ActionToken)>>>,
}

impl ActionDispatcher for ActionOutbox {
    fn dispatch(&self, lead: &LeadId, token: &ActionToken) -> Result<(), DispatchError> {
        info!(lead = %lead, action = %token, "queued lead action");
        let mut guard = self.events.lock().expect("outbox mutex poisoned");
        guard.push((lead.clone(), token.clone()));
        Ok(())
    }
}

impl ActionOutbox {
    pub(crate) fn events(&self) -> Vec<(LeadId, ActionToken)> {
        self.events.lock().expect("outbox mutex poisoned").clone()
    }
}

pub(crate) fn builtin_definition() -> Result<AssessmentDefinition, CatalogError> {
    serde_json::from_str(BUILTIN_ASSESSMENT).map_err(|source| CatalogError::Parse {
        path: PathBuf::from("assessments/growth-mindset.json"),
        source,
    })
}

/// Loads the configured assessments directory, or the built-in catalog when none is set.
pub(crate) fn load_catalog(config: &CatalogConfig) -> Result<AssessmentCatalog, CatalogError> {
    match &config.assessments_dir {
        Some(dir) => AssessmentCatalog::load_dir(StrategyRegistry::new(), dir),
        None => {
            let catalog = AssessmentCatalog::from_definitions(
                StrategyRegistry::new(),
                [builtin_definition()?],
            )?;
            info!(assessments = catalog.len(), "using built-in assessment catalog");
            Ok(catalog)
        }
    }
}

pub(crate) fn interaction_service() -> (Arc<ApiInteractionService>, ActionOutbox) {
    let outbox = ActionOutbox::default();
    let service = InteractionService::new(
        Arc::new(InMemoryEventRepository::default()),
        Arc::new(outbox.clone()),
    );
    (Arc::new(service), outbox)
}

pub(crate) fn assessment_service(catalog: AssessmentCatalog) -> Arc<ApiAssessmentService> {
    Arc::new(AssessmentService::new(
        Arc::new(catalog),
        Arc::new(InMemorySessionStore::default()),
        Arc::new(InMemoryResultStore::default()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = load_catalog(&CatalogConfig::default()).expect("built-in catalog loads");
        let assessment = catalog.get("growth-mindset").expect("growth mindset present");
        let definition = assessment.definition();

        assert_eq!(definition.questions.len(), 7);
        assert_eq!(definition.required_questions().count(), 4);
        assert_eq!(definition.result_tiers.len(), 3);
    }

    #[test]
    fn outbox_keeps_dispatch_order() {
        let outbox = ActionOutbox::default();
        let lead = LeadId("lead-1".to_string());
        outbox
            .dispatch(&lead, &ActionToken::new("tier_upgrade:engaged"))
            .expect("dispatch");
        outbox
            .dispatch(&lead, &ActionToken::new("send_engagement_nurture"))
            .expect("dispatch");

        let tokens: Vec<String> = outbox
            .events()
            .into_iter()
            .map(|(_, token)| token.0)
            .collect();
        assert_eq!(tokens, vec!["tier_upgrade:engaged", "send_engagement_nurture"]);
    }
}
