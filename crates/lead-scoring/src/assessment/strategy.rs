use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::config::AssessmentDefinition;
use super::insights::Insight;
use super::questions::QuestionResponse;
use super::scoring::AssessmentScores;

/// Externally supplied scoring for `custom` assessments.
pub trait ScoringStrategy: Send + Sync {
    fn score(
        &self,
        definition: &AssessmentDefinition,
        responses: &[QuestionResponse],
    ) -> AssessmentScores;
}

/// Extra insights appended to the built-in ones.
pub trait InsightStrategy: Send + Sync {
    fn insights(&self, definition: &AssessmentDefinition, scores: &AssessmentScores)
        -> Vec<Insight>;
}

/// Name → implementation lookup, resolved when definitions are loaded into a catalog.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    scoring: BTreeMap<String, Arc<dyn ScoringStrategy>>,
    insights: BTreeMap<String, Arc<dyn InsightStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_scoring(
        &mut self,
        name: impl Into<String>,
        strategy: Arc<dyn ScoringStrategy>,
    ) -> &mut Self {
        self.scoring.insert(name.into(), strategy);
        self
    }

    pub fn register_insights(
        &mut self,
        name: impl Into<String>,
        strategy: Arc<dyn InsightStrategy>,
    ) -> &mut Self {
        self.insights.insert(name.into(), strategy);
        self
    }

    pub fn scoring(&self, name: &str) -> Option<Arc<dyn ScoringStrategy>> {
        self.scoring.get(name).cloned()
    }

    pub fn insights(&self, name: &str) -> Option<Arc<dyn InsightStrategy>> {
        self.insights.get(name).cloned()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("scoring", &self.scoring.keys().collect::<Vec<_>>())
            .field("insights", &self.insights.keys().collect::<Vec<_>>())
            .finish()
    }
}
