//! Self-assessment tools: question catalog, session lifecycle, scoring and insights.

pub mod catalog;
pub mod config;
pub mod insights;
pub mod questions;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod strategy;
pub mod validation;

#[cfg(test)]
mod tests;

pub use catalog::{AssessmentCatalog, CatalogError, ResolvedAssessment};
pub use config::{AssessmentDefinition, CategoryDefinition, ResultTier, ScoringConfig};
pub use insights::{generate_insights, recommendations, Insight, InsightKind, InsightPriority};
pub use questions::{Answer, ChoiceOption, Question, QuestionKind, QuestionResponse};
pub use repository::{AssessmentResult, ResultStore, SessionStore};
pub use router::{assessment_router, SubmitResponseRequest};
pub use scoring::{match_tier, question_score, AssessmentScores, CategoryScore, TierMatch};
pub use service::{AssessmentError, AssessmentService};
pub use session::{AssessmentSession, ProcessingError, SessionError, SessionKey, SessionState};
pub use strategy::{InsightStrategy, ScoringStrategy, StrategyRegistry};
pub use validation::{validate_answer, ValidationError};
