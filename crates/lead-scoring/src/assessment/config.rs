use serde::{Deserialize, Serialize};

use super::questions::Question;

/// Selects the scoring algorithm for an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ScoringConfig {
    Simple,
    Weighted,
    CategoryBased { categories: Vec<CategoryDefinition> },
    /// Delegates to a strategy registered under `strategy`.
    Custom { strategy: String },
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::Simple
    }
}

/// Named, weighted group of questions scored together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "default_category_weight")]
    pub weight: f64,
    pub question_ids: Vec<String>,
}

fn default_category_weight() -> f64 {
    1.0
}

/// Percentage band mapped to a labelled outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTier {
    pub id: String,
    pub label: String,
    pub min_percentage: f64,
    pub max_percentage: f64,
    pub description: String,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl ResultTier {
    pub fn contains(&self, percentage: f64) -> bool {
        percentage >= self.min_percentage && percentage <= self.max_percentage
    }
}

/// Serializable definition of one assessment tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentDefinition {
    pub tool_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub result_tiers: Vec<ResultTier>,
    #[serde(default)]
    pub allow_back_navigation: bool,
    /// Registered insight strategy appended after the built-in insights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_strategy: Option<String>,
}

impl AssessmentDefinition {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions
            .iter()
            .find(|question| question.id == question_id)
    }

    pub fn question_index(&self, question_id: &str) -> Option<usize> {
        self.questions
            .iter()
            .position(|question| question.id == question_id)
    }

    pub fn required_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|question| question.required)
    }
}
