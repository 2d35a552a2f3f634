use serde::{Deserialize, Serialize};

use super::config::AssessmentDefinition;
use super::scoring::AssessmentScores;

pub const STRENGTH_THRESHOLD: f64 = 80.0;
pub const OPPORTUNITY_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Tier,
    TierNote,
    Strength,
    Opportunity,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub priority: InsightPriority,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Built-in insights: tier headline, tier notes, then per-category strengths/opportunities.
pub fn generate_insights(
    definition: &AssessmentDefinition,
    scores: &AssessmentScores,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    let tier = scores.tier.as_ref().and_then(|matched| {
        definition
            .result_tiers
            .iter()
            .find(|tier| tier.id == matched.id)
    });

    if let Some(tier) = tier {
        insights.push(Insight {
            kind: InsightKind::Tier,
            priority: InsightPriority::High,
            title: tier.label.clone(),
            message: tier.description.clone(),
            action_items: tier.recommendations.clone(),
            category: None,
        });
        for note in &tier.insights {
            insights.push(Insight {
                kind: InsightKind::TierNote,
                priority: InsightPriority::Medium,
                title: tier.label.clone(),
                message: note.clone(),
                action_items: Vec::new(),
                category: None,
            });
        }
    }

    for category in &scores.categories {
        if category.percentage >= STRENGTH_THRESHOLD {
            insights.push(Insight {
                kind: InsightKind::Strength,
                priority: InsightPriority::Low,
                title: format!("Strength: {}", category.name),
                message: format!(
                    "You scored {:.0}% in {}, one of your strongest areas.",
                    category.percentage, category.name
                ),
                action_items: vec![format!("Keep building on {}", category.name)],
                category: Some(category.id.clone()),
            });
        } else if category.percentage <= OPPORTUNITY_THRESHOLD {
            insights.push(Insight {
                kind: InsightKind::Opportunity,
                priority: InsightPriority::Medium,
                title: format!("Growth opportunity: {}", category.name),
                message: format!(
                    "You scored {:.0}% in {}; focused practice here will move your overall result.",
                    category.percentage, category.name
                ),
                action_items: vec![focus_line(&category.name)],
                category: Some(category.id.clone()),
            });
        }
    }

    insights
}

/// Tier recommendations followed by one focus line per opportunity category, deduplicated.
pub fn recommendations(definition: &AssessmentDefinition, scores: &AssessmentScores) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    if let Some(matched) = &scores.tier {
        if let Some(tier) = definition
            .result_tiers
            .iter()
            .find(|tier| tier.id == matched.id)
        {
            items.extend(tier.recommendations.iter().cloned());
        }
    }

    for category in &scores.categories {
        if category.percentage <= OPPORTUNITY_THRESHOLD {
            items.push(focus_line(&category.name));
        }
    }

    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

fn focus_line(category: &str) -> String {
    format!("Focus on {category}")
}
