use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{AssessmentDefinition, CategoryDefinition, ResultTier, ScoringConfig};
use super::questions::{Answer, Question, QuestionKind, QuestionResponse};
use super::strategy::ScoringStrategy;

/// Overall and per-dimension scores for one set of responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentScores {
    pub total: f64,
    pub max: f64,
    pub percentage: f64,
    #[serde(default)]
    pub categories: Vec<CategoryScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<TierMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub id: String,
    pub name: String,
    pub weight: f64,
    pub score: f64,
    pub max: f64,
    pub percentage: f64,
    pub answered: usize,
}

/// Result tier attached to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMatch {
    pub id: String,
    pub label: String,
}

impl From<&ResultTier> for TierMatch {
    fn from(tier: &ResultTier) -> Self {
        Self {
            id: tier.id.clone(),
            label: tier.label.clone(),
        }
    }
}

/// Score and best-case maximum for one answered question, before weighting.
pub fn question_score(question: &Question, answer: &Answer) -> (f64, f64) {
    match (&question.kind, answer) {
        (
            QuestionKind::MultipleChoice {
                options,
                allow_multiple,
            },
            Answer::Choice(selected),
        ) => {
            let score = options
                .iter()
                .filter(|option| selected.contains(&option.id))
                .map(|option| option.score)
                .sum();
            let max = if *allow_multiple {
                options
                    .iter()
                    .map(|option| option.score.max(0.0))
                    .sum()
            } else {
                options
                    .iter()
                    .map(|option| option.score)
                    .fold(0.0, f64::max)
            };
            (score, max)
        }
        (QuestionKind::Scale { max, .. }, Answer::Number(value)) => (*value, f64::from(*max)),
        (QuestionKind::Slider { max, .. }, Answer::Number(value)) => (*value, *max),
        (QuestionKind::Text { .. }, _)
        | (QuestionKind::Ranking { .. }, _)
        | (QuestionKind::Matrix { .. }, _) => (1.0, 1.0),
        // Shapes are validated on submission; a mismatch scores nothing.
        (QuestionKind::MultipleChoice { .. }, _)
        | (QuestionKind::Scale { .. }, _)
        | (QuestionKind::Slider { .. }, _) => (0.0, 0.0),
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    score: f64,
    max: f64,
    answered: usize,
}

impl Tally {
    fn percentage(&self) -> f64 {
        percentage(self.score, self.max)
    }
}

fn tally<'a>(
    questions: impl Iterator<Item = &'a Question>,
    answers: &HashMap<&str, &Answer>,
    weighted: bool,
) -> Tally {
    let mut tally = Tally::default();
    for question in questions {
        let Some(answer) = answers.get(question.id.as_str()) else {
            continue;
        };
        let (score, max) = question_score(question, answer);
        let factor = if weighted { question.weight() } else { 1.0 };
        tally.score += score * factor;
        tally.max += max * factor;
        tally.answered += 1;
    }
    tally
}

pub(crate) fn percentage(score: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    round2(score / max * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Runs the configured algorithm and attaches the matching result tier.
pub(crate) fn score_responses(
    definition: &AssessmentDefinition,
    responses: &[QuestionResponse],
    custom: Option<&dyn ScoringStrategy>,
) -> AssessmentScores {
    let mut scores = match (&definition.scoring, custom) {
        (ScoringConfig::Custom { .. }, Some(strategy)) => strategy.score(definition, responses),
        (ScoringConfig::Custom { strategy }, None) => {
            debug!(tool_id = %definition.tool_id, %strategy, "custom strategy not resolved");
            AssessmentScores::empty()
        }
        (ScoringConfig::Simple, _) => builtin(definition, responses, false),
        (ScoringConfig::Weighted, _) => builtin(definition, responses, true),
        (ScoringConfig::CategoryBased { categories }, _) => {
            category_based(definition, responses, categories)
        }
    };

    if scores.tier.is_none() {
        scores.tier = match_tier(&definition.result_tiers, scores.percentage).map(TierMatch::from);
    }

    debug!(
        tool_id = %definition.tool_id,
        percentage = scores.percentage,
        tier = scores.tier.as_ref().map(|tier| tier.id.as_str()),
        "scored assessment responses"
    );
    scores
}

impl AssessmentScores {
    pub fn empty() -> Self {
        Self {
            total: 0.0,
            max: 0.0,
            percentage: 0.0,
            categories: Vec::new(),
            tier: None,
        }
    }
}

fn answers_by_question(responses: &[QuestionResponse]) -> HashMap<&str, &Answer> {
    responses
        .iter()
        .map(|response| (response.question_id.as_str(), &response.answer))
        .collect()
}

fn builtin(
    definition: &AssessmentDefinition,
    responses: &[QuestionResponse],
    weighted: bool,
) -> AssessmentScores {
    let answers = answers_by_question(responses);
    let overall = tally(definition.questions.iter(), &answers, weighted);

    // Dimension breakdown from the questions' own category tags, in first-seen order.
    let mut names: Vec<&str> = Vec::new();
    for question in &definition.questions {
        if let Some(category) = question.category.as_deref() {
            if !names.contains(&category) {
                names.push(category);
            }
        }
    }
    let categories = names
        .into_iter()
        .filter_map(|name| {
            let members = definition
                .questions
                .iter()
                .filter(|question| question.category.as_deref() == Some(name));
            let tally = tally(members, &answers, weighted);
            (tally.answered > 0).then(|| CategoryScore {
                id: name.to_string(),
                name: name.to_string(),
                weight: 1.0,
                score: tally.score,
                max: tally.max,
                percentage: tally.percentage(),
                answered: tally.answered,
            })
        })
        .collect();

    AssessmentScores {
        total: overall.score,
        max: overall.max,
        percentage: overall.percentage(),
        categories,
        tier: None,
    }
}

fn category_based(
    definition: &AssessmentDefinition,
    responses: &[QuestionResponse],
    categories: &[CategoryDefinition],
) -> AssessmentScores {
    let answers = answers_by_question(responses);
    let mut scored = Vec::new();
    let mut weighted_points = 0.0;
    let mut weighted_capacity = 0.0;
    let mut total = 0.0;
    let mut max = 0.0;

    for category in categories {
        let members = category
            .question_ids
            .iter()
            .filter_map(|id| definition.question(id));
        let tally = tally(members, &answers, false);
        if tally.answered == 0 {
            continue;
        }

        let category_percentage = tally.percentage();
        weighted_points += category.weight * category_percentage;
        weighted_capacity += category.weight * 100.0;
        total += tally.score;
        max += tally.max;

        scored.push(CategoryScore {
            id: category.id.clone(),
            name: category.name.clone(),
            weight: category.weight,
            score: tally.score,
            max: tally.max,
            percentage: category_percentage,
            answered: tally.answered,
        });
    }

    AssessmentScores {
        total,
        max,
        percentage: percentage(weighted_points, weighted_capacity),
        categories: scored,
        tier: None,
    }
}

/// First tier containing `percentage`; fractional gaps between integer-authored
/// ranges fall to the highest tier starting at or below it.
pub fn match_tier(tiers: &[ResultTier], percentage: f64) -> Option<&ResultTier> {
    tiers
        .iter()
        .find(|tier| tier.contains(percentage))
        .or_else(|| {
            tiers
                .iter()
                .filter(|tier| tier.min_percentage <= percentage)
                .max_by(|a, b| a.min_percentage.total_cmp(&b.min_percentage))
        })
}
