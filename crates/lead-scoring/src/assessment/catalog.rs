use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::config::{AssessmentDefinition, CategoryDefinition, ResultTier, ScoringConfig};
use super::insights::{self, Insight};
use super::questions::{QuestionKind, QuestionResponse};
use super::scoring::{score_responses, AssessmentScores};
use super::strategy::{InsightStrategy, ScoringStrategy, StrategyRegistry};

/// Largest gap allowed between one tier's max and the next tier's min.
pub const MAX_TIER_GAP: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("assessment `{0}` has no questions")]
    EmptyAssessment(String),
    #[error("assessment `{0}` is defined more than once")]
    DuplicateTool(String),
    #[error("assessment `{tool}` repeats question id `{question}`")]
    DuplicateQuestion { tool: String, question: String },
    #[error("assessment `{tool}` has invalid question `{question}`: {reason}")]
    InvalidQuestion {
        tool: String,
        question: String,
        reason: String,
    },
    #[error("assessment `{tool}` references unregistered strategy `{strategy}`")]
    UnknownStrategy { tool: String, strategy: String },
    #[error("category `{category}` in assessment `{tool}` references unknown question `{question}`")]
    UnknownCategoryQuestion {
        tool: String,
        category: String,
        question: String,
    },
    #[error("question `{question}` in assessment `{tool}` belongs to both `{first}` and `{second}`")]
    OverlappingCategories {
        tool: String,
        question: String,
        first: String,
        second: String,
    },
    #[error("required question `{question}` in assessment `{tool}` belongs to no category")]
    UncategorizedQuestion { tool: String, question: String },
    #[error("`{owner}` in assessment `{tool}` has invalid weight {weight}")]
    InvalidWeight {
        tool: String,
        owner: String,
        weight: f64,
    },
    #[error("tier `{tier}` in assessment `{tool}` has an invalid range {min}..={max}")]
    InvalidTier {
        tool: String,
        tier: String,
        min: f64,
        max: f64,
    },
    #[error("tiers `{first}` and `{second}` in assessment `{tool}` overlap")]
    OverlappingTiers {
        tool: String,
        first: String,
        second: String,
    },
    #[error("tiers `{first}` and `{second}` in assessment `{tool}` leave a gap")]
    TierGap {
        tool: String,
        first: String,
        second: String,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A definition with its named strategies bound.
#[derive(Clone)]
pub struct ResolvedAssessment {
    definition: Arc<AssessmentDefinition>,
    scoring: Option<Arc<dyn ScoringStrategy>>,
    insights: Option<Arc<dyn InsightStrategy>>,
}

impl ResolvedAssessment {
    pub fn definition(&self) -> &AssessmentDefinition {
        &self.definition
    }

    pub fn score(&self, responses: &[QuestionResponse]) -> AssessmentScores {
        score_responses(&self.definition, responses, self.scoring.as_deref())
    }

    /// Built-in insights followed by those of the configured insight strategy.
    pub fn insights(&self, scores: &AssessmentScores) -> Vec<Insight> {
        let mut generated = insights::generate_insights(&self.definition, scores);
        if let Some(strategy) = &self.insights {
            generated.extend(strategy.insights(&self.definition, scores));
        }
        generated
    }

    pub fn recommendations(&self, scores: &AssessmentScores) -> Vec<String> {
        insights::recommendations(&self.definition, scores)
    }
}

impl fmt::Debug for ResolvedAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAssessment")
            .field("tool_id", &self.definition.tool_id)
            .field("custom_scoring", &self.scoring.is_some())
            .field("custom_insights", &self.insights.is_some())
            .finish()
    }
}

/// Validated, immutable set of assessments keyed by tool id.
#[derive(Debug, Default, Clone)]
pub struct AssessmentCatalog {
    registry: StrategyRegistry,
    assessments: BTreeMap<String, Arc<ResolvedAssessment>>,
}

impl AssessmentCatalog {
    pub fn new(registry: StrategyRegistry) -> Self {
        Self {
            registry,
            assessments: BTreeMap::new(),
        }
    }

    pub fn from_definitions(
        registry: StrategyRegistry,
        definitions: impl IntoIterator<Item = AssessmentDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(registry);
        for definition in definitions {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    /// Loads every `*.json` file in `dir`, in file-name order.
    pub fn load_dir(registry: StrategyRegistry, dir: &Path) -> Result<Self, CatalogError> {
        let io_error = |source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.extension().is_some_and(|extension| extension == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Self::new(registry);
        for path in paths {
            let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let definition: AssessmentDefinition =
                serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), tool_id = %definition.tool_id, "loaded assessment definition");
            catalog.insert(definition)?;
        }
        info!(dir = %dir.display(), assessments = catalog.len(), "assessment catalog loaded");
        Ok(catalog)
    }

    /// Validates `definition`, binds its strategies and adds it.
    pub fn insert(&mut self, definition: AssessmentDefinition) -> Result<(), CatalogError> {
        if self.assessments.contains_key(&definition.tool_id) {
            return Err(CatalogError::DuplicateTool(definition.tool_id));
        }
        validate_definition(&definition)?;

        let scoring = match &definition.scoring {
            ScoringConfig::Custom { strategy } => Some(
                self.registry
                    .scoring(strategy)
                    .ok_or_else(|| CatalogError::UnknownStrategy {
                        tool: definition.tool_id.clone(),
                        strategy: strategy.clone(),
                    })?,
            ),
            _ => None,
        };
        let insights = match &definition.insight_strategy {
            Some(strategy) => Some(self.registry.insights(strategy).ok_or_else(|| {
                CatalogError::UnknownStrategy {
                    tool: definition.tool_id.clone(),
                    strategy: strategy.clone(),
                }
            })?),
            None => None,
        };

        let tool_id = definition.tool_id.clone();
        self.assessments.insert(
            tool_id,
            Arc::new(ResolvedAssessment {
                definition: Arc::new(definition),
                scoring,
                insights,
            }),
        );
        Ok(())
    }

    pub fn get(&self, tool_id: &str) -> Option<Arc<ResolvedAssessment>> {
        self.assessments.get(tool_id).cloned()
    }

    pub fn tool_ids(&self) -> impl Iterator<Item = &str> {
        self.assessments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assessments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
    }
}

fn validate_definition(definition: &AssessmentDefinition) -> Result<(), CatalogError> {
    let tool = &definition.tool_id;
    if definition.questions.is_empty() {
        return Err(CatalogError::EmptyAssessment(tool.clone()));
    }

    let mut ids = BTreeSet::new();
    for question in &definition.questions {
        if !ids.insert(question.id.as_str()) {
            return Err(CatalogError::DuplicateQuestion {
                tool: tool.clone(),
                question: question.id.clone(),
            });
        }
        if let Some(weight) = question.weight.filter(|weight| !valid_weight(*weight)) {
            return Err(CatalogError::InvalidWeight {
                tool: tool.clone(),
                owner: question.id.clone(),
                weight,
            });
        }
        if let Some(reason) = question_defect(&question.kind) {
            return Err(CatalogError::InvalidQuestion {
                tool: tool.clone(),
                question: question.id.clone(),
                reason: reason.to_string(),
            });
        }
    }

    if let ScoringConfig::CategoryBased { categories } = &definition.scoring {
        validate_categories(definition, &ids, categories)?;
    }

    validate_tiers(tool, &definition.result_tiers)
}

fn valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight >= 0.0
}

/// Categories must partition the required questions: each one listed exactly
/// once. Optional questions may be listed at most once or left out.
fn validate_categories(
    definition: &AssessmentDefinition,
    ids: &BTreeSet<&str>,
    categories: &[CategoryDefinition],
) -> Result<(), CatalogError> {
    let tool = &definition.tool_id;
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    for category in categories {
        if !valid_weight(category.weight) {
            return Err(CatalogError::InvalidWeight {
                tool: tool.clone(),
                owner: category.id.clone(),
                weight: category.weight,
            });
        }
        for question in &category.question_ids {
            if !ids.contains(question.as_str()) {
                return Err(CatalogError::UnknownCategoryQuestion {
                    tool: tool.clone(),
                    category: category.id.clone(),
                    question: question.clone(),
                });
            }
            if let Some(first) = owners.insert(question.as_str(), category.id.as_str()) {
                return Err(CatalogError::OverlappingCategories {
                    tool: tool.clone(),
                    question: question.clone(),
                    first: first.to_string(),
                    second: category.id.clone(),
                });
            }
        }
    }

    match definition
        .required_questions()
        .find(|question| !owners.contains_key(question.id.as_str()))
    {
        Some(orphan) => Err(CatalogError::UncategorizedQuestion {
            tool: tool.clone(),
            question: orphan.id.clone(),
        }),
        None => Ok(()),
    }
}

fn question_defect(kind: &QuestionKind) -> Option<&'static str> {
    match kind {
        QuestionKind::MultipleChoice { options, .. } if options.is_empty() => {
            Some("multiple choice needs at least one option")
        }
        QuestionKind::Scale { min, max, .. } if min >= max => Some("scale min must be below max"),
        QuestionKind::Slider { min, max, .. } if min >= max || min.is_nan() || max.is_nan() => {
            Some("slider min must be below max")
        }
        QuestionKind::Slider { step: Some(step), .. } if *step <= 0.0 => {
            Some("slider step must be positive")
        }
        QuestionKind::Text {
            min_length,
            max_length: Some(max_length),
        } if min_length > max_length => Some("text min_length exceeds max_length"),
        QuestionKind::Ranking { items } if items.len() < 2 => {
            Some("ranking needs at least two items")
        }
        QuestionKind::Matrix { rows, columns } if rows.is_empty() || columns.is_empty() => {
            Some("matrix needs rows and columns")
        }
        _ => None,
    }
}

/// Tiers must each lie within 0..=100 and, sorted by min, neither overlap nor
/// leave more than `MAX_TIER_GAP` between neighbours.
fn validate_tiers(tool: &str, tiers: &[ResultTier]) -> Result<(), CatalogError> {
    for tier in tiers {
        let in_bounds = (0.0..=100.0).contains(&tier.min_percentage)
            && (0.0..=100.0).contains(&tier.max_percentage);
        if !in_bounds || tier.min_percentage > tier.max_percentage {
            return Err(CatalogError::InvalidTier {
                tool: tool.to_string(),
                tier: tier.id.clone(),
                min: tier.min_percentage,
                max: tier.max_percentage,
            });
        }
    }

    let mut sorted: Vec<&ResultTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.min_percentage.total_cmp(&b.min_percentage));
    for pair in sorted.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if upper.min_percentage <= lower.max_percentage {
            return Err(CatalogError::OverlappingTiers {
                tool: tool.to_string(),
                first: lower.id.clone(),
                second: upper.id.clone(),
            });
        }
        if upper.min_percentage - lower.max_percentage > MAX_TIER_GAP {
            return Err(CatalogError::TierGap {
                tool: tool.to_string(),
                first: lower.id.clone(),
                second: upper.id.clone(),
            });
        }
    }
    Ok(())
}
