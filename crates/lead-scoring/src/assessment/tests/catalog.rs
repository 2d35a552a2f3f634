use super::common::*;
use std::fs;
use std::path::PathBuf;

use crate::assessment::catalog::{AssessmentCatalog, CatalogError};
use crate::assessment::config::{AssessmentDefinition, ScoringConfig};
use crate::assessment::questions::QuestionKind;
use crate::assessment::strategy::StrategyRegistry;

fn load(definition: AssessmentDefinition) -> Result<AssessmentCatalog, CatalogError> {
    AssessmentCatalog::from_definitions(StrategyRegistry::new(), vec![definition])
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "lead-scoring-{name}-{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[test]
fn accepts_contiguous_integer_tiers() {
    let catalog = load(mindset_definition()).expect("valid");
    assert_eq!(catalog.tool_ids().collect::<Vec<_>>(), vec![TOOL]);
    assert!(catalog.get(TOOL).is_some());
    assert!(catalog.get("other").is_none());
}

#[test]
fn rejects_overlapping_tiers() {
    let mut definition = mindset_definition();
    definition.result_tiers[1].min_percentage = 30.0;
    assert!(matches!(
        load(definition),
        Err(CatalogError::OverlappingTiers { ref first, ref second, .. })
            if first == "fixed" && second == "developing"
    ));
}

#[test]
fn rejects_gaps_between_tiers() {
    let mut definition = mindset_definition();
    definition.result_tiers[1].min_percentage = 45.0;
    assert!(matches!(load(definition), Err(CatalogError::TierGap { .. })));
}

#[test]
fn rejects_inverted_and_out_of_bounds_tiers() {
    let mut inverted = mindset_definition();
    inverted.result_tiers[0].max_percentage = -1.0;
    assert!(matches!(load(inverted), Err(CatalogError::InvalidTier { .. })));

    let mut beyond = mindset_definition();
    beyond.result_tiers[2].max_percentage = 120.0;
    assert!(matches!(load(beyond), Err(CatalogError::InvalidTier { .. })));
}

#[test]
fn rejects_structural_defects() {
    let mut empty = mindset_definition();
    empty.questions.clear();
    empty.scoring = ScoringConfig::Simple;
    assert!(matches!(load(empty), Err(CatalogError::EmptyAssessment(_))));

    let mut duplicate = mindset_definition();
    duplicate.questions.push(scale("persist", 1, 5, None));
    assert!(matches!(
        load(duplicate),
        Err(CatalogError::DuplicateQuestion { .. })
    ));

    let mut dangling = mindset_definition();
    if let ScoringConfig::CategoryBased { categories } = &mut dangling.scoring {
        categories[1].question_ids.push("ghost".to_string());
    }
    assert!(matches!(
        load(dangling),
        Err(CatalogError::UnknownCategoryQuestion { ref question, .. }) if question == "ghost"
    ));

    let mut broken_scale = mindset_definition();
    broken_scale.questions[0].kind = QuestionKind::Scale {
        min: 5,
        max: 5,
        labels: Default::default(),
    };
    assert!(matches!(
        load(broken_scale),
        Err(CatalogError::InvalidQuestion { .. })
    ));
}

#[test]
fn categories_must_partition_the_required_questions() {
    let mut shared = mindset_definition();
    if let ScoringConfig::CategoryBased { categories } = &mut shared.scoring {
        categories[1].question_ids.push("persist".to_string());
    }
    assert!(matches!(
        load(shared),
        Err(CatalogError::OverlappingCategories { ref question, ref first, ref second, .. })
            if question == "persist" && first == "resilience" && second == "curiosity"
    ));

    let mut orphaned = mindset_definition();
    if let ScoringConfig::CategoryBased { categories } = &mut orphaned.scoring {
        categories[1].question_ids.clear();
    }
    assert!(matches!(
        load(orphaned),
        Err(CatalogError::UncategorizedQuestion { ref question, .. }) if question == "challenge"
    ));

    // The optional reflection sits outside every category and still loads.
    let mut listed_once = mindset_definition();
    if let ScoringConfig::CategoryBased { categories } = &mut listed_once.scoring {
        categories[1].question_ids.push("reflection".to_string());
    }
    assert!(load(listed_once).is_ok());
}

#[test]
fn rejects_negative_and_non_finite_weights() {
    let mut nan_category = mindset_definition();
    if let ScoringConfig::CategoryBased { categories } = &mut nan_category.scoring {
        categories[0].weight = f64::NAN;
    }
    assert!(matches!(
        load(nan_category),
        Err(CatalogError::InvalidWeight { ref owner, .. }) if owner == "resilience"
    ));

    let mut negative_question = mindset_definition();
    negative_question.questions[2].weight = Some(-2.0);
    assert!(matches!(
        load(negative_question),
        Err(CatalogError::InvalidWeight { ref owner, weight, .. })
            if owner == "challenge" && weight == -2.0
    ));

    let mut infinite_question = simple_definition("weighted", vec![scale("q", 1, 5, None)]);
    infinite_question.scoring = ScoringConfig::Weighted;
    infinite_question.questions[0].weight = Some(f64::INFINITY);
    assert!(matches!(
        load(infinite_question),
        Err(CatalogError::InvalidWeight { .. })
    ));

    let mut zero = mindset_definition();
    zero.questions[0].weight = Some(0.0);
    assert!(load(zero).is_ok());
}

#[test]
fn rejects_duplicate_tools_and_unregistered_strategies() {
    let duplicate = AssessmentCatalog::from_definitions(
        StrategyRegistry::new(),
        vec![mindset_definition(), mindset_definition()],
    );
    assert!(matches!(duplicate, Err(CatalogError::DuplicateTool(_))));

    let mut custom = mindset_definition();
    custom.scoring = ScoringConfig::Custom {
        strategy: "missing".to_string(),
    };
    assert!(matches!(
        load(custom),
        Err(CatalogError::UnknownStrategy { ref strategy, .. }) if strategy == "missing"
    ));

    let mut insights = mindset_definition();
    insights.insight_strategy = Some("missing".to_string());
    assert!(matches!(
        load(insights),
        Err(CatalogError::UnknownStrategy { .. })
    ));
}

#[test]
fn loads_json_definitions_from_a_directory() {
    let dir = scratch_dir("catalog-ok");
    let raw = serde_json::to_string_pretty(&mindset_definition()).expect("serialize");
    fs::write(dir.join("mindset.json"), raw).expect("write definition");
    fs::write(dir.join("notes.txt"), "ignored").expect("write note");

    let catalog = AssessmentCatalog::load_dir(StrategyRegistry::new(), &dir).expect("load dir");
    assert_eq!(catalog.len(), 1);
    assert_eq!(
        catalog.get(TOOL).expect("loaded").definition(),
        &mindset_definition()
    );

    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn reports_unparseable_files() {
    let dir = scratch_dir("catalog-bad");
    fs::write(dir.join("broken.json"), "{ \"tool_id\": ").expect("write definition");

    let error = AssessmentCatalog::load_dir(StrategyRegistry::new(), &dir).expect_err("parse");
    assert!(matches!(error, CatalogError::Parse { ref path, .. } if path.ends_with("broken.json")));

    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn reports_missing_directories() {
    let missing = std::env::temp_dir().join("lead-scoring-no-such-dir");
    assert!(matches!(
        AssessmentCatalog::load_dir(StrategyRegistry::new(), &missing),
        Err(CatalogError::Io { .. })
    ));
}
