use crate::infra::{assessment_service, builtin_definition, interaction_service};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use lead_scoring::assessment::{
    Answer, AssessmentCatalog, Question, QuestionKind, QuestionResponse, StrategyRegistry,
};
use lead_scoring::error::AppError;
use lead_scoring::interaction::{
    calculate_score, scoring_summary, EventPayload, EventType, InteractionEvent, LeadId, LeadScore,
    ScoringSummary,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding an array of interaction events
    #[arg(long)]
    pub(crate) events: PathBuf,
    /// Include the per-type breakdown and recommendations
    #[arg(long)]
    pub(crate) summary: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Lead identifier used for the scripted journey
    #[arg(long, default_value = "demo-lead")]
    pub(crate) lead_id: String,
    /// Skip the self-assessment portion of the demo
    #[arg(long)]
    pub(crate) skip_assessment: bool,
}

#[derive(Debug, Serialize)]
struct ScoreReport {
    event_count: usize,
    ignored_event_count: usize,
    score: LeadScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ScoringSummary>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = fs::read_to_string(&args.events)?;
    let events: Vec<InteractionEvent> = serde_json::from_str(&raw)?;

    let report = ScoreReport {
        event_count: events.len(),
        ignored_event_count: events
            .iter()
            .filter(|event| event.event_type() == EventType::Unknown)
            .count(),
        score: calculate_score(&events),
        summary: args.summary.then(|| scoring_summary(&events)),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        lead_id,
        skip_assessment,
    } = args;
    let lead = LeadId(lead_id);

    println!("Lead scoring demo");
    let (interactions, outbox) = interaction_service();
    for event in journey(Utc::now() - Duration::days(6)) {
        let label = event.event_type();
        let recorded = match interactions.record(&lead, event) {
            Ok(recorded) => recorded,
            Err(err) => {
                println!("  Interaction rejected: {}", err);
                return Ok(());
            }
        };
        let score = &recorded.outcome.new_score;
        println!(
            "- {:<22} total {:>4} | {:<11} | conversion {:>5.1}%",
            label.label(),
            score.total,
            score.tier.label(),
            score.conversion_probability
        );
        for action in &recorded.outcome.actions {
            println!("    -> {}", action);
        }
    }

    let summary = interactions.summary(&lead)?;
    println!("\nScore breakdown");
    for entry in &summary.breakdown {
        println!(
            "  - {}: {} event(s), {} pts{}",
            entry.event_type,
            entry.count,
            entry.points,
            if entry.capped { " (capped)" } else { "" }
        );
    }
    match summary.points_to_next_tier {
        Some(points) => println!("  {} points to the next tier", points),
        None => println!("  Top tier reached"),
    }
    for recommendation in &summary.recommendations {
        println!("  * {}", recommendation);
    }
    println!("  {} action(s) queued for integrations", outbox.events().len());

    if skip_assessment {
        return Ok(());
    }

    let definition = builtin_definition()?;
    let tool_id = definition.tool_id.clone();
    let user_id = lead.0.clone();
    let questions = definition.questions.clone();
    let catalog = AssessmentCatalog::from_definitions(StrategyRegistry::new(), [definition])?;
    let assessments = assessment_service(catalog);

    println!("\nSelf-assessment demo ({})", tool_id);
    assessments.start_session(&tool_id, &user_id)?;
    for question in &questions {
        let response = QuestionResponse {
            question_id: question.id.clone(),
            answer: sample_answer(question),
            time_spent_seconds: 20,
            timestamp: assessments.now(),
        };
        let session = assessments.submit_response(&tool_id, &user_id, response)?;
        println!(
            "- answered {:<20} {:>3.0}% complete",
            question.id,
            session.completion_rate * 100.0
        );
        assessments.next_question(&tool_id, &user_id)?;
    }

    let result = assessments.complete_assessment(&tool_id, &user_id)?;
    println!(
        "  Result {}: {:.1}% -> {}",
        result.id,
        result.scores.percentage,
        result
            .scores
            .tier
            .as_ref()
            .map(|tier| tier.label.as_str())
            .unwrap_or("unclassified")
    );
    for category in &result.scores.categories {
        println!("    - {}: {:.1}%", category.name, category.percentage);
    }
    println!("  Insights:");
    for insight in &result.insights {
        println!("    - [{:?}] {}: {}", insight.priority, insight.title, insight.message);
    }
    println!("  Recommendations:");
    for recommendation in &result.recommendations {
        println!("    - {}", recommendation);
    }

    Ok(())
}

/// A week-long path from first visit to an office visit request.
fn journey(start: DateTime<Utc>) -> Vec<InteractionEvent> {
    let day = |offset: i64, minutes: i64| start + Duration::days(offset) + Duration::minutes(minutes);
    vec![
        InteractionEvent::new(
            EventPayload::PageView {
                path: "/blog/growth-mindset".to_string(),
                duration_seconds: 120.0,
            },
            day(0, 0),
            "visit-1",
        ),
        InteractionEvent::new(
            EventPayload::ContentView {
                content_id: "mindset-101".to_string(),
            },
            day(0, 3),
            "visit-1",
        ),
        InteractionEvent::new(
            EventPayload::ToolStart {
                tool_id: "growth-mindset".to_string(),
            },
            day(3, 0),
            "visit-2",
        ),
        InteractionEvent::new(
            EventPayload::ToolComplete {
                tool_id: "growth-mindset".to_string(),
            },
            day(3, 8),
            "visit-2",
        ),
        InteractionEvent::new(EventPayload::EmailCapture, day(3, 9), "visit-2"),
        InteractionEvent::new(
            EventPayload::WebinarRegistration {
                webinar_id: "habits-live".to_string(),
            },
            day(5, 0),
            "visit-3",
        ),
        InteractionEvent::new(
            EventPayload::ReturnVisit {
                consecutive_days: 2,
            },
            day(6, 0),
            "visit-4",
        ),
        InteractionEvent::new(
            EventPayload::ToolComplete {
                tool_id: "habit-tracker".to_string(),
            },
            day(6, 10),
            "visit-4",
        ),
        InteractionEvent::new(EventPayload::OfficeVisitRequest, day(6, 15), "visit-4"),
    ]
}

/// A valid, upbeat answer for any question shape.
fn sample_answer(question: &Question) -> Answer {
    match &question.kind {
        QuestionKind::MultipleChoice { options, .. } => Answer::Choice(
            options
                .iter()
                .max_by(|a, b| a.score.total_cmp(&b.score))
                .map(|option| vec![option.id.clone()])
                .unwrap_or_default(),
        ),
        QuestionKind::Scale { max, .. } => Answer::Number(f64::from(*max)),
        QuestionKind::Slider { min, .. } => Answer::Number(*min),
        QuestionKind::Text { min_length, .. } => {
            let mut text = String::from("Run a workshop on giving useful feedback");
            while text.chars().count() < *min_length {
                text.push_str(", then keep practicing");
            }
            Answer::Text(text)
        }
        QuestionKind::Ranking { items } => Answer::Ranking(items.clone()),
        QuestionKind::Matrix { rows, columns } => Answer::Matrix(
            rows.iter()
                .filter_map(|row| columns.last().map(|column| (row.clone(), column.clone())))
                .collect(),
        ),
    }
}
