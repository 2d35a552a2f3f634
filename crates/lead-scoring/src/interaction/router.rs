use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::actions::ActionDispatcher;
use super::events::{InteractionEvent, LeadId};
use super::repository::EventRepository;
use super::service::{InteractionService, InteractionServiceError};
use crate::store::RepositoryError;

/// Router exposing stateless scoring and per-lead event intake.
pub fn interaction_router<R, D>(service: Arc<InteractionService<R, D>>) -> Router
where
    R: EventRepository + 'static,
    D: ActionDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/scoring/calculate",
            post(calculate_handler::<R, D>),
        )
        .route("/api/v1/scoring/summary", post(summary_handler::<R, D>))
        .route(
            "/api/v1/leads/:lead_id/events",
            post(record_handler::<R, D>),
        )
        .route("/api/v1/leads/:lead_id/score", get(score_handler::<R, D>))
        .route(
            "/api/v1/leads/:lead_id/summary",
            get(lead_summary_handler::<R, D>),
        )
        .with_state(service)
}

/// Scores a posted history with the service's rule table, without storing it.
pub(crate) async fn calculate_handler<R, D>(
    State(service): State<Arc<InteractionService<R, D>>>,
    Json(events): Json<Vec<InteractionEvent>>,
) -> Response
where
    R: EventRepository + 'static,
    D: ActionDispatcher + 'static,
{
    (StatusCode::OK, Json(service.pipeline().score(&events))).into_response()
}

pub(crate) async fn summary_handler<R, D>(
    State(service): State<Arc<InteractionService<R, D>>>,
    Json(events): Json<Vec<InteractionEvent>>,
) -> Response
where
    R: EventRepository + 'static,
    D: ActionDispatcher + 'static,
{
    (StatusCode::OK, Json(service.pipeline().summary(&events))).into_response()
}

pub(crate) async fn record_handler<R, D>(
    State(service): State<Arc<InteractionService<R, D>>>,
    Path(lead_id): Path<String>,
    Json(event): Json<InteractionEvent>,
) -> Response
where
    R: EventRepository + 'static,
    D: ActionDispatcher + 'static,
{
    match service.record(&LeadId(lead_id), event) {
        Ok(recorded) => (StatusCode::ACCEPTED, Json(recorded)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn score_handler<R, D>(
    State(service): State<Arc<InteractionService<R, D>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: EventRepository + 'static,
    D: ActionDispatcher + 'static,
{
    match service.score(&LeadId(lead_id)) {
        Ok(score) => (StatusCode::OK, Json(score)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn lead_summary_handler<R, D>(
    State(service): State<Arc<InteractionService<R, D>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: EventRepository + 'static,
    D: ActionDispatcher + 'static,
{
    match service.summary(&LeadId(lead_id)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: InteractionServiceError) -> Response {
    let status = match &error {
        InteractionServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        InteractionServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        InteractionServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
