use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::questions::{Answer, QuestionResponse};
use super::repository::{ResultStore, SessionStore};
use super::service::{AssessmentError, AssessmentService};
use super::session::ProcessingError;
use crate::store::RepositoryError;

type SharedService<S, T> = Arc<AssessmentService<S, T>>;

/// Body of `POST .../responses`; the timestamp defaults to the server clock.
#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub question_id: String,
    pub answer: Answer,
    #[serde(default)]
    pub time_spent_seconds: u32,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Router exposing session lifecycle, scoring and result history per tool and user.
pub fn assessment_router<S, T>(service: SharedService<S, T>) -> Router
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/assessments/:tool_id/sessions/:user_id",
            post(start_handler::<S, T>)
                .get(session_handler::<S, T>)
                .delete(clear_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:tool_id/sessions/:user_id/responses",
            post(response_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:tool_id/sessions/:user_id/next",
            post(next_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:tool_id/sessions/:user_id/previous",
            post(previous_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:tool_id/sessions/:user_id/save",
            post(save_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:tool_id/sessions/:user_id/scores",
            get(scores_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:tool_id/sessions/:user_id/complete",
            post(complete_handler::<S, T>),
        )
        .route(
            "/api/v1/assessments/:tool_id/results/:user_id",
            get(results_handler::<S, T>),
        )
        .with_state(service)
}

pub(crate) async fn start_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    respond(StatusCode::CREATED, service.start_session(&tool_id, &user_id))
}

pub(crate) async fn session_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    respond(StatusCode::OK, service.session(&tool_id, &user_id))
}

pub(crate) async fn clear_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    match service.clear_session(&tool_id, &user_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn response_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
    Json(request): Json<SubmitResponseRequest>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    let response = QuestionResponse {
        question_id: request.question_id,
        answer: request.answer,
        time_spent_seconds: request.time_spent_seconds,
        timestamp: request.timestamp.unwrap_or_else(|| service.now()),
    };
    respond(
        StatusCode::OK,
        service.submit_response(&tool_id, &user_id, response),
    )
}

pub(crate) async fn next_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    respond(StatusCode::OK, service.next_question(&tool_id, &user_id))
}

pub(crate) async fn previous_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    respond(StatusCode::OK, service.previous_question(&tool_id, &user_id))
}

pub(crate) async fn save_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    respond(StatusCode::OK, service.save_progress(&tool_id, &user_id))
}

pub(crate) async fn scores_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    respond(StatusCode::OK, service.calculate_scores(&tool_id, &user_id))
}

pub(crate) async fn complete_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    respond(
        StatusCode::CREATED,
        service.complete_assessment(&tool_id, &user_id),
    )
}

pub(crate) async fn results_handler<S, T>(
    State(service): State<SharedService<S, T>>,
    Path((tool_id, user_id)): Path<(String, String)>,
) -> Response
where
    S: SessionStore + 'static,
    T: ResultStore + 'static,
{
    respond(StatusCode::OK, service.results(&tool_id, &user_id))
}

fn respond<V: serde::Serialize>(status: StatusCode, result: Result<V, AssessmentError>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: AssessmentError) -> Response {
    let status = match &error {
        AssessmentError::UnknownAssessment(_)
        | AssessmentError::Processing(ProcessingError::NoSession(_))
        | AssessmentError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssessmentError::Processing(_) | AssessmentError::Repository(RepositoryError::Conflict) => {
            StatusCode::CONFLICT
        }
        AssessmentError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
