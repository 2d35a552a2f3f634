use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::assessment::router::assessment_router;

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

fn router() -> Router {
    assessment_router(Arc::new(harness(vec![mindset_definition()]).service))
}

fn session_uri(suffix: &str) -> String {
    format!("/api/v1/assessments/{TOOL}/sessions/{USER}{suffix}")
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request(method, uri, body))
        .await
        .expect("response");
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return (status, Value::Null);
    }
    (status, read_json_body(response).await)
}

#[tokio::test]
async fn session_lifecycle_over_http() {
    let router = router();

    let (status, body) = send(&router, "POST", &session_uri(""), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], json!("created"));

    let (status, body) = send(
        &router,
        "POST",
        &session_uri("/responses"),
        Some(json!({ "question_id": "persist", "answer": { "type": "number", "value": 5 }, "time_spent_seconds": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], json!("in_progress"));
    assert_eq!(body["completion_rate"], json!(0.25));

    let (status, body) = send(&router, "POST", &session_uri("/complete"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("1 of 3"));

    for answer in [
        json!({ "question_id": "feedback", "answer": { "type": "choice", "value": ["seek"] } }),
        json!({ "question_id": "challenge", "answer": { "type": "number", "value": 1 } }),
    ] {
        let (status, _) = send(&router, "POST", &session_uri("/responses"), Some(answer)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&router, "GET", &session_uri("/scores"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["percentage"], json!(60.0));

    let (status, body) = send(&router, "POST", &session_uri("/complete"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["scores"]["tier"]["id"], json!("developing"));
    assert_eq!(body["response_count"], json!(3));

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/v1/assessments/{TOOL}/results/{USER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&router, "DELETE", &session_uri(""), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&router, "GET", &session_uri(""), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_answers_are_unprocessable() {
    let router = router();
    send(&router, "POST", &session_uri(""), None).await;

    let (status, body) = send(
        &router,
        "POST",
        &session_uri("/responses"),
        Some(json!({ "question_id": "feedback", "answer": { "type": "choice", "value": ["shrug"] } })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().expect("error").contains("shrug"));
}

#[tokio::test]
async fn navigation_routes_move_the_cursor() {
    let router = router();
    send(&router, "POST", &session_uri(""), None).await;

    let (_, body) = send(&router, "POST", &session_uri("/next"), None).await;
    assert_eq!(body["current_index"], json!(1));
    let (_, body) = send(&router, "POST", &session_uri("/previous"), None).await;
    assert_eq!(body["current_index"], json!(0));
    let (status, _) = send(&router, "POST", &session_uri("/save"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_tools_are_not_found() {
    let router = router();
    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/v1/assessments/unknown/sessions/{USER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("unknown assessment `unknown`"));

    let (status, _) = send(&router, "GET", &session_uri("/scores"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
