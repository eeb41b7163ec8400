//! HTTP surface tests driven through the router without a listener

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::Harness;
use playbook::api::{build_router, AppState, REQUESTER_HEADER};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

fn router(harness: &Harness) -> Router {
    let state = AppState::new(harness.repository.clone(), harness.projection.clone());
    build_router(state, Duration::from_secs(5))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    requester: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(id) = requester {
        request = request.header(REQUESTER_HEADER, id.to_string());
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn sign_up(app: &Router, username: &str) -> Uuid {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "username": username, "display_name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::new().await;
    let app = router(&harness);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let harness = Harness::new().await;
    let app = router(&harness);

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_requester_header_is_required() {
    let harness = Harness::new().await;
    let app = router(&harness);

    let (status, body) = send(&app, Method::GET, "/api/pickup-lines", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");
    assert_eq!(body["error"]["status"], 401);

    let request = Request::builder()
        .uri("/api/pickup-lines")
        .header(REQUESTER_HEADER, "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_up_validation() {
    let harness = Harness::new().await;
    let app = router(&harness);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "username": "not an email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    sign_up(&app, "taken@example.com").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "username": "taken@example.com" })),
    )
    .await;
    // Store conflicts surface as a generic server error
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_item_lifecycle_over_http() {
    let harness = Harness::new().await;
    let app = router(&harness);
    let alice = sign_up(&app, "alice@example.com").await;
    let bob = sign_up(&app, "bob@example.com").await;

    let (status, tag) = send(
        &app,
        Method::POST,
        "/api/tags",
        Some(alice),
        Some(json!({ "name": "nerdy" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, public) = send(
        &app,
        Method::POST,
        "/api/pickup-lines",
        Some(alice),
        Some(json!({
            "title": "Are you a keyboard?",
            "content": "Because you're just my type",
            "tags": [tag["id"]],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(public["visible"], true);
    let public_id = public["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/pickup-lines",
        Some(alice),
        Some(json!({
            "title": "Draft",
            "content": "Still working on it",
            "visible": false,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Bob only sees the public line in the feed
    let (status, page) = send(&app, Method::GET, "/api/pickup-lines/feed", Some(bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Are you a keyboard?");
    assert_eq!(page["items"][0]["tags"][0]["name"], "nerdy");
    assert_eq!(page["items"][0]["owner"]["username"], "alice@example.com");

    // Bob upvotes it
    let (status, reaction) = send(
        &app,
        Method::PUT,
        &format!("/api/pickup-lines/{}/reaction", public_id),
        Some(bob),
        Some(json!({ "starred": true, "vote": "UPVOTE" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reaction["vote"], "UPVOTE");
    assert_eq!(reaction["starred"], true);

    let (status, detail) = send(
        &app,
        Method::GET,
        &format!("/api/pickup-lines/{}", public_id),
        Some(bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["statistics"]["number_of_successes"], 1);
    assert_eq!(detail["reaction"]["vote"], "UPVOTE");

    let (status, starred) = send(
        &app,
        Method::GET,
        "/api/pickup-lines?starred=true",
        Some(bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(starred["total"], 1);

    // Only the owner may delete
    let uri = format!("/api/pickup-lines/{}", public_id);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, Method::DELETE, &uri, Some(alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_not_found_error_shape() {
    let harness = Harness::new().await;
    let app = router(&harness);
    let alice = sign_up(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/pickup-lines/{}", Uuid::new_v4()),
        Some(alice),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["status"], 404);
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_invalid_sorting_is_rejected() {
    let harness = Harness::new().await;
    let app = router(&harness);
    let alice = sign_up(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/pickup-lines?sorting_type=LOUDEST",
        Some(alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/pickup-lines?sorting_type=trending",
        Some(alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_query_string_is_json_validation_error() {
    let harness = Harness::new().await;
    let app = router(&harness);
    let alice = sign_up(&app, "alice@example.com").await;

    for uri in [
        "/api/pickup-lines?page=-1",
        "/api/pickup-lines/feed?starred=maybe",
        "/api/users?page=abc",
    ] {
        let (status, body) = send(&app, Method::GET, uri, Some(alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{}", uri);
        assert_eq!(body["error"]["status"], 400, "{}", uri);
    }

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/pickup-lines?user_id=",
        Some(alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/pickup-lines?user_id=nobody",
        Some(alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_reindex_endpoint() {
    let harness = Harness::new().await;
    let app = router(&harness);
    let alice = sign_up(&app, "alice@example.com").await;
    send(
        &app,
        Method::POST,
        "/api/pickup-lines",
        Some(alice),
        Some(json!({ "title": "Hi", "content": "There" })),
    )
    .await;

    let (status, report) = send(&app, Method::POST, "/admin/reindex", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["users"], 1);
    assert_eq!(report["items"], 1);
    assert_eq!(report["skipped"], 0);
}
