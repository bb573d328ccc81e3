//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use storyplayer_core::names::NameAliasIndex;
use storyplayer_test_support::{FixedClock, InMemoryLoader, fallback_loader, fixed_now};
use storyplayer_timeline::domain::interpreter::TimelineSettings;
use tower::ServiceExt;

use storyplayer_api::state::AppState;

/// Script served at `json/produce_events/300100101.json`: a greeting, a
/// two-way branch, and one scene per option.
pub fn branching_script() -> serde_json::Value {
    serde_json::json!([
        {"bg": "A", "bgm": "m1", "textFrame": "001", "speaker": "真乃", "text": "hi", "voice": "v1", "textCtrl": "p"},
        {"textFrame": "002", "text": "hello", "textCtrl": "l"},
        {"select": "yes", "nextLabel": "yes"},
        {"select": "no", "nextLabel": "no"},
        {"textCtrl": "cm"},
        {"label": "yes", "textFrame": "001", "text": "great", "textCtrl": "p"},
        {"label": "no", "bg": "B", "bgm": "m2", "textFrame": "001", "text": "oh", "textCtrl": "p"},
        {}
    ])
}

/// Local asset source holding the branching script and its backgrounds.
pub fn local_assets() -> InMemoryLoader {
    InMemoryLoader::new("local")
        .with_file(
            "json/produce_events/300100101.json",
            serde_json::to_vec(&branching_script()).unwrap(),
        )
        .with_file("images/event/bg/A.jpg", b"a".to_vec())
        .with_file("images/event/bg/B.jpg", b"b".to_vec())
}

/// Build the full app router over in-memory assets and a fixed clock. Uses
/// the same route structure as `main.rs`.
pub fn build_test_app() -> Router {
    storyplayer_api::app(test_state())
}

pub fn test_state() -> AppState {
    AppState::new(
        Arc::new(FixedClock(fixed_now())),
        fallback_loader(Arc::new(local_assets())),
        Arc::new(NameAliasIndex::default()),
        TimelineSettings {
            settle_delay: Duration::ZERO,
            ..TimelineSettings::default()
        },
    )
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Start a session on the branching script and return its id.
pub async fn start_session(app: Router, auto_play: Option<bool>) -> String {
    let (status, json) = post_json(
        app,
        "/api/v1/sessions",
        &serde_json::json!({
            "event_id": "300100101",
            "event_type": "produce_events",
            "auto_play": auto_play,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["session"]["session_id"].as_str().unwrap().to_owned()
}
