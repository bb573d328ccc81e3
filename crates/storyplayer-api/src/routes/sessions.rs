//! Routes for playback sessions.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use storyplayer_core::error::PlaybackError;
use storyplayer_core::intent::{Intent, IntentLog};
use storyplayer_timeline::application::command_handlers;
use storyplayer_timeline::application::query_handlers::{SessionView, session_view};
use storyplayer_timeline::domain::background::{MessageGeometry, PointerInput, Viewport};
use storyplayer_timeline::domain::branch::ChoiceOutcome;
use storyplayer_timeline::domain::commands;
use storyplayer_timeline::domain::interpreter::TurnReport;
use storyplayer_timeline::domain::seek::SeekOutcome;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, SessionSlot};

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Script identifier.
    pub event_id: String,
    /// Script category, the folder under `json/`.
    pub event_type: String,
    /// Continuous auto-play; absent means manual.
    #[serde(default)]
    pub auto_play: Option<bool>,
}

/// Request body for POST /{id}/choose.
#[derive(Debug, Deserialize)]
pub struct ChooseRequest {
    pub option: usize,
}

/// Request body for POST /{id}/seek.
#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub position: i64,
}

/// Request body for POST /{id}/background.
#[derive(Debug, Deserialize)]
pub struct BackgroundRequest {
    #[serde(default)]
    pub inputs: Vec<PointerInput>,
    pub viewport: Viewport,
    #[serde(default)]
    pub layout: Vec<MessageGeometry>,
}

/// Response body for every command: the session after the command, the
/// intents it produced, and the command's own outcome.
#[derive(Debug, Serialize)]
pub struct PlaybackResponse<T> {
    pub session: SessionView,
    pub intents: Vec<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<T>,
}

/// Outcome of a background sync.
#[derive(Debug, Serialize)]
pub struct BackgroundOutcome {
    /// Background the view changed to, if any.
    pub changed_to: Option<String>,
}

/// Outcome of a seek, flattened with a `rejected` flag.
#[derive(Debug, Serialize)]
pub struct SeekResponseOutcome {
    pub rejected: bool,
    #[serde(flatten)]
    pub detail: SeekOutcome,
}

fn respond<T>(slot: &SessionSlot, outcome: Option<T>) -> PlaybackResponse<T> {
    PlaybackResponse {
        session: session_view(&slot.session),
        intents: slot.log.drain(),
        outcome,
    }
}

/// Drops the intents a failed command recorded before it failed, so they
/// do not surface in the next response.
fn discard_on_error<T>(
    log: &IntentLog,
    result: Result<T, PlaybackError>,
) -> Result<T, PlaybackError> {
    if result.is_err() {
        let dropped = log.drain();
        if !dropped.is_empty() {
            warn!(dropped = dropped.len(), "intents of failed command discarded");
        }
    }
    result
}

/// POST /
#[instrument(skip(state, request), fields(event_type = %request.event_type, event_id = %request.event_id))]
async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<PlaybackResponse<()>>), ApiError> {
    let command = commands::StartSession {
        correlation_id: Uuid::new_v4(),
        category: request.event_type,
        script_id: request.event_id,
        auto_play: request.auto_play,
    };

    info!(correlation_id = %command.correlation_id, "handling start_session command");

    let log = Arc::new(IntentLog::new());
    let ports = state.ports_for(&log);
    let session = command_handlers::handle_start_session(
        &command,
        state.clock.as_ref(),
        state.names.clone(),
        &ports,
        &state.settings,
    )
    .await?;

    let slot = SessionSlot {
        session,
        log,
        ports,
        touched_at: state.clock.now(),
    };
    let response = respond(&slot, None);
    state.evict_idle_sessions().await;
    state.sessions.insert(slot).await;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let slot = state.sessions.get(session_id).await?;
    let slot = slot.lock().await;
    Ok(Json(session_view(&slot.session)))
}

/// POST /{id}/advance
#[instrument(skip(state))]
async fn advance(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<PlaybackResponse<TurnReport>>, ApiError> {
    let command = commands::AdvanceTurn {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    info!(correlation_id = %command.correlation_id, "handling advance_turn command");

    let slot = state.sessions.get(session_id).await?;
    let mut guard = slot.lock().await;
    guard.touched_at = state.clock.now();
    let SessionSlot {
        session, ports, log, ..
    } = &mut *guard;
    let report = discard_on_error(
        log,
        command_handlers::handle_advance_turn(&command, session, ports, &state.settings).await,
    )?;

    Ok(Json(respond(&guard, Some(report))))
}

/// POST /{id}/choose
#[instrument(skip(state, request), fields(option = request.option))]
async fn choose(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ChooseRequest>,
) -> Result<Json<PlaybackResponse<ChoiceOutcome>>, ApiError> {
    let command = commands::ChooseOption {
        correlation_id: Uuid::new_v4(),
        session_id,
        option: request.option,
    };

    info!(correlation_id = %command.correlation_id, "handling choose_option command");

    let slot = state.sessions.get(session_id).await?;
    let mut guard = slot.lock().await;
    guard.touched_at = state.clock.now();
    let SessionSlot {
        session, ports, log, ..
    } = &mut *guard;
    let outcome = discard_on_error(
        log,
        command_handlers::handle_choose_option(&command, session, ports, &state.settings).await,
    )?;

    Ok(Json(respond(&guard, Some(outcome))))
}

/// POST /{id}/seek
#[instrument(skip(state, request), fields(position = request.position))]
async fn seek(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SeekRequest>,
) -> Result<Json<PlaybackResponse<SeekResponseOutcome>>, ApiError> {
    let command = commands::SeekTo {
        correlation_id: Uuid::new_v4(),
        session_id,
        position: request.position,
    };

    info!(correlation_id = %command.correlation_id, "handling seek command");

    let slot = state.sessions.get(session_id).await?;
    let mut guard = slot.lock().await;
    guard.touched_at = state.clock.now();
    let SessionSlot {
        session, ports, log, ..
    } = &mut *guard;
    let detail = discard_on_error(
        log,
        command_handlers::handle_seek(&command, session, ports, &state.settings).await,
    )?;
    let outcome = SeekResponseOutcome {
        rejected: matches!(detail, SeekOutcome::Rejected { .. }),
        detail,
    };

    Ok(Json(respond(&guard, Some(outcome))))
}

/// POST /{id}/background
#[instrument(skip(state, request), fields(inputs = request.inputs.len()))]
async fn sync_background(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<BackgroundRequest>,
) -> Result<Json<PlaybackResponse<BackgroundOutcome>>, ApiError> {
    let command = commands::SyncBackground {
        correlation_id: Uuid::new_v4(),
        session_id,
        inputs: request.inputs,
        viewport: request.viewport,
        layout: request.layout,
    };

    info!(correlation_id = %command.correlation_id, "handling sync_background command");

    let slot = state.sessions.get(session_id).await?;
    let mut guard = slot.lock().await;
    guard.touched_at = state.clock.now();
    let SessionSlot {
        session, ports, log, ..
    } = &mut *guard;
    let changed_to = discard_on_error(
        log,
        command_handlers::handle_sync_background(&command, session, ports, &state.settings)
            .await,
    )?;

    Ok(Json(respond(&guard, Some(BackgroundOutcome { changed_to }))))
}

/// DELETE /{id}
#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DestroySession {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    info!(correlation_id = %command.correlation_id, "handling destroy_session command");

    let slot = state.sessions.get(session_id).await?;
    {
        let mut guard = slot.lock().await;
        let SessionSlot { session, ports, .. } = &mut *guard;
        command_handlers::handle_destroy_session(&command, session, ports, &state.settings).await;
    }
    state.sessions.remove(session_id).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for playback sessions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_session))
        .route("/{id}", get(get_session).delete(destroy))
        .route("/{id}/advance", post(advance))
        .route("/{id}/choose", post(choose))
        .route("/{id}/seek", post(seek))
        .route("/{id}/background", post(sync_background))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use storyplayer_core::names::NameAliasIndex;
    use storyplayer_core::presentation::Presentation;
    use storyplayer_test_support::{FixedClock, InMemoryLoader, fallback_loader, fixed_now};
    use storyplayer_timeline::domain::interpreter::TimelineSettings;
    use tower::ServiceExt;

    fn test_app_state() -> AppState {
        let script = serde_json::to_vec(&json!([
            {"bg": "A", "textFrame": "001", "speaker": "真乃", "text": "hi", "textCtrl": "p"},
            {"textFrame": "001", "text": "bye", "textCtrl": "p"},
            {}
        ]))
        .unwrap();
        let local = InMemoryLoader::new("local")
            .with_file("json/produce_events/1.json", script)
            .with_file("images/event/bg/A.jpg", b"a".to_vec());
        AppState::new(
            Arc::new(FixedClock(fixed_now())),
            fallback_loader(Arc::new(local)),
            Arc::new(NameAliasIndex::default()),
            TimelineSettings {
                settle_delay: std::time::Duration::ZERO,
                ..TimelineSettings::default()
            },
        )
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_session_returns_201_with_view() {
        // Arrange
        let app = router().with_state(test_app_state());
        let request = post("/", &json!({"event_id": "1", "event_type": "produce_events"}));

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["session"]["mode"], "manual");
        assert_eq!(json["session"]["state"], "awaiting_input");
        assert_eq!(json["session"]["length"], 3);
        assert!(json["intents"].as_array().unwrap().is_empty());
        assert!(json.get("outcome").is_none());
    }

    #[tokio::test]
    async fn test_start_session_returns_502_when_script_missing() {
        // Arrange
        let app = router().with_state(test_app_state());
        let request = post("/", &json!({"event_id": "404", "event_type": "produce_events"}));

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "asset_unavailable");
    }

    #[tokio::test]
    async fn test_start_session_returns_422_for_missing_fields() {
        // Arrange
        let app = router().with_state(test_app_state());
        let request = post("/", &json!({"event_id": "1"}));

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert: Axum returns 422 for deserialization failures.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_advance_returns_turn_and_intents() {
        // Arrange
        let state = test_app_state();
        let started = router()
            .with_state(state.clone())
            .oneshot(post("/", &json!({"event_id": "1", "event_type": "produce_events"})))
            .await
            .unwrap();
        let session_id = body_json(started).await["session"]["session_id"]
            .as_str()
            .unwrap()
            .to_owned();

        // Act
        let response = router()
            .with_state(state)
            .oneshot(post(&format!("/{session_id}/advance"), &json!({})))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["outcome"]["from"], 0);
        assert_eq!(json["outcome"]["to"], 1);
        assert_eq!(json["session"]["background"], "A");
        let kinds: Vec<&str> = json["intents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|intent| intent["type"].as_str().unwrap())
            .collect();
        assert!(kinds.contains(&"cross_fade"));
        assert!(kinds.contains(&"append_message"));
    }

    #[tokio::test]
    async fn test_get_unknown_session_returns_404() {
        // Arrange
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .method("GET")
            .uri(format!("/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "session_not_found");
    }

    #[tokio::test]
    async fn test_choose_without_branch_returns_400() {
        // Arrange
        let state = test_app_state();
        let started = router()
            .with_state(state.clone())
            .oneshot(post("/", &json!({"event_id": "1", "event_type": "produce_events"})))
            .await
            .unwrap();
        let session_id = body_json(started).await["session"]["session_id"]
            .as_str()
            .unwrap()
            .to_owned();

        // Act
        let response = router()
            .with_state(state)
            .oneshot(post(&format!("/{session_id}/choose"), &json!({"option": 0})))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_failed_command_discards_its_intents() {
        // Arrange
        let log = IntentLog::new();
        log.clear_effects();

        // Act
        let result = discard_on_error(&log, Err::<(), _>(PlaybackError::Destroyed));

        // Assert
        assert!(matches!(result, Err(PlaybackError::Destroyed)));
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_successful_command_keeps_its_intents() {
        // Arrange
        let log = IntentLog::new();
        log.clear_effects();

        // Act
        let result = discard_on_error(&log, Ok(()));

        // Assert
        assert!(result.is_ok());
        assert_eq!(log.snapshot(), vec![Intent::ClearEffects]);
    }

    #[tokio::test]
    async fn test_start_session_evicts_idle_sessions() {
        // Arrange
        let state = test_app_state().with_session_idle(std::time::Duration::ZERO);
        let app = router().with_state(state.clone());
        let first = app
            .clone()
            .oneshot(post("/", &json!({"event_id": "1", "event_type": "produce_events"})))
            .await
            .unwrap();
        let first_id = body_json(first).await["session"]["session_id"]
            .as_str()
            .unwrap()
            .to_owned();
        {
            let slot = state.sessions.get(first_id.parse().unwrap()).await.unwrap();
            slot.lock().await.touched_at = fixed_now() - chrono::TimeDelta::seconds(1);
        }

        // Act
        let second = app
            .oneshot(post("/", &json!({"event_id": "1", "event_type": "produce_events"})))
            .await
            .unwrap();

        // Assert
        assert_eq!(second.status(), StatusCode::CREATED);
        assert_eq!(state.sessions.len().await, 1);
        assert!(state.sessions.get(first_id.parse().unwrap()).await.is_err());
    }
}
