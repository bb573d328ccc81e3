//! Story Player: API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storyplayer_core::error::PlaybackError;
use thiserror::Error;

/// Startup errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration file or an environment override is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// An asset source could not be set up.
    #[error("asset source error: {0}")]
    Assets(#[from] PlaybackError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `PlaybackError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub PlaybackError);

impl From<PlaybackError> for ApiError {
    fn from(err: PlaybackError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            PlaybackError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            PlaybackError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            PlaybackError::AssetUnavailable { .. } => {
                (StatusCode::BAD_GATEWAY, "asset_unavailable")
            }
            PlaybackError::Decode(_) => (StatusCode::UNPROCESSABLE_ENTITY, "decode_error"),
            PlaybackError::Destroyed => (StatusCode::GONE, "session_destroyed"),
            PlaybackError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
