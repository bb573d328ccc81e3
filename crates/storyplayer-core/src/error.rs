//! Playback error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level playback error type.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A playback session was not found.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// A request that violates the current playback state or bounds.
    #[error("validation error: {0}")]
    Validation(String),

    /// Both the local and the remote source failed to provide an asset.
    #[error("asset unavailable: {path} ({reason})")]
    AssetUnavailable {
        /// Relative asset path that was requested.
        path: String,
        /// Failure reported by the last source tried.
        reason: String,
    },

    /// Asset bytes could not be decoded (script JSON, audio data).
    #[error("decode error: {0}")]
    Decode(String),

    /// The session or audio manager was destroyed and must not be reused.
    #[error("playback has been destroyed")]
    Destroyed,

    /// An infrastructure error (I/O, network).
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
