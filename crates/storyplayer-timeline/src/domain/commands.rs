//! Commands for the Timeline context.

use uuid::Uuid;

use super::background::{MessageGeometry, PointerInput, Viewport};

/// Command to load a script and open a playback session on it.
#[derive(Debug, Clone)]
pub struct StartSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Script category (the folder under `json/`).
    pub category: String,
    /// Script identifier.
    pub script_id: String,
    /// Continuous auto-play; absent means manual.
    pub auto_play: Option<bool>,
}

/// Command to play the next turn.
#[derive(Debug, Clone)]
pub struct AdvanceTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to advance.
    pub session_id: Uuid,
}

/// Command to resolve the pending branch.
#[derive(Debug, Clone)]
pub struct ChooseOption {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session awaiting a choice.
    pub session_id: Uuid,
    /// Option index in display order.
    pub option: usize,
}

/// Command to jump playback to a position.
#[derive(Debug, Clone)]
pub struct SeekTo {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to seek.
    pub session_id: Uuid,
    /// Requested position, as received. Negative values are rejected.
    pub position: i64,
}

/// Command to feed pointer and scroll input to the background synchronizer.
#[derive(Debug, Clone)]
pub struct SyncBackground {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session being read.
    pub session_id: Uuid,
    /// Inputs observed since the last frame, in order.
    pub inputs: Vec<PointerInput>,
    /// Visible area of the message list.
    pub viewport: Viewport,
    /// Rendered message extents.
    pub layout: Vec<MessageGeometry>,
}

/// Command to tear a session down.
#[derive(Debug, Clone)]
pub struct DestroySession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to destroy.
    pub session_id: Uuid,
}
