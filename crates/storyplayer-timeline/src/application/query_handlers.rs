//! Query handlers for the Timeline context.
//!
//! Builds read-only views of a playback session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::branch::BranchOption;
use crate::domain::effective::EffectiveState;
use crate::domain::session::{Cursor, PlaybackMode, PlaybackSession, PlaybackState};

/// Read-only view of a branch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchView {
    /// Position of the record that opened the branch.
    pub start_index: usize,
    /// Options in display order.
    pub options: Vec<BranchOption>,
    /// Chosen option, once resolved.
    pub chosen: Option<usize>,
}

/// Read-only view of a playback session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    /// The session identifier.
    pub session_id: Uuid,
    pub mode: PlaybackMode,
    pub state: PlaybackState,
    pub cursor: Cursor,
    /// Number of records in the track.
    pub length: usize,
    /// Background on screen.
    pub background: Option<String>,
    /// Derived background, music and overlay.
    pub effective: EffectiveState,
    /// The open or last resolved branch.
    pub branch: Option<BranchView>,
    /// Messages presented so far.
    pub message_count: usize,
    pub started_at: Option<DateTime<Utc>>,
}

/// Builds the view of `session`.
#[must_use]
pub fn session_view(session: &PlaybackSession) -> SessionView {
    SessionView {
        session_id: session.id(),
        mode: session.mode(),
        state: session.state(),
        cursor: session.cursor(),
        length: session.track().len(),
        background: session.current_background().map(str::to_owned),
        effective: session.effective().clone(),
        branch: session.branch().map(|branch| BranchView {
            start_index: branch.start_index(),
            options: branch.options().to_vec(),
            chosen: branch.chosen(),
        }),
        message_count: session.messages().len(),
        started_at: session.started_at(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use storyplayer_core::names::NameAliasIndex;
    use storyplayer_test_support::track_from_value;

    use super::*;

    #[test]
    fn test_session_view_reflects_new_session() {
        // Arrange
        let session = PlaybackSession::new(
            Uuid::new_v4(),
            track_from_value(json!([{"bg": "A"}, {}, {}])),
            Arc::new(NameAliasIndex::default()),
            PlaybackMode::Manual,
        );

        // Act
        let view = session_view(&session);

        // Assert
        assert_eq!(view.session_id, session.id());
        assert_eq!(view.length, 3);
        assert_eq!(view.state, PlaybackState::AwaitingInput);
        assert_eq!(view.background, None);
        assert_eq!(view.branch, None);
        assert_eq!(view.message_count, 0);
    }

    #[test]
    fn test_session_view_serializes_snake_case_enums() {
        // Arrange
        let session = PlaybackSession::new(
            Uuid::new_v4(),
            track_from_value(json!([{}])),
            Arc::new(NameAliasIndex::default()),
            PlaybackMode::AutoPlay,
        );

        // Act
        let value = serde_json::to_value(session_view(&session)).unwrap();

        // Assert
        assert_eq!(value["mode"], "auto_play");
        assert_eq!(value["state"], "awaiting_input");
        assert_eq!(value["cursor"]["muted"], true);
    }
}
