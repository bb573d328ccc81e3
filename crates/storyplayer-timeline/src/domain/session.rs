//! Playback session: explicit state of one reader walking one track.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyplayer_core::error::PlaybackError;
use storyplayer_core::names::NameAliasIndex;
use storyplayer_core::track::Track;
use uuid::Uuid;

use super::background::{BackgroundSync, CrossFader};
use super::branch::BranchState;
use super::effective::EffectiveState;

/// How a session advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Continuous, muted reading of the whole script.
    AutoPlay,
    /// One turn per input, with audio.
    Manual,
}

impl PlaybackMode {
    /// Manual unless auto-play was explicitly requested.
    #[must_use]
    pub fn from_flag(auto_play: Option<bool>) -> Self {
        if auto_play == Some(true) {
            Self::AutoPlay
        } else {
            Self::Manual
        }
    }

    /// Auto-play sessions never issue audio.
    #[must_use]
    pub fn is_muted(self) -> bool {
        self == Self::AutoPlay
    }
}

/// Where a session stands between turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// A turn is in progress.
    Running,
    /// Halted until the next advance.
    AwaitingInput,
    /// Halted on a branch until a choice is made.
    AwaitingBranch,
    /// The final record has been reached.
    End,
}

/// Next position to play and whether audio is suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursor {
    pub index: usize,
    pub muted: bool,
}

/// What the session remembers about each presented message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// Position of the record that produced it.
    pub event_index: usize,
    /// Background current when it was presented.
    pub background: Option<String>,
}

/// One reader's playback of one track.
#[derive(Debug)]
pub struct PlaybackSession {
    pub(crate) id: Uuid,
    pub(crate) track: Arc<Track>,
    pub(crate) stripped: Arc<Track>,
    pub(crate) names: Arc<NameAliasIndex>,
    pub(crate) mode: PlaybackMode,
    pub(crate) cursor: Cursor,
    pub(crate) state: PlaybackState,
    pub(crate) branch: Option<BranchState>,
    pub(crate) branch_mark: usize,
    pub(crate) effective: EffectiveState,
    pub(crate) fader: CrossFader,
    pub(crate) sync: BackgroundSync,
    pub(crate) messages: Vec<MessageRecord>,
    pub(crate) destroyed: bool,
    pub(crate) started_at: Option<DateTime<Utc>>,
}

impl PlaybackSession {
    /// Creates a session at position 0, waiting for its first turn.
    #[must_use]
    pub fn new(id: Uuid, track: Track, names: Arc<NameAliasIndex>, mode: PlaybackMode) -> Self {
        let stripped = Arc::new(track.stripped());
        Self {
            id,
            track: Arc::new(track),
            stripped,
            names,
            mode,
            cursor: Cursor {
                index: 0,
                muted: mode.is_muted(),
            },
            state: PlaybackState::AwaitingInput,
            branch: None,
            branch_mark: 0,
            effective: EffectiveState::default(),
            fader: CrossFader::default(),
            sync: BackgroundSync::new(mode == PlaybackMode::AutoPlay),
            messages: Vec::new(),
            destroyed: false,
            started_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// The open or most recently resolved branch, cleared by a seek.
    #[must_use]
    pub fn branch(&self) -> Option<&BranchState> {
        self.branch.as_ref()
    }

    #[must_use]
    pub fn effective(&self) -> &EffectiveState {
        &self.effective
    }

    /// Background on screen, which sync may have moved away from the one
    /// playback last set.
    #[must_use]
    pub fn current_background(&self) -> Option<&str> {
        self.fader.current()
    }

    #[must_use]
    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    /// When the session was opened, if it was opened through a handler.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Fails with `PlaybackError::Destroyed` once the session was torn down.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Destroyed` after `destroy`.
    pub fn ensure_live(&self) -> Result<(), PlaybackError> {
        if self.destroyed {
            Err(PlaybackError::Destroyed)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use storyplayer_test_support::track_from_value;

    use super::*;

    #[test]
    fn test_mode_defaults_to_manual() {
        assert_eq!(PlaybackMode::from_flag(None), PlaybackMode::Manual);
        assert_eq!(PlaybackMode::from_flag(Some(false)), PlaybackMode::Manual);
        assert_eq!(PlaybackMode::from_flag(Some(true)), PlaybackMode::AutoPlay);
    }

    #[test]
    fn test_new_session_starts_at_zero() {
        // Arrange
        let track = track_from_value(json!([{"bg": "A"}, {}]));

        // Act
        let session = PlaybackSession::new(
            Uuid::new_v4(),
            track,
            Arc::new(NameAliasIndex::default()),
            PlaybackMode::AutoPlay,
        );

        // Assert
        assert_eq!(session.cursor(), Cursor { index: 0, muted: true });
        assert_eq!(session.state(), PlaybackState::AwaitingInput);
        assert!(session.sync.is_attached());
        assert!(session.current_background().is_none());
        assert!(session.ensure_live().is_ok());
    }

    #[test]
    fn test_manual_session_is_unmuted_and_detached() {
        let session = PlaybackSession::new(
            Uuid::new_v4(),
            Track::default(),
            Arc::new(NameAliasIndex::default()),
            PlaybackMode::Manual,
        );

        assert!(!session.cursor().muted);
        assert!(!session.sync.is_attached());
    }
}
