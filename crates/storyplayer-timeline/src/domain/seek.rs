//! Seek: reconstructing playback state at an arbitrary position.
//!
//! Overlays and message history have no inverse, so state at a position is
//! rebuilt by folding the effect-stripped projection from the start and then
//! rendering the target record at full fidelity.

use serde::Serialize;
use storyplayer_core::audio::Channel;
use storyplayer_core::error::PlaybackError;
use tracing::{debug, error, warn};

use super::effective::EffectiveState;
use super::interpreter::{Hold, Interpreter, Step};
use super::session::{PlaybackSession, PlaybackState};

/// Outcome of a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SeekOutcome {
    /// Position outside the track; the session is untouched.
    Rejected { position: usize, length: usize },
    /// Playback state now matches forward playback at `position`.
    Completed {
        position: usize,
        cursor: usize,
        state: PlaybackState,
    },
}

impl Interpreter<'_> {
    /// Moves playback to `position` with the background, music and overlay
    /// state forward playback would have reached there.
    ///
    /// Positions outside `[0, len)` are logged and rejected without touching
    /// the session.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Destroyed` if the session was destroyed.
    pub async fn seek(
        &self,
        session: &mut PlaybackSession,
        position: usize,
    ) -> Result<SeekOutcome, PlaybackError> {
        session.ensure_live()?;

        let length = session.track.len();
        if position >= length {
            warn!(session_id = %session.id, position, length, "seek position out of range");
            return Ok(SeekOutcome::Rejected { position, length });
        }

        self.ports.presentation.clear_effects();
        session.fader.settle();

        let mut derived = EffectiveState::replay(&session.stripped, position);
        derived.music = session.track.music_in_effect(position).map(str::to_owned);
        let previous_music = std::mem::replace(&mut session.effective, derived).music;
        session.branch = None;
        debug!(
            session_id = %session.id,
            position,
            background = ?session.effective.background,
            music = ?session.effective.music,
            "state rebuilt"
        );

        let Some(target) = session.track.get(position).cloned() else {
            return Ok(SeekOutcome::Rejected { position, length });
        };

        if target.background.is_none() {
            match session.effective.background.clone() {
                Some(background) => {
                    session
                        .fader
                        .change(
                            &background,
                            &self.ports.assets,
                            self.ports.presentation.as_ref(),
                        )
                        .await;
                }
                None => {
                    if session.fader.blank(self.ports.presentation.as_ref()) {
                        debug!(session_id = %session.id, position, "background cleared");
                    }
                }
            }
        }

        if !session.cursor.muted
            && target.music.is_none()
            && previous_music != session.effective.music
        {
            let result = match &session.effective.music {
                Some(id) => self.ports.audio.play(Channel::Music, id).await,
                None => self.ports.audio.fade_out_music().await,
            };
            if let Err(e) = result {
                error!(error = %e, "music restore skipped");
            }
        }

        if !session.cursor.muted {
            for channel in [Channel::Voice, Channel::SoundEffect] {
                if let Err(e) = self.ports.audio.stop(channel).await {
                    error!(%channel, error = %e, "channel stop skipped");
                }
            }
        }

        let step = self.render_at(session, position).await;
        let (cursor, state) = if position >= session.track.last_index() {
            (position, PlaybackState::End)
        } else {
            match step {
                Step::Next(next) | Step::Jump(next) => (next, PlaybackState::AwaitingInput),
                Step::Hold(Hold::Pause) => (position + 1, PlaybackState::AwaitingInput),
                Step::Hold(Hold::Branch) => (position, PlaybackState::AwaitingBranch),
                Step::End => (position, PlaybackState::End),
            }
        };
        session.cursor.index = cursor;
        session.state = state;

        Ok(SeekOutcome::Completed {
            position,
            cursor,
            state,
        })
    }
}
