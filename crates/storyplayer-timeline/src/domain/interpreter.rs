//! Timeline interpreter: renders records and decides where playback goes.
//!
//! Rendering a record touches the ports in a fixed order: background,
//! overlay effect, music, sound effect, message (with its voice), branch.
//! The interpreter then picks the next position: a label jump, a hold for
//! external input, or the following record.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use storyplayer_core::audio::{AudioPort, Channel};
use storyplayer_core::error::PlaybackError;
use storyplayer_core::loader::FallbackLoader;
use storyplayer_core::presentation::{Message, Presentation};
use storyplayer_core::script::{ControlMode, EffectCue, MusicCue, TextFrameMode};
use tracing::{debug, error, warn};

use super::background::{MessageGeometry, PointerInput, Viewport};
use super::branch::{ChoiceOutcome, open_branch};
use super::session::{MessageRecord, PlaybackMode, PlaybackSession, PlaybackState};

/// Tunables of the turn loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineSettings {
    /// Most label jumps one turn may take before it is cut short.
    pub max_jump_chain: usize,
    /// Pause after a manual turn so transitions can settle.
    pub settle_delay: Duration,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            max_jump_chain: 64,
            settle_delay: Duration::from_millis(1),
        }
    }
}

/// Collaborators the interpreter renders through.
#[derive(Clone)]
pub struct PlaybackPorts {
    pub presentation: Arc<dyn Presentation>,
    pub audio: Arc<dyn AudioPort>,
    pub assets: Arc<FallbackLoader>,
}

impl std::fmt::Debug for PlaybackPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackPorts")
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}

/// Why rendering a record stopped the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hold {
    Pause,
    Branch,
}

/// Where to go after rendering a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Next(usize),
    Jump(usize),
    Hold(Hold),
    End,
}

/// Summary of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    /// Cursor before the turn.
    pub from: usize,
    /// Cursor after the turn.
    pub to: usize,
    /// Records rendered.
    pub rendered: usize,
    /// Label jumps taken.
    pub jumps: usize,
    pub state: PlaybackState,
}

/// Walks a session's track through the ports.
#[derive(Debug)]
pub struct Interpreter<'a> {
    pub(crate) ports: &'a PlaybackPorts,
    pub(crate) settings: &'a TimelineSettings,
}

impl<'a> Interpreter<'a> {
    #[must_use]
    pub fn new(ports: &'a PlaybackPorts, settings: &'a TimelineSettings) -> Self {
        Self { ports, settings }
    }

    /// Renders the record at `from` and returns the next position.
    ///
    /// Returns `from` unchanged when the record holds for input or when
    /// `from` is at or past the last record.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Destroyed` if the session was destroyed.
    pub async fn advance(
        &self,
        session: &mut PlaybackSession,
        from: usize,
    ) -> Result<usize, PlaybackError> {
        session.ensure_live()?;
        Ok(match self.step(session, from).await {
            Step::Next(next) | Step::Jump(next) => next,
            Step::Hold(_) | Step::End => from,
        })
    }

    /// Plays from the cursor until a hold, the end of the track or the jump
    /// guard.
    ///
    /// Manual sessions stop at pauses and branches. Auto-play sessions run
    /// through pauses and stop only at branches and the end. A session that
    /// awaits a branch choice or has ended is left as is.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Destroyed` if the session was destroyed.
    pub async fn play_turn(
        &self,
        session: &mut PlaybackSession,
    ) -> Result<TurnReport, PlaybackError> {
        session.ensure_live()?;

        let from = session.cursor.index;
        let mut report = TurnReport {
            from,
            to: from,
            rendered: 0,
            jumps: 0,
            state: session.state,
        };
        if matches!(
            session.state,
            PlaybackState::AwaitingBranch | PlaybackState::End
        ) {
            debug!(session_id = %session.id, state = ?session.state, "turn skipped");
            return Ok(report);
        }

        session.state = PlaybackState::Running;
        let mut index = from;
        let (cursor, state) = loop {
            let step = self.step(session, index).await;
            if step != Step::End {
                report.rendered += 1;
            }
            match step {
                Step::Next(next) => index = next,
                Step::Jump(target) => {
                    report.jumps += 1;
                    if report.jumps > self.settings.max_jump_chain {
                        warn!(
                            session_id = %session.id,
                            at = index,
                            target,
                            limit = self.settings.max_jump_chain,
                            "jump chain limit reached, halting turn"
                        );
                        break (target, PlaybackState::AwaitingInput);
                    }
                    index = target;
                }
                Step::Hold(Hold::Pause) if session.mode == PlaybackMode::AutoPlay => {
                    index += 1;
                }
                Step::Hold(Hold::Pause) => break (index + 1, PlaybackState::AwaitingInput),
                Step::Hold(Hold::Branch) => break (index, PlaybackState::AwaitingBranch),
                Step::End => break (index, PlaybackState::End),
            }
        };

        session.cursor.index = cursor;
        session.state = state;
        report.to = cursor;
        report.state = state;
        Ok(report)
    }

    /// Resolves the pending branch with option `option` and moves the cursor
    /// to its target. Auto-play sessions continue playing from there.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Validation` if no branch is pending or the
    /// option is out of range, and `PlaybackError::Destroyed` after destroy.
    pub async fn choose(
        &self,
        session: &mut PlaybackSession,
        option: usize,
    ) -> Result<ChoiceOutcome, PlaybackError> {
        session.ensure_live()?;

        let track = Arc::clone(&session.track);
        let Some(branch) = session.branch.as_mut() else {
            return Err(PlaybackError::Validation(
                "no branch is awaiting a choice".into(),
            ));
        };
        let start_index = branch.start_index();
        let outcome = branch.choose(&track, option)?;

        let ChoiceOutcome::Resolved {
            chosen,
            target,
            fell_back,
        } = outcome
        else {
            debug!(session_id = %session.id, start_index, "branch already resolved");
            return Ok(outcome);
        };

        if fell_back {
            warn!(
                session_id = %session.id,
                start_index,
                chosen,
                "option label not found, presenting the branch again"
            );
        }
        self.ports.presentation.branch_resolved(start_index, chosen);
        session.messages.truncate(session.branch_mark);
        session.cursor.index = target;
        session.state = PlaybackState::Running;

        if session.mode == PlaybackMode::AutoPlay {
            self.play_turn(session).await?;
        } else {
            session.state = PlaybackState::AwaitingInput;
        }
        Ok(outcome)
    }

    /// Feeds pointer and scroll input to the background synchronizer and
    /// runs its pending frame. Returns the background cross-faded to, if any.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Destroyed` if the session was destroyed.
    pub async fn sync_background(
        &self,
        session: &mut PlaybackSession,
        inputs: &[PointerInput],
        viewport: Viewport,
        layout: &[MessageGeometry],
    ) -> Result<Option<String>, PlaybackError> {
        session.ensure_live()?;

        for input in inputs {
            session.sync.observe(*input);
        }
        if !session.sync.is_pending() {
            return Ok(None);
        }

        let target = session
            .sync
            .nearest(viewport, layout)
            .and_then(|geometry| session.messages.get(geometry.ordinal))
            .and_then(|record| record.background.clone());

        let mut changed = None;
        if let Some(background) = target {
            if session.fader.current() != Some(background.as_str()) {
                session
                    .fader
                    .change(
                        &background,
                        &self.ports.assets,
                        self.ports.presentation.as_ref(),
                    )
                    .await;
                session.effective.background = Some(background.clone());
                changed = Some(background);
            }
        }
        session.sync.complete_frame();
        Ok(changed)
    }

    /// Tears the session down: detaches input, releases background layers
    /// and audio. Destroying twice is a no-op.
    pub async fn destroy(&self, session: &mut PlaybackSession) {
        if session.destroyed {
            return;
        }
        session.destroyed = true;
        session.sync.detach();
        session.fader.clear();
        session.branch = None;
        session.state = PlaybackState::End;
        self.ports.audio.release().await;
        self.ports.presentation.reset();
    }

    /// Renders `index` unless it is the terminal position.
    pub(crate) async fn step(&self, session: &mut PlaybackSession, index: usize) -> Step {
        if index >= session.track.last_index() {
            return Step::End;
        }
        self.render_at(session, index).await
    }

    /// Applies every side effect of the record at `index` and decides where
    /// playback goes next.
    pub(crate) async fn render_at(&self, session: &mut PlaybackSession, index: usize) -> Step {
        let track = Arc::clone(&session.track);
        let Some(event) = track.get(index) else {
            return Step::End;
        };
        let muted = session.cursor.muted;

        if let Some(background) = &event.background {
            session
                .fader
                .change(
                    background,
                    &self.ports.assets,
                    self.ports.presentation.as_ref(),
                )
                .await;
        }
        session.effective.fold(event);

        if let Some(effect) = event.screen_effect() {
            self.ports.presentation.apply_effect(&effect);
        }

        if !muted {
            match &event.music {
                Some(MusicCue::Play(id)) => {
                    report_audio(Channel::Music, self.ports.audio.play(Channel::Music, id).await);
                }
                Some(MusicCue::FadeOut) => {
                    report_audio(Channel::Music, self.ports.audio.fade_out_music().await);
                }
                None => {}
            }

            if !event.has_pause() {
                match &event.sound_effect {
                    Some(EffectCue::Play(id)) => report_audio(
                        Channel::SoundEffect,
                        self.ports.audio.play(Channel::SoundEffect, id).await,
                    ),
                    Some(EffectCue::Stop) => report_audio(
                        Channel::SoundEffect,
                        self.ports.audio.stop(Channel::SoundEffect).await,
                    ),
                    None => {}
                }
            }
        }

        if event.is_message() {
            let message = Message {
                event_index: index,
                ordinal: session.messages.len(),
                frame: event.text_frame.unwrap_or(TextFrameMode::Sub),
                speaker: event.speaker.clone(),
                text: event.text.clone().unwrap_or_default(),
                icon: session.names.icon_for(event.speaker.as_deref()),
                background: session.effective.background.clone(),
                voice: event.voice.clone(),
            };
            self.ports.presentation.append_message(&message);
            session.messages.push(MessageRecord {
                event_index: index,
                background: message.background,
            });

            if !muted {
                let result = match &event.voice {
                    Some(voice) => self.ports.audio.play(Channel::Voice, voice).await,
                    None => self.ports.audio.stop(Channel::Voice).await,
                };
                report_audio(Channel::Voice, result);
            }
        }

        if event.opens_branch() {
            let branch = open_branch(&track, index);
            self.ports.presentation.show_branch(&branch.prompt());
            session.branch_mark = session.messages.len();
            session.branch = Some(branch);
        }

        if let Some(label) = event.jump_target() {
            match track.find_label(label) {
                Some(target) => return Step::Jump(target),
                None => warn!(
                    session_id = %session.id,
                    index,
                    label,
                    "jump label not found, continuing sequentially"
                ),
            }
        }

        match event.control {
            ControlMode::Pause => Step::Hold(Hold::Pause),
            ControlMode::BranchOpen => Step::Hold(Hold::Branch),
            ControlMode::None | ControlMode::BranchClose => Step::Next(index + 1),
        }
    }
}

fn report_audio(channel: Channel, result: Result<(), PlaybackError>) {
    if let Err(e) = result {
        error!(%channel, error = %e, "audio cue skipped");
    }
}
