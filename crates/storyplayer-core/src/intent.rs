//! Recorded intents.
//!
//! `IntentLog` implements both ports by recording what was asked of them.
//! A remote front end replays the drained intents; tests inspect them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::audio::{AudioPort, Channel};
use crate::error::PlaybackError;
use crate::presentation::{BranchPrompt, CrossFade, Message, Presentation};
use crate::script::ScreenEffect;

/// A single presentation or audio intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Cross-fade to a new background.
    CrossFade(CrossFade),
    /// Append a message.
    AppendMessage(Message),
    /// Show a branch set.
    ShowBranch(BranchPrompt),
    /// Mark a branch option as chosen.
    BranchResolved {
        /// Position of the record that opened the branch.
        start_index: usize,
        /// Chosen option.
        chosen: usize,
    },
    /// Apply an overlay effect.
    ApplyEffect(ScreenEffect),
    /// Clear all overlay effects.
    ClearEffects,
    /// Empty both background layers.
    ClearBackground,
    /// Release the view.
    Reset,
    /// Play a sound on a channel.
    Play {
        /// Target channel.
        channel: Channel,
        /// Asset identifier.
        id: String,
    },
    /// Stop a channel.
    Stop {
        /// Target channel.
        channel: Channel,
    },
    /// Fade the music out.
    FadeOutMusic,
    /// Release all audio resources.
    ReleaseAudio,
}

/// In-memory recorder of intents.
#[derive(Debug, Default)]
pub struct IntentLog {
    entries: Mutex<Vec<Intent>>,
    released: AtomicBool,
}

impl IntentLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, intent: Intent) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(intent);
    }

    /// Returns a copy of every recorded intent.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Intent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns every recorded intent.
    #[must_use]
    pub fn drain(&self) -> Vec<Intent> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Presentation for IntentLog {
    fn crossfade(&self, fade: &CrossFade) {
        self.record(Intent::CrossFade(fade.clone()));
    }

    fn append_message(&self, message: &Message) {
        self.record(Intent::AppendMessage(message.clone()));
    }

    fn show_branch(&self, prompt: &BranchPrompt) {
        self.record(Intent::ShowBranch(prompt.clone()));
    }

    fn branch_resolved(&self, start_index: usize, chosen: usize) {
        self.record(Intent::BranchResolved {
            start_index,
            chosen,
        });
    }

    fn apply_effect(&self, effect: &ScreenEffect) {
        self.record(Intent::ApplyEffect(effect.clone()));
    }

    fn clear_effects(&self) {
        self.record(Intent::ClearEffects);
    }

    fn clear_background(&self) {
        self.record(Intent::ClearBackground);
    }

    fn reset(&self) {
        self.record(Intent::Reset);
    }
}

#[async_trait]
impl AudioPort for IntentLog {
    async fn play(&self, channel: Channel, id: &str) -> Result<(), PlaybackError> {
        if self.released.load(Ordering::Acquire) {
            return Err(PlaybackError::Destroyed);
        }
        self.record(Intent::Play {
            channel,
            id: id.to_owned(),
        });
        Ok(())
    }

    async fn stop(&self, channel: Channel) -> Result<(), PlaybackError> {
        if self.released.load(Ordering::Acquire) {
            return Err(PlaybackError::Destroyed);
        }
        self.record(Intent::Stop { channel });
        Ok(())
    }

    async fn fade_out_music(&self) -> Result<(), PlaybackError> {
        if self.released.load(Ordering::Acquire) {
            return Err(PlaybackError::Destroyed);
        }
        self.record(Intent::FadeOutMusic);
        Ok(())
    }

    async fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.record(Intent::ReleaseAudio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_empties_the_log() {
        // Arrange
        let log = IntentLog::new();
        log.clear_effects();
        log.play(Channel::Music, "m1").await.unwrap();

        // Act
        let drained = log.drain();

        // Assert
        assert_eq!(
            drained,
            vec![
                Intent::ClearEffects,
                Intent::Play {
                    channel: Channel::Music,
                    id: "m1".to_owned()
                }
            ]
        );
        assert!(log.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_audio_is_inert_after_release() {
        // Arrange
        let log = IntentLog::new();

        // Act
        log.release().await;
        log.release().await;
        let result = log.play(Channel::Voice, "v1").await;

        // Assert
        assert!(matches!(result, Err(PlaybackError::Destroyed)));
        assert_eq!(log.snapshot(), vec![Intent::ReleaseAudio]);
    }

    #[test]
    fn test_intents_serialize_with_type_tag() {
        let json = serde_json::to_value(Intent::Stop {
            channel: Channel::SoundEffect,
        })
        .unwrap();

        assert_eq!(json["type"], "stop");
        assert_eq!(json["channel"], "sound_effect");
    }
}
