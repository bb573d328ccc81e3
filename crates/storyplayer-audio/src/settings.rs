//! Channel volumes and fade timing.

use std::time::Duration;

use serde::Deserialize;
use storyplayer_core::audio::Channel;

/// Audio settings, readable from the `audio` section of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub music_volume: f32,
    pub sound_effect_volume: f32,
    pub voice_volume: f32,
    /// Length of the music fade-out, in milliseconds.
    pub fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            music_volume: 0.3,
            sound_effect_volume: 0.4,
            voice_volume: 0.4,
            fade_out_ms: 330,
        }
    }
}

impl AudioSettings {
    /// Configured volume of `channel`, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn volume(&self, channel: Channel) -> f32 {
        let volume = match channel {
            Channel::Music => self.music_volume,
            Channel::SoundEffect => self.sound_effect_volume,
            Channel::Voice => self.voice_volume,
        };
        volume.clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }
}
