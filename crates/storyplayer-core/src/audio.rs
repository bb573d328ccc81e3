//! Audio ports.
//!
//! `AudioPort` is what the timeline talks to: play, stop or fade a channel.
//! `AudioBackend` is the audio-graph primitive layer beneath a channel
//! manager: decoding, gain controls and single-use playback nodes.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::asset::AssetKind;
use crate::error::PlaybackError;

/// One of the three independent audio lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Looping background music.
    Music,
    /// One-shot sound effects.
    SoundEffect,
    /// One-shot voice lines.
    Voice,
}

impl Channel {
    /// All channels, in a fixed order.
    pub const ALL: [Self; 3] = [Self::Music, Self::SoundEffect, Self::Voice];

    /// Returns the asset kind played on this channel.
    #[must_use]
    pub fn asset_kind(self) -> AssetKind {
        match self {
            Self::Music => AssetKind::Music,
            Self::SoundEffect => AssetKind::SoundEffect,
            Self::Voice => AssetKind::Voice,
        }
    }

    /// Returns `true` if sounds on this channel loop.
    #[must_use]
    pub fn loops(self) -> bool {
        self == Self::Music
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Music => "music",
            Self::SoundEffect => "sound_effect",
            Self::Voice => "voice",
        })
    }
}

/// Channel-level audio port used by the timeline.
#[async_trait]
pub trait AudioPort: Send + Sync {
    /// Plays asset `id` on `channel`, replacing whatever the channel plays.
    async fn play(&self, channel: Channel, id: &str) -> Result<(), PlaybackError>;

    /// Stops the channel.
    async fn stop(&self, channel: Channel) -> Result<(), PlaybackError>;

    /// Fades the music channel out.
    async fn fade_out_music(&self) -> Result<(), PlaybackError>;

    /// Releases every node and gain control. The port is inert afterwards.
    async fn release(&self);
}

/// Handle of a decoded audio buffer owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBuffer {
    /// Backend-assigned buffer handle.
    pub handle: u64,
    /// Playback length in milliseconds.
    pub duration_ms: u64,
}

/// Handle of a gain control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GainId(pub u64);

/// Handle of a single-use playback node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// A linear gain ramp between two points in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRamp {
    /// Gain at `starts_at`.
    pub from: f32,
    /// Gain at and after `ends_at`.
    pub to: f32,
    /// Ramp start.
    pub starts_at: DateTime<Utc>,
    /// Ramp end.
    pub ends_at: DateTime<Utc>,
}

impl GainRamp {
    /// Returns the gain at time `at`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn value_at(&self, at: DateTime<Utc>) -> f32 {
        if at <= self.starts_at {
            return self.from;
        }
        if at >= self.ends_at {
            return self.to;
        }
        let total = (self.ends_at - self.starts_at).num_microseconds().unwrap_or(1) as f64;
        let elapsed = (at - self.starts_at).num_microseconds().unwrap_or(0) as f64;
        let progress = (elapsed / total) as f32;
        self.from + (self.to - self.from) * progress
    }
}

/// Audio-graph primitives beneath a channel manager.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Decodes encoded audio into a playable buffer.
    async fn decode(&self, bytes: &[u8]) -> Result<DecodedBuffer, PlaybackError>;

    /// Creates a gain control for `channel` at the given volume.
    fn create_gain(&self, channel: Channel, volume: f32) -> GainId;

    /// Sets a gain immediately, cancelling any scheduled ramp.
    fn set_gain(&self, gain: GainId, volume: f32);

    /// Schedules a linear ramp on a gain.
    fn ramp_gain(&self, gain: GainId, ramp: &GainRamp);

    /// Creates a node bound to `buffer`, connects it to `gain` and starts it.
    fn start(&self, gain: GainId, buffer: &DecodedBuffer, looped: bool) -> NodeId;

    /// Stops and disconnects a node. Stopping a finished node is harmless.
    fn stop(&self, node: NodeId);

    /// Disconnects and releases a gain control.
    fn release_gain(&self, gain: GainId);
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_gain_ramp_interpolates_linearly() {
        // Arrange
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let ramp = GainRamp {
            from: 0.3,
            to: 0.0,
            starts_at: start,
            ends_at: start + Duration::milliseconds(300),
        };

        // Act
        let before = ramp.value_at(start - Duration::milliseconds(10));
        let middle = ramp.value_at(start + Duration::milliseconds(150));
        let after = ramp.value_at(start + Duration::seconds(1));

        // Assert
        assert!((before - 0.3).abs() < f32::EPSILON);
        assert!((middle - 0.15).abs() < 1e-6);
        assert!(after.abs() < f32::EPSILON);
    }

    #[test]
    fn test_only_music_loops() {
        assert!(Channel::Music.loops());
        assert!(!Channel::SoundEffect.loops());
        assert!(!Channel::Voice.loops());
        assert_eq!(Channel::Voice.asset_kind(), AssetKind::Voice);
    }
}
