//! Per-channel state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use storyplayer_core::audio::{AudioBackend, Channel, DecodedBuffer, GainId, GainRamp, NodeId};

/// One audio line: a gain control, its decoded buffers and the live node.
#[derive(Debug)]
pub struct ChannelState {
    pub(crate) gain: GainId,
    pub(crate) volume: f32,
    pub(crate) cache: HashMap<String, DecodedBuffer>,
    pub(crate) live: Option<NodeId>,
    /// Ramp scheduled on the gain since the volume was last set.
    pub(crate) ramp: Option<GainRamp>,
}

impl ChannelState {
    pub(crate) fn new(backend: &dyn AudioBackend, channel: Channel, volume: f32) -> Self {
        Self {
            gain: backend.create_gain(channel, volume),
            volume,
            cache: HashMap::new(),
            live: None,
            ramp: None,
        }
    }

    /// Stops and forgets the live node, if any.
    pub(crate) fn stop_live(&mut self, backend: &dyn AudioBackend) {
        if let Some(node) = self.live.take() {
            backend.stop(node);
        }
    }

    /// Replaces the live node with a fresh one playing `buffer` at the
    /// channel volume.
    pub(crate) fn start(&mut self, backend: &dyn AudioBackend, buffer: &DecodedBuffer, looped: bool) {
        self.set_gain(backend, self.volume);
        self.stop_live(backend);
        self.live = Some(backend.start(self.gain, buffer, looped));
    }

    /// Sets the gain outright, cancelling any ramp.
    pub(crate) fn set_gain(&mut self, backend: &dyn AudioBackend, volume: f32) {
        self.ramp = None;
        backend.set_gain(self.gain, volume);
    }

    /// Schedules `ramp` on the gain.
    pub(crate) fn ramp_gain(&mut self, backend: &dyn AudioBackend, ramp: GainRamp) {
        backend.ramp_gain(self.gain, &ramp);
        self.ramp = Some(ramp);
    }

    /// Gain at time `at`, following a scheduled ramp.
    #[must_use]
    pub fn gain_at(&self, at: DateTime<Utc>) -> f32 {
        self.ramp.map_or(self.volume, |ramp| ramp.value_at(at))
    }

    #[must_use]
    pub fn live_node(&self) -> Option<NodeId> {
        self.live
    }

    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// The three channels.
#[derive(Debug)]
pub(crate) struct Channels {
    music: ChannelState,
    sound_effect: ChannelState,
    voice: ChannelState,
}

impl Channels {
    pub(crate) fn new(backend: &dyn AudioBackend, volume: impl Fn(Channel) -> f32) -> Self {
        Self {
            music: ChannelState::new(backend, Channel::Music, volume(Channel::Music)),
            sound_effect: ChannelState::new(
                backend,
                Channel::SoundEffect,
                volume(Channel::SoundEffect),
            ),
            voice: ChannelState::new(backend, Channel::Voice, volume(Channel::Voice)),
        }
    }

    pub(crate) fn get(&self, channel: Channel) -> &ChannelState {
        match channel {
            Channel::Music => &self.music,
            Channel::SoundEffect => &self.sound_effect,
            Channel::Voice => &self.voice,
        }
    }

    pub(crate) fn get_mut(&mut self, channel: Channel) -> &mut ChannelState {
        match channel {
            Channel::Music => &mut self.music,
            Channel::SoundEffect => &mut self.sound_effect,
            Channel::Voice => &mut self.voice,
        }
    }
}
