//! Test audio doubles: a recording `AudioBackend` and a failing `AudioPort`.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use storyplayer_core::audio::{
    AudioBackend, AudioPort, Channel, DecodedBuffer, GainId, GainRamp, NodeId,
};
use storyplayer_core::error::PlaybackError;

/// One call made against a `RecordingAudioBackend`.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `decode` with the length of the encoded input.
    Decode(usize),
    /// `create_gain`.
    CreateGain {
        /// Channel the gain belongs to.
        channel: Channel,
        /// Assigned handle.
        gain: GainId,
        /// Initial volume.
        volume: f32,
    },
    /// `set_gain`.
    SetGain {
        /// Target gain.
        gain: GainId,
        /// New volume.
        volume: f32,
    },
    /// `ramp_gain`.
    RampGain {
        /// Target gain.
        gain: GainId,
        /// Scheduled ramp.
        ramp: GainRamp,
    },
    /// `start`.
    Start {
        /// Gain the node is connected to.
        gain: GainId,
        /// Assigned node handle.
        node: NodeId,
        /// Buffer handle bound to the node.
        buffer: u64,
        /// Whether the node loops.
        looped: bool,
    },
    /// `stop`.
    Stop(NodeId),
    /// `release_gain`.
    ReleaseGain(GainId),
}

/// An audio backend that records every call and hands out sequential
/// handles. Decoding can be configured to fail.
#[derive(Debug, Default)]
pub struct RecordingAudioBackend {
    calls: Mutex<Vec<BackendCall>>,
    next_handle: AtomicU64,
    fail_decode: bool,
}

impl RecordingAudioBackend {
    /// Creates a backend whose decoding always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend whose decoding always fails.
    #[must_use]
    pub fn failing_decode() -> Self {
        Self {
            fail_decode: true,
            ..Self::default()
        }
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Returns a snapshot of every recorded call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the nodes started on `gain` that have not been stopped.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn live_nodes(&self, gain: GainId) -> Vec<NodeId> {
        let calls = self.calls.lock().unwrap();
        let stopped: HashSet<NodeId> = calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Stop(node) => Some(*node),
                _ => None,
            })
            .collect();
        calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Start { gain: g, node, .. } if *g == gain && !stopped.contains(node) => {
                    Some(*node)
                }
                _ => None,
            })
            .collect()
    }

    /// Returns the gain created for `channel`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn gain_of(&self, channel: Channel) -> Option<GainId> {
        self.calls.lock().unwrap().iter().find_map(|call| match call {
            BackendCall::CreateGain { channel: c, gain, .. } if *c == channel => Some(*gain),
            _ => None,
        })
    }

    /// Returns how many times `decode` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn decode_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, BackendCall::Decode(_)))
            .count()
    }
}

#[async_trait]
impl AudioBackend for RecordingAudioBackend {
    async fn decode(&self, bytes: &[u8]) -> Result<DecodedBuffer, PlaybackError> {
        self.record(BackendCall::Decode(bytes.len()));
        if self.fail_decode {
            return Err(PlaybackError::Decode("unsupported codec".into()));
        }
        Ok(DecodedBuffer {
            handle: self.next(),
            duration_ms: 1_000,
        })
    }

    fn create_gain(&self, channel: Channel, volume: f32) -> GainId {
        let gain = GainId(self.next());
        self.record(BackendCall::CreateGain {
            channel,
            gain,
            volume,
        });
        gain
    }

    fn set_gain(&self, gain: GainId, volume: f32) {
        self.record(BackendCall::SetGain { gain, volume });
    }

    fn ramp_gain(&self, gain: GainId, ramp: &GainRamp) {
        self.record(BackendCall::RampGain { gain, ramp: *ramp });
    }

    fn start(&self, gain: GainId, buffer: &DecodedBuffer, looped: bool) -> NodeId {
        let node = NodeId(self.next());
        self.record(BackendCall::Start {
            gain,
            node,
            buffer: buffer.handle,
            looped,
        });
        node
    }

    fn stop(&self, node: NodeId) {
        self.record(BackendCall::Stop(node));
    }

    fn release_gain(&self, gain: GainId) {
        self.record(BackendCall::ReleaseGain(gain));
    }
}

/// An audio port whose playback calls always fail. Useful for checking that
/// a failing cue is skipped without halting playback.
#[derive(Debug)]
pub struct FailingAudioPort;

#[async_trait]
impl AudioPort for FailingAudioPort {
    async fn play(&self, _channel: Channel, id: &str) -> Result<(), PlaybackError> {
        Err(PlaybackError::AssetUnavailable {
            path: id.to_owned(),
            reason: "connection refused".into(),
        })
    }

    async fn stop(&self, _channel: Channel) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn fade_out_music(&self) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn release(&self) {}
}
