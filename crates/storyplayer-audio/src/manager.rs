//! The audio channel manager.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use storyplayer_core::audio::{AudioBackend, AudioPort, Channel, DecodedBuffer, GainRamp};
use storyplayer_core::clock::Clock;
use storyplayer_core::error::PlaybackError;
use storyplayer_core::loader::FallbackLoader;
use storyplayer_core::script::{EffectCue, MusicCue};
use storyplayer_core::track::Track;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::channel::Channels;
use crate::settings::AudioSettings;

/// Plays music, sound effects and voices through an `AudioBackend`.
///
/// Starting a sound on a channel always stops that channel's previous node
/// first, so a channel never has two live nodes.
pub struct AudioChannelManager {
    backend: Arc<dyn AudioBackend>,
    assets: Arc<FallbackLoader>,
    clock: Arc<dyn Clock>,
    settings: AudioSettings,
    channels: Mutex<Channels>,
    destroyed: AtomicBool,
}

impl std::fmt::Debug for AudioChannelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioChannelManager")
            .field("settings", &self.settings)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl AudioChannelManager {
    /// Creates the manager and one gain control per channel.
    #[must_use]
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        assets: Arc<FallbackLoader>,
        clock: Arc<dyn Clock>,
        settings: AudioSettings,
    ) -> Self {
        let channels = Channels::new(backend.as_ref(), |channel| settings.volume(channel));
        Self {
            backend,
            assets,
            clock,
            settings,
            channels: Mutex::new(channels),
            destroyed: AtomicBool::new(false),
        }
    }

    fn ensure_live(&self) -> Result<(), PlaybackError> {
        if self.destroyed.load(Ordering::Acquire) {
            Err(PlaybackError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Returns the decoded buffer for `id`, loading and decoding it on a
    /// cache miss.
    async fn buffer(&self, channel: Channel, id: &str) -> Result<DecodedBuffer, PlaybackError> {
        if let Some(buffer) = self.channels.lock().await.get(channel).cache.get(id) {
            return Ok(buffer.clone());
        }

        let asset = self.assets.load(&channel.asset_kind(), id).await?;
        let buffer = self.backend.decode(&asset.bytes).await?;
        debug!(%channel, id, location = %asset.location, "audio decoded");

        let mut channels = self.channels.lock().await;
        Ok(channels
            .get_mut(channel)
            .cache
            .entry(id.to_owned())
            .or_insert(buffer)
            .clone())
    }

    /// Decodes `ids` into the channel cache ahead of playback. Failures are
    /// logged and skipped. Returns how many ids are cached afterwards.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Destroyed` after `release`.
    pub async fn preload<I, S>(&self, channel: Channel, ids: I) -> Result<usize, PlaybackError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_live()?;
        let mut ready = 0;
        for id in ids {
            match self.buffer(channel, id.as_ref()).await {
                Ok(_) => ready += 1,
                Err(e) => warn!(%channel, id = id.as_ref(), error = %e, "preload skipped"),
            }
        }
        Ok(ready)
    }

    /// Preloads every distinct sound a track refers to.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Destroyed` after `release`.
    pub async fn preload_track(&self, track: &Track) -> Result<usize, PlaybackError> {
        let mut music = BTreeSet::new();
        let mut effects = BTreeSet::new();
        let mut voices = BTreeSet::new();
        for event in track.events() {
            if let Some(MusicCue::Play(id)) = &event.music {
                music.insert(id.as_str());
            }
            if let Some(EffectCue::Play(id)) = &event.sound_effect {
                effects.insert(id.as_str());
            }
            if let Some(voice) = &event.voice {
                voices.insert(voice.as_str());
            }
        }

        let ready = self.preload(Channel::Music, music).await?
            + self.preload(Channel::SoundEffect, effects).await?
            + self.preload(Channel::Voice, voices).await?;
        info!(ready, "track audio preloaded");
        Ok(ready)
    }

    /// Sets the volume of `channel`, clamped to `0.0..=1.0`.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Destroyed` after `release`.
    pub async fn set_volume(&self, channel: Channel, volume: f32) -> Result<(), PlaybackError> {
        self.ensure_live()?;
        let volume = volume.clamp(0.0, 1.0);
        let mut channels = self.channels.lock().await;
        let state = channels.get_mut(channel);
        state.volume = volume;
        state.set_gain(self.backend.as_ref(), volume);
        Ok(())
    }

    /// Current volume of `channel`.
    pub async fn volume(&self, channel: Channel) -> f32 {
        self.channels.lock().await.get(channel).volume
    }

    /// Gain `channel` is at right now, partway through a fade if one runs.
    pub async fn current_gain(&self, channel: Channel) -> f32 {
        self.channels
            .lock()
            .await
            .get(channel)
            .gain_at(self.clock.now())
    }

    /// Whether `channel` has a live node.
    pub async fn is_playing(&self, channel: Channel) -> bool {
        self.channels.lock().await.get(channel).live_node().is_some()
    }
}

#[async_trait]
impl AudioPort for AudioChannelManager {
    async fn play(&self, channel: Channel, id: &str) -> Result<(), PlaybackError> {
        self.ensure_live()?;
        let buffer = self.buffer(channel, id).await?;

        // release may have run while the buffer was loading
        self.ensure_live()?;
        let mut channels = self.channels.lock().await;
        channels
            .get_mut(channel)
            .start(self.backend.as_ref(), &buffer, channel.loops());
        debug!(%channel, id, "playing");
        Ok(())
    }

    async fn stop(&self, channel: Channel) -> Result<(), PlaybackError> {
        self.ensure_live()?;
        self.channels
            .lock()
            .await
            .get_mut(channel)
            .stop_live(self.backend.as_ref());
        Ok(())
    }

    async fn fade_out_music(&self) -> Result<(), PlaybackError> {
        self.ensure_live()?;
        let mut channels = self.channels.lock().await;
        let music = channels.get_mut(Channel::Music);

        // a fade already under way continues from where it has got to
        let (starts_at, ends_at) = self.clock.window(self.settings.fade_out());
        let ramp = GainRamp {
            from: music.gain_at(starts_at),
            to: 0.0,
            starts_at,
            ends_at,
        };
        music.ramp_gain(self.backend.as_ref(), ramp);
        debug!(fade_ms = self.settings.fade_out_ms, "music fading out");
        Ok(())
    }

    async fn release(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut channels = self.channels.lock().await;
        for channel in Channel::ALL {
            let state = channels.get_mut(channel);
            state.stop_live(self.backend.as_ref());
            self.backend.release_gain(state.gain);
            state.cache.clear();
        }
        info!("audio channels released");
    }
}
