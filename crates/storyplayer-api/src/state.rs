//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use storyplayer_core::clock::Clock;
use storyplayer_core::error::PlaybackError;
use storyplayer_core::intent::IntentLog;
use storyplayer_core::loader::FallbackLoader;
use storyplayer_core::names::NameAliasIndex;
use storyplayer_timeline::domain::interpreter::{PlaybackPorts, TimelineSettings};
use storyplayer_timeline::domain::session::PlaybackSession;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

/// How long a session may go without a command before it is evicted.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// A live session with the log its intents are recorded in.
#[derive(Debug)]
pub struct SessionSlot {
    pub session: PlaybackSession,
    /// Presentation and audio intents not yet delivered to the client.
    pub log: Arc<IntentLog>,
    pub ports: PlaybackPorts,
    /// When a command last ran against the session.
    pub touched_at: DateTime<Utc>,
}

/// In-memory registry of playback sessions. Each session sits behind its own
/// mutex so commands against it run one at a time.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    slots: Arc<RwLock<HashMap<Uuid, Arc<Mutex<SessionSlot>>>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `slot` under its session id.
    pub async fn insert(&self, slot: SessionSlot) -> Uuid {
        let id = slot.session.id();
        self.slots
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(slot)));
        id
    }

    /// Looks a session up.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::SessionNotFound` if no session has that id.
    pub async fn get(&self, id: Uuid) -> Result<Arc<Mutex<SessionSlot>>, PlaybackError> {
        self.slots
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(PlaybackError::SessionNotFound(id))
    }

    /// Removes every session last touched before `cutoff` and returns their
    /// ids. A session whose lock is held by a running command is kept.
    pub async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Vec<Uuid> {
        let mut slots = self.slots.write().await;
        let stale: Vec<Uuid> = slots
            .iter()
            .filter(|(_, slot)| slot.try_lock().is_ok_and(|slot| slot.touched_at < cutoff))
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            slots.remove(id);
        }
        stale
    }

    /// Drops a session from the registry.
    pub async fn remove(&self, id: Uuid) -> Option<Arc<Mutex<SessionSlot>>> {
        self.slots.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub clock: Arc<dyn Clock>,
    /// Local-then-remote asset sources.
    pub assets: Arc<FallbackLoader>,
    /// Speaker alias list, loaded once at startup.
    pub names: Arc<NameAliasIndex>,
    pub settings: TimelineSettings,
    pub sessions: SessionRegistry,
    /// Sessions idle for longer are evicted when a new one starts.
    pub session_idle: Duration,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        assets: Arc<FallbackLoader>,
        names: Arc<NameAliasIndex>,
        settings: TimelineSettings,
    ) -> Self {
        Self {
            clock,
            assets,
            names,
            settings,
            sessions: SessionRegistry::new(),
            session_idle: DEFAULT_SESSION_IDLE,
        }
    }

    #[must_use]
    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.session_idle = idle;
        self
    }

    /// Evicts sessions that have been idle for longer than `session_idle`.
    /// Returns how many were removed.
    pub async fn evict_idle_sessions(&self) -> usize {
        let Some(cutoff) = TimeDelta::from_std(self.session_idle)
            .ok()
            .and_then(|idle| self.clock.now().checked_sub_signed(idle))
        else {
            return 0;
        };
        let evicted = self.sessions.evict_idle(cutoff).await;
        if !evicted.is_empty() {
            info!(count = evicted.len(), "idle sessions evicted");
        }
        evicted.len()
    }

    /// Ports for a new session: `log` records both presentation and audio
    /// intents for the client to replay.
    #[must_use]
    pub fn ports_for(&self, log: &Arc<IntentLog>) -> PlaybackPorts {
        PlaybackPorts {
            presentation: log.clone(),
            audio: log.clone(),
            assets: self.assets.clone(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("assets", &self.assets)
            .field("aliases", &self.names.len())
            .field("settings", &self.settings)
            .field("session_idle", &self.session_idle)
            .finish_non_exhaustive()
    }
}
