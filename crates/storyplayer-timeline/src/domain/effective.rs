//! Effective presentation state derived from the records played so far.

use serde::Serialize;
use storyplayer_core::script::{MusicCue, ScreenEffect, ScriptEvent};
use storyplayer_core::track::Track;

/// Background, music and overlay state that playback has reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EffectiveState {
    /// Current background identifier.
    pub background: Option<String>,
    /// Loop track in effect, `None` when silent or faded out.
    pub music: Option<String>,
    /// Lingering overlay effect.
    pub overlay: Option<ScreenEffect>,
}

impl EffectiveState {
    /// Applies one record's state changes.
    pub fn fold(&mut self, event: &ScriptEvent) {
        if let Some(background) = &event.background {
            self.background = Some(background.clone());
        }
        match &event.music {
            Some(MusicCue::Play(id)) => self.music = Some(id.clone()),
            Some(MusicCue::FadeOut) => self.music = None,
            None => {}
        }
        if let Some(effect) = event.screen_effect() {
            self.overlay = Some(effect);
        }
    }

    /// Folds records `0..position` of `projection` in order, ignoring jumps.
    #[must_use]
    pub fn replay(projection: &Track, position: usize) -> Self {
        let end = position.min(projection.len());
        let mut state = Self::default();
        for event in &projection.events()[..end] {
            state.fold(event);
        }
        state
    }
}
