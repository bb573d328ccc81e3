//! Background layers and pointer/scroll driven background sync.

use serde::{Deserialize, Serialize};
use storyplayer_core::asset::AssetKind;
use storyplayer_core::loader::FallbackLoader;
use storyplayer_core::presentation::{CrossFade, Presentation};
use tracing::error;

/// Two background layers toggled on every change.
#[derive(Debug, Clone, Default)]
pub struct CrossFader {
    layers: [Option<String>; 2],
    next_layer: usize,
    current: Option<String>,
}

impl CrossFader {
    /// Background currently shown.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Layer holding the current background, if any is shown.
    #[must_use]
    pub fn active_layer(&self) -> Option<usize> {
        let active = 1 - self.next_layer;
        self.layers[active].as_ref().map(|_| active)
    }

    /// Cross-fades to background `id`. Returns `true` if a fade was issued.
    ///
    /// Changing to the background already shown is a no-op. A background
    /// that neither source can provide is logged and skipped; it still
    /// counts as current so the next record is compared against it.
    pub async fn change(
        &mut self,
        id: &str,
        assets: &FallbackLoader,
        presentation: &dyn Presentation,
    ) -> bool {
        if self.current.as_deref() == Some(id) {
            return false;
        }
        self.current = Some(id.to_owned());

        let located = match assets.locate(&AssetKind::Background, id).await {
            Ok(located) => located,
            Err(e) => {
                error!(background = id, error = %e, "background image unavailable");
                return false;
            }
        };

        let active = self.next_layer;
        let inactive = 1 - active;
        self.layers[active] = Some(id.to_owned());
        presentation.crossfade(&CrossFade {
            background_id: id.to_owned(),
            location: located.location,
            origin: located.origin,
            active_layer: active,
            inactive_layer: inactive,
        });
        self.next_layer = inactive;
        true
    }

    /// Drops the image of the inactive layer so no half-finished fade
    /// lingers.
    pub fn settle(&mut self) {
        self.layers[self.next_layer] = None;
    }

    /// Empties both layers if a background is shown. Returns `true` if
    /// anything was cleared.
    pub fn blank(&mut self, presentation: &dyn Presentation) -> bool {
        if self.current.is_none() && self.layers.iter().all(Option::is_none) {
            return false;
        }
        self.clear();
        presentation.clear_background();
        true
    }

    /// Releases both layers.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// At most one pending background recomputation per display frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameGate {
    pending: bool,
}

impl FrameGate {
    /// Requests a frame. Returns `true` if this call scheduled it.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Marks the pending frame as run.
    pub fn complete(&mut self) {
        self.pending = false;
    }

    #[must_use]
    pub fn is_pending(self) -> bool {
        self.pending
    }
}

/// Visible area of the message container, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub top: f64,
    pub height: f64,
}

/// Vertical extent of one rendered message, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MessageGeometry {
    /// Message ordinal in the session's message list.
    pub ordinal: usize,
    pub top: f64,
    pub height: f64,
}

impl MessageGeometry {
    fn center(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// A pointer or scroll input observed on the message container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerInput {
    /// Pointer moved to `y`, relative to the viewport top.
    Moved { y: f64 },
    /// Pointer left the container.
    Left,
    /// The container scrolled.
    Scrolled,
}

/// Keeps the background matched to the message under the pointer (or the
/// viewport center) while reading in continuous mode.
#[derive(Debug, Clone, Default)]
pub struct BackgroundSync {
    attached: bool,
    pointer_y: Option<f64>,
    gate: FrameGate,
}

impl BackgroundSync {
    /// Creates a synchronizer; only an attached one reacts to input.
    #[must_use]
    pub fn new(attached: bool) -> Self {
        Self {
            attached,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.gate.is_pending()
    }

    /// Records one input. Returns `true` if it scheduled a new frame.
    pub fn observe(&mut self, input: PointerInput) -> bool {
        if !self.attached {
            return false;
        }
        match input {
            PointerInput::Moved { y } => self.pointer_y = Some(y),
            PointerInput::Left => self.pointer_y = None,
            PointerInput::Scrolled => {}
        }
        self.gate.request()
    }

    /// Marks the pending frame as run.
    pub fn complete_frame(&mut self) {
        self.gate.complete();
    }

    /// Stops reacting to input and forgets the pointer.
    pub fn detach(&mut self) {
        *self = Self::default();
    }

    /// Returns the message whose vertical center is nearest to the pointer,
    /// or to the viewport center when the pointer is outside. Ties go to the
    /// message listed first.
    #[must_use]
    pub fn nearest<'a>(
        &self,
        viewport: Viewport,
        layout: &'a [MessageGeometry],
    ) -> Option<&'a MessageGeometry> {
        let reference = self
            .pointer_y
            .map_or(viewport.top + viewport.height / 2.0, |y| viewport.top + y);

        layout.iter().fold(None, |best: Option<&MessageGeometry>, candidate| {
            let distance = (candidate.center() - reference).abs();
            match best {
                Some(b) if (b.center() - reference).abs() <= distance => Some(b),
                _ => Some(candidate),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storyplayer_core::intent::{Intent, IntentLog};
    use storyplayer_test_support::{InMemoryLoader, fallback_loader};

    use super::*;

    fn geometry(ordinal: usize, top: f64) -> MessageGeometry {
        MessageGeometry {
            ordinal,
            top,
            height: 100.0,
        }
    }

    fn viewport() -> Viewport {
        Viewport {
            top: 0.0,
            height: 400.0,
        }
    }

    #[tokio::test]
    async fn test_change_toggles_layers() {
        // Arrange
        let local = Arc::new(
            InMemoryLoader::new("local")
                .with_file("images/event/bg/A.jpg", b"a".to_vec())
                .with_file("images/event/bg/B.jpg", b"b".to_vec()),
        );
        let assets = fallback_loader(local);
        let log = IntentLog::new();
        let mut fader = CrossFader::default();

        // Act
        assert!(fader.change("A", &assets, &log).await);
        assert!(fader.change("B", &assets, &log).await);

        // Assert
        let layers: Vec<(usize, usize)> = log
            .snapshot()
            .into_iter()
            .filter_map(|intent| match intent {
                Intent::CrossFade(fade) => Some((fade.active_layer, fade.inactive_layer)),
                _ => None,
            })
            .collect();
        assert_eq!(layers, vec![(0, 1), (1, 0)]);
        assert_eq!(fader.current(), Some("B"));
        assert_eq!(fader.active_layer(), Some(1));
    }

    #[tokio::test]
    async fn test_change_to_current_background_is_noop() {
        // Arrange
        let local = Arc::new(InMemoryLoader::new("local").with_file("images/event/bg/A.jpg", b"a".to_vec()));
        let assets = fallback_loader(local);
        let log = IntentLog::new();
        let mut fader = CrossFader::default();
        fader.change("A", &assets, &log).await;

        // Act
        let changed = fader.change("A", &assets, &log).await;

        // Assert
        assert!(!changed);
        assert_eq!(log.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_change_skips_unavailable_background() {
        // Arrange
        let assets = fallback_loader(Arc::new(InMemoryLoader::new("local")));
        let log = IntentLog::new();
        let mut fader = CrossFader::default();

        // Act
        let changed = fader.change("missing", &assets, &log).await;

        // Assert
        assert!(!changed);
        assert!(log.snapshot().is_empty());
        assert_eq!(fader.current(), Some("missing"));
        assert_eq!(fader.active_layer(), None);
    }

    #[tokio::test]
    async fn test_blank_empties_layers_once() {
        // Arrange
        let local = Arc::new(InMemoryLoader::new("local").with_file("images/event/bg/A.jpg", b"a".to_vec()));
        let assets = fallback_loader(local);
        let log = IntentLog::new();
        let mut fader = CrossFader::default();
        fader.change("A", &assets, &log).await;

        // Act
        let first = fader.blank(&log);
        let second = fader.blank(&log);

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(fader.current(), None);
        assert_eq!(fader.active_layer(), None);
        let cleared = log
            .snapshot()
            .into_iter()
            .filter(|intent| *intent == Intent::ClearBackground)
            .count();
        assert_eq!(cleared, 1);
    }

    #[test]
    fn test_frame_gate_coalesces_requests() {
        let mut gate = FrameGate::default();

        assert!(gate.request());
        assert!(!gate.request());
        gate.complete();
        assert!(gate.request());
    }

    #[test]
    fn test_detached_sync_ignores_input() {
        let mut sync = BackgroundSync::new(false);

        assert!(!sync.observe(PointerInput::Scrolled));
        assert!(!sync.is_pending());
    }

    #[test]
    fn test_nearest_uses_viewport_center_without_pointer() {
        // Arrange
        let sync = BackgroundSync::new(true);
        let layout = [geometry(0, 0.0), geometry(1, 150.0), geometry(2, 300.0)];

        // Act
        let nearest = sync.nearest(viewport(), &layout);

        // Assert
        assert_eq!(nearest.map(|m| m.ordinal), Some(1));
    }

    #[test]
    fn test_nearest_follows_pointer() {
        // Arrange
        let mut sync = BackgroundSync::new(true);
        sync.observe(PointerInput::Moved { y: 360.0 });
        let layout = [geometry(0, 0.0), geometry(1, 150.0), geometry(2, 300.0)];

        // Act
        let nearest = sync.nearest(viewport(), &layout);

        // Assert
        assert_eq!(nearest.map(|m| m.ordinal), Some(2));
    }

    #[test]
    fn test_nearest_prefers_first_on_tie() {
        let sync = BackgroundSync::new(true);
        let layout = [geometry(0, 100.0), geometry(1, 100.0)];

        let nearest = sync.nearest(viewport(), &layout);

        assert_eq!(nearest.map(|m| m.ordinal), Some(0));
    }

    #[test]
    fn test_pointer_left_falls_back_to_center() {
        // Arrange
        let mut sync = BackgroundSync::new(true);
        sync.observe(PointerInput::Moved { y: 10.0 });
        sync.observe(PointerInput::Left);
        let layout = [geometry(0, 0.0), geometry(1, 150.0)];

        // Act
        let nearest = sync.nearest(viewport(), &layout);

        // Assert
        assert_eq!(nearest.map(|m| m.ordinal), Some(1));
    }
}
