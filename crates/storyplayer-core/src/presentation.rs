//! Presentation port.
//!
//! The timeline never renders anything itself. It hands intents to a
//! presentation collaborator that owns the actual view.

use serde::Serialize;

use crate::asset::AssetOrigin;
use crate::script::{ScreenEffect, TextFrameMode};

/// A message to append to the message list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Position of the record that produced the message.
    pub event_index: usize,
    /// Ordinal of the message within the session's message list.
    pub ordinal: usize,
    /// Presentation style.
    pub frame: TextFrameMode,
    /// Displayed speaker name.
    pub speaker: Option<String>,
    /// Message text.
    pub text: String,
    /// Speaker icon path.
    pub icon: String,
    /// Background that was showing when the message was produced.
    pub background: Option<String>,
    /// Voice line that can be replayed from the message.
    pub voice: Option<String>,
}

/// A two-layer background cross-fade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossFade {
    /// Background identifier being shown.
    pub background_id: String,
    /// Concrete image location.
    pub location: String,
    /// Which source provided the image.
    pub origin: AssetOrigin,
    /// Layer receiving the new image, marked active.
    pub active_layer: usize,
    /// Layer marked inactive.
    pub inactive_layer: usize,
}

/// A branch set awaiting the player's choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchPrompt {
    /// Position of the record that opened the branch.
    pub start_index: usize,
    /// Option texts in display order.
    pub options: Vec<String>,
}

/// Presentation collaborator.
pub trait Presentation: Send + Sync {
    /// Shows a new background through a cross-fade.
    fn crossfade(&self, fade: &CrossFade);

    /// Appends a message to the message list.
    fn append_message(&self, message: &Message);

    /// Shows a branch set.
    fn show_branch(&self, prompt: &BranchPrompt);

    /// Marks option `chosen` of the branch opened at `start_index` as selected
    /// and drops everything presented after the branch.
    fn branch_resolved(&self, start_index: usize, chosen: usize);

    /// Applies a lingering overlay effect.
    fn apply_effect(&self, effect: &ScreenEffect);

    /// Clears every lingering overlay effect.
    fn clear_effects(&self);

    /// Empties both background layers, leaving no background shown.
    fn clear_background(&self);

    /// Releases background layers and listeners.
    fn reset(&self);
}
