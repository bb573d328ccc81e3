//! Test fixtures: tracks and loaders built from inline data.

use std::sync::Arc;

use storyplayer_core::loader::FallbackLoader;
use storyplayer_core::track::Track;

use crate::loader::{FailingLoader, InMemoryLoader};

/// Builds a track from an inline JSON array (usually `serde_json::json!`).
///
/// # Panics
///
/// Panics if the value is not a valid record array.
#[must_use]
pub fn track_from_value(value: serde_json::Value) -> Track {
    let bytes = serde_json::to_vec(&value).unwrap();
    Track::from_json(&bytes).unwrap()
}

/// Wraps `local` in a fallback loader whose remote source always fails.
#[must_use]
pub fn fallback_loader(local: Arc<InMemoryLoader>) -> Arc<FallbackLoader> {
    Arc::new(FallbackLoader::new(local, Arc::new(FailingLoader)))
}
