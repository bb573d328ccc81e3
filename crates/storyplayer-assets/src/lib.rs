//! Asset sources: a local directory and a remote HTTP host.
//!
//! Both implement `AssetLoader` and are combined by `FallbackLoader`.

pub mod file_loader;
pub mod http_loader;

use std::path::{Component, Path};

use storyplayer_core::error::PlaybackError;

/// Rejects asset paths that are absolute or climb out of the source root.
pub(crate) fn ensure_relative(path: &str) -> Result<(), PlaybackError> {
    let escapes = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(PlaybackError::Validation(format!(
            "asset path must stay inside the source: {path}"
        )));
    }
    Ok(())
}
