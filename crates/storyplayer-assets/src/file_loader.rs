//! Asset source backed by a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use storyplayer_core::error::PlaybackError;
use storyplayer_core::loader::AssetLoader;
use tracing::debug;

use crate::ensure_relative;

/// Reads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    /// Creates a loader rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, PlaybackError> {
        ensure_relative(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl AssetLoader for FileLoader {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, PlaybackError> {
        let full = self.resolve(path)?;
        let bytes = tokio::fs::read(&full)
            .await
            .map_err(|e| PlaybackError::Infrastructure(format!("{}: {e}", full.display())))?;
        debug!(path = %full.display(), len = bytes.len(), "local asset read");
        Ok(bytes)
    }

    async fn locate(&self, path: &str) -> Result<String, PlaybackError> {
        let full = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| PlaybackError::Infrastructure(format!("{}: {e}", full.display())))?;
        if !metadata.is_file() {
            return Err(PlaybackError::Infrastructure(format!(
                "{}: not a file",
                full.display()
            )));
        }
        Ok(full.display().to_string())
    }

    fn describe(&self, path: &str) -> String {
        self.root.join(path).display().to_string()
    }
}
