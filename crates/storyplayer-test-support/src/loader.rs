//! Test loaders: in-memory `AssetLoader` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use storyplayer_core::error::PlaybackError;
use storyplayer_core::loader::AssetLoader;

/// An asset source backed by a map of relative path → bytes. Records every
/// path that was fetched or located.
#[derive(Debug)]
pub struct InMemoryLoader {
    name: String,
    files: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl InMemoryLoader {
    /// Creates an empty source; `name` prefixes described locations.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            files: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Adds a file and returns the source, builder style.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_file(self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_owned(), bytes.into());
        self
    }

    /// Returns every requested path in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetLoader for InMemoryLoader {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, PlaybackError> {
        self.requests.lock().unwrap().push(path.to_owned());
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| PlaybackError::Infrastructure(format!("{path}: not found")))
    }

    async fn locate(&self, path: &str) -> Result<String, PlaybackError> {
        self.fetch(path).await.map(|_| self.describe(path))
    }

    fn describe(&self, path: &str) -> String {
        format!("{}/{path}", self.name)
    }
}

/// An asset source that always fails. Useful for testing fallback paths.
#[derive(Debug)]
pub struct FailingLoader;

#[async_trait]
impl AssetLoader for FailingLoader {
    async fn fetch(&self, _path: &str) -> Result<Vec<u8>, PlaybackError> {
        Err(PlaybackError::Infrastructure("connection refused".into()))
    }

    async fn locate(&self, _path: &str) -> Result<String, PlaybackError> {
        Err(PlaybackError::Infrastructure("connection refused".into()))
    }

    fn describe(&self, path: &str) -> String {
        format!("unreachable/{path}")
    }
}
