//! Asset source backed by a remote HTTP host.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use storyplayer_core::error::PlaybackError;
use storyplayer_core::loader::AssetLoader;
use tracing::debug;

use crate::ensure_relative;

/// Fetches assets relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: Client,
    base: Url,
}

impl HttpLoader {
    /// Creates a loader for `base`. A missing trailing slash is added so
    /// asset paths resolve beneath it.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Validation` if `base` is not an absolute URL,
    /// or `PlaybackError::Infrastructure` if the HTTP client cannot be built.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, PlaybackError> {
        let normalized = if base.ends_with('/') {
            base.to_owned()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|e| PlaybackError::Validation(format!("invalid remote base {base}: {e}")))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2).min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| PlaybackError::Infrastructure(format!("http client: {e}")))?;
        Ok(Self { client, base })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, PlaybackError> {
        ensure_relative(path)?;
        self.base
            .join(path)
            .map_err(|e| PlaybackError::Validation(format!("invalid asset path {path}: {e}")))
    }
}

#[async_trait]
impl AssetLoader for HttpLoader {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, PlaybackError> {
        let url = self.url(path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| PlaybackError::Infrastructure(format!("{url}: {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlaybackError::Infrastructure(format!("{url}: {e}")))?;
        debug!(%url, len = bytes.len(), "remote asset fetched");
        Ok(bytes.to_vec())
    }

    async fn locate(&self, path: &str) -> Result<String, PlaybackError> {
        let url = self.url(path)?;
        self.client
            .head(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| PlaybackError::Infrastructure(format!("{url}: {e}")))?;
        Ok(url.to_string())
    }

    fn describe(&self, path: &str) -> String {
        self.base
            .join(path)
            .map_or_else(|_| format!("{}{path}", self.base), |url| url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appends_trailing_slash() {
        let loader = HttpLoader::new("https://viewer.shinycolors.moe", Duration::from_secs(5)).unwrap();

        assert_eq!(
            loader.describe("sounds/bgm/m1.m4a"),
            "https://viewer.shinycolors.moe/sounds/bgm/m1.m4a"
        );
    }

    #[test]
    fn test_new_rejects_relative_base() {
        let result = HttpLoader::new("assets/", Duration::from_secs(5));

        assert!(matches!(result, Err(PlaybackError::Validation(_))));
    }
}
