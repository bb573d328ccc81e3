//! Asset loader abstraction and the local-then-remote fallback policy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::asset::{AssetKind, AssetOrigin};
use crate::error::PlaybackError;

/// A single asset source (a local directory or a remote host).
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Fetches the bytes stored at `path` (relative to the source base).
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, PlaybackError>;

    /// Checks that `path` is available and returns its concrete location
    /// (a filesystem path or URL) without keeping the bytes.
    async fn locate(&self, path: &str) -> Result<String, PlaybackError>;

    /// Returns the concrete location `path` maps to, for logging.
    fn describe(&self, path: &str) -> String;
}

/// An asset fetched through the fallback policy.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    /// Which source provided the asset.
    pub origin: AssetOrigin,
    /// Concrete location the bytes came from.
    pub location: String,
    /// Raw asset bytes.
    pub bytes: Vec<u8>,
}

/// An asset whose availability was confirmed through the fallback policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedAsset {
    /// Which source has the asset.
    pub origin: AssetOrigin,
    /// Concrete location of the asset.
    pub location: String,
}

/// Loader that tries the local source first and the remote source second.
///
/// The first success wins. A local failure is logged and retried remotely;
/// both failing is reported as `PlaybackError::AssetUnavailable`.
#[derive(Clone)]
pub struct FallbackLoader {
    local: Arc<dyn AssetLoader>,
    remote: Arc<dyn AssetLoader>,
}

impl std::fmt::Debug for FallbackLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackLoader")
            .field("local", &self.local.describe(""))
            .field("remote", &self.remote.describe(""))
            .finish()
    }
}

impl FallbackLoader {
    /// Creates a loader over the given local and remote sources.
    #[must_use]
    pub fn new(local: Arc<dyn AssetLoader>, remote: Arc<dyn AssetLoader>) -> Self {
        Self { local, remote }
    }

    /// Fetches asset `id` of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::AssetUnavailable` if both sources fail.
    pub async fn load(&self, kind: &AssetKind, id: &str) -> Result<LoadedAsset, PlaybackError> {
        let path = kind.relative_path(id);

        match self.local.fetch(&path).await {
            Ok(bytes) => {
                return Ok(LoadedAsset {
                    origin: AssetOrigin::Local,
                    location: self.local.describe(&path),
                    bytes,
                });
            }
            Err(e) => {
                warn!(%kind, path = %path, error = %e, "local asset missing, trying remote source");
            }
        }

        match self.remote.fetch(&path).await {
            Ok(bytes) => Ok(LoadedAsset {
                origin: AssetOrigin::Remote,
                location: self.remote.describe(&path),
                bytes,
            }),
            Err(e) => {
                error!(
                    %kind,
                    local = %self.local.describe(&path),
                    remote = %self.remote.describe(&path),
                    error = %e,
                    "failed to fetch asset from both local and remote sources"
                );
                Err(PlaybackError::AssetUnavailable {
                    path,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Confirms asset `id` of the given kind is available and returns where.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::AssetUnavailable` if both sources fail.
    pub async fn locate(&self, kind: &AssetKind, id: &str) -> Result<LocatedAsset, PlaybackError> {
        let path = kind.relative_path(id);

        if let Ok(location) = self.local.locate(&path).await {
            return Ok(LocatedAsset {
                origin: AssetOrigin::Local,
                location,
            });
        }

        match self.remote.locate(&path).await {
            Ok(location) => Ok(LocatedAsset {
                origin: AssetOrigin::Remote,
                location,
            }),
            Err(e) => {
                error!(
                    %kind,
                    local = %self.local.describe(&path),
                    remote = %self.remote.describe(&path),
                    "asset not found"
                );
                Err(PlaybackError::AssetUnavailable {
                    path,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Fetches asset `id` and decodes it as JSON.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::AssetUnavailable` if both sources fail, or
    /// `PlaybackError::Decode` if the bytes are not valid JSON for `T`.
    pub async fn load_json<T: DeserializeOwned>(
        &self,
        kind: &AssetKind,
        id: &str,
    ) -> Result<T, PlaybackError> {
        let asset = self.load(kind, id).await?;
        serde_json::from_slice(&asset.bytes).map_err(|e| {
            PlaybackError::Decode(format!("{} is not valid JSON: {e}", asset.location))
        })
    }
}
