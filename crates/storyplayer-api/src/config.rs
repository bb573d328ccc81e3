//! Server configuration.
//!
//! Values come from defaults, then an optional YAML file named by
//! `STORYPLAYER_CONFIG`, then individual environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use storyplayer_timeline::domain::interpreter::TimelineSettings;

use crate::error::AppError;
use crate::state::DEFAULT_SESSION_IDLE;

/// Environment variable naming the YAML configuration file.
pub const CONFIG_FILE_VAR: &str = "STORYPLAYER_CONFIG";

/// Settings for the API server and the engine it hosts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub host: String,
    pub port: u16,
    /// Directory searched first for every asset.
    pub local_assets: PathBuf,
    /// Base URL tried when the local directory misses.
    pub remote_assets: String,
    /// Request timeout for the remote source, in seconds.
    pub remote_timeout_secs: u64,
    pub max_jump_chain: usize,
    pub settle_delay_ms: u64,
    /// Seconds a session may sit unused before it is evicted.
    pub session_idle_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let timeline = TimelineSettings::default();
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            local_assets: PathBuf::from("../assets/"),
            remote_assets: "https://viewer.shinycolors.moe/".to_owned(),
            remote_timeout_secs: 10,
            max_jump_chain: timeline.max_jump_chain,
            settle_delay_ms: u64::try_from(timeline.settle_delay.as_millis()).unwrap_or(1),
            session_idle_secs: DEFAULT_SESSION_IDLE.as_secs(),
        }
    }
}

impl PlayerConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or parsed, or an
    /// override does not parse.
    pub fn load() -> Result<Self, AppError> {
        let mut config = match std::env::var(CONFIG_FILE_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads a YAML configuration file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }

    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the document is not a valid configuration.
    pub fn from_yaml(text: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(text).map_err(|e| AppError::Config(format!("invalid YAML: {e}")))
    }

    /// Applies environment overrides, looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the variable whose value does not
    /// parse.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), AppError> {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_var("PORT", &port)?;
        }
        if let Some(path) = lookup("LOCAL_ASSETS_PATH") {
            self.local_assets = PathBuf::from(path);
        }
        if let Some(url) = lookup("REMOTE_ASSETS_URL") {
            self.remote_assets = url;
        }
        if let Some(limit) = lookup("MAX_JUMP_CHAIN") {
            self.max_jump_chain = parse_var("MAX_JUMP_CHAIN", &limit)?;
        }
        if let Some(delay) = lookup("SETTLE_DELAY_MS") {
            self.settle_delay_ms = parse_var("SETTLE_DELAY_MS", &delay)?;
        }
        if let Some(idle) = lookup("SESSION_IDLE_SECS") {
            self.session_idle_secs = parse_var("SESSION_IDLE_SECS", &idle)?;
        }
        Ok(())
    }

    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid host and port combination.
    pub fn addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    #[must_use]
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    #[must_use]
    pub fn timeline_settings(&self) -> TimelineSettings {
        TimelineSettings {
            max_jump_chain: self.max_jump_chain,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::Config(format!("{name} must be valid: {e}")))
}
