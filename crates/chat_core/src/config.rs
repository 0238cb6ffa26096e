use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Valid range of the retrieval depth accepted by the query endpoint.
pub const TOP_K_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the document chat server, without a trailing slash.
    pub server_url: String,
    /// Number of chunks to retrieve per question; server default when unset.
    pub top_k: Option<u8>,
    pub connect_timeout_secs: u64,
    /// Upper bound on waiting for the response headers of a request.
    pub request_timeout_secs: u64,
    /// Upper bound on the gap between two stream events.
    pub idle_timeout_secs: u64,
    /// Use the streaming endpoint; the buffered endpoint otherwise.
    pub streaming: bool,
}

fn parse_bool_env(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Drop a `top_k` outside [`TOP_K_RANGE`] so the server default applies.
fn checked_top_k(top_k: Option<u8>, origin: &str) -> Option<u8> {
    match top_k {
        Some(k) if !TOP_K_RANGE.contains(&k) => {
            log::warn!(
                "[config] {origin}: top_k {k} outside {}..={}, ignoring",
                TOP_K_RANGE.start(),
                TOP_K_RANGE.end()
            );
            None
        }
        other => other,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            top_k: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            idle_timeout_secs: 60,
            streaming: true,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then `~/.docchat/config.json`, then
    /// `./docchat.toml`, then `DOCCHAT_*` environment variables.
    ///
    /// Unreadable or malformed files are skipped with a warning.
    pub fn new() -> Self {
        let mut config = Config::default();

        for path in [paths::config_json_path(), paths::local_config_path()] {
            if !path.exists() {
                continue;
            }
            match Config::from_file(&path) {
                Ok(file_config) => {
                    log::debug!("[config] loaded {}", path.display());
                    config = file_config;
                }
                Err(e) => log::warn!("[config] ignoring {}: {}", path.display(), e),
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse a config file; `.toml` files as TOML, anything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let mut config: Config = if is_toml {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.top_k = checked_top_k(config.top_k, &path.display().to_string());
        Ok(config)
    }

    /// Override fields from environment-style lookups. Unparseable numbers are
    /// ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DOCCHAT_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(top_k) = lookup("DOCCHAT_TOP_K") {
            match top_k.trim().parse::<u8>() {
                Ok(value) => self.top_k = checked_top_k(Some(value), "DOCCHAT_TOP_K"),
                Err(_) => log::warn!("[config] DOCCHAT_TOP_K is not a number: {top_k:?}"),
            }
        }
        for (key, slot) in [
            ("DOCCHAT_CONNECT_TIMEOUT", &mut self.connect_timeout_secs),
            ("DOCCHAT_REQUEST_TIMEOUT", &mut self.request_timeout_secs),
            ("DOCCHAT_IDLE_TIMEOUT", &mut self.idle_timeout_secs),
        ] {
            if let Some(raw) = lookup(key) {
                match raw.trim().parse::<u64>() {
                    Ok(value) => *slot = value,
                    Err(_) => log::warn!("[config] {key} is not a number: {raw:?}"),
                }
            }
        }
        if let Some(streaming) = lookup("DOCCHAT_STREAMING") {
            self.streaming = parse_bool_env(&streaming);
        }
    }

    /// `server_url` without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
