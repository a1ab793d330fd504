//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the file named by `ARBWATCH_CONFIG`) and
//! deserializes into strongly-typed structs. Every section is optional;
//! missing keys fall back to the defaults below.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::view::filters::FilterControls;

/// Env var naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "ARBWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub refresh: RefreshConfig,
    pub notifications: NotificationsConfig,
    /// Filter controls as they start out on launch.
    pub filters: FilterControls,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the scanning backend, without trailing slash.
    pub base_url: String,
    /// Timeout for the config and virtual-bet requests.
    pub request_timeout_secs: u64,
    /// Upper bound on a scan round-trip. Unset means scans may run forever.
    pub scan_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
            scan_timeout_secs: None,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    /// Start with auto-refresh switched on.
    pub auto_start: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            auto_start: false,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationsConfig {
    pub visible_ms: u64,
    pub exit_ms: u64,
    /// Ring the terminal bell on good news.
    pub sound: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            visible_ms: 3000,
            exit_ms: 300,
            sound: true,
        }
    }
}

impl NotificationsConfig {
    pub fn visible_for(&self) -> Duration {
        Duration::from_millis(self.visible_ms)
    }

    pub fn exit_after(&self) -> Duration {
        Duration::from_millis(self.exit_ms)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8088,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise run on defaults.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            warn!(path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Config path from `ARBWATCH_CONFIG`, falling back to `config.toml`.
    pub fn path_from_env() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}
