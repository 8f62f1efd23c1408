//! Configuration loading and backend URL resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the backend URL
pub const BACKEND_URL_ENV: &str = "ROSTER_BACKEND_URL";

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "ROSTER_CONFIG";

/// Compiled default backend (the roster web service)
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5001";

/// Dashboard configuration, every key optional in TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub backend_url: String,
    /// Delay between refresh polling ticks
    pub poll_interval_ms: u64,
    /// Client-side wait limit for a refresh job
    pub refresh_timeout_secs: u64,
    /// Background roster reload cadence
    pub reload_interval_secs: u64,
    /// Rows per page, 0 shows everything
    pub page_size: usize,
    pub visible_columns: Vec<String>,
    pub sort_column: String,
    pub sort_descending: bool,
    /// Names shown in the recent list
    pub recent_count: usize,
    /// Records refreshed by "refresh all"
    pub refresh_all_count: usize,
    /// Target count above which a bulk refresh asks for confirmation
    pub bulk_confirm_threshold: usize,
    pub request_timeout_secs: u64,
    pub logging: LoggingConfig,
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval_ms: 3000,
            refresh_timeout_secs: 120,
            reload_interval_secs: 60,
            page_size: 50,
            visible_columns: [
                "name",
                "instagram_followers",
                "spotify_followers",
                "spotify_listeners",
                "twitter_followers",
                "updated_at",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            sort_column: "updated_at".to_string(),
            sort_descending: true,
            recent_count: 5,
            refresh_all_count: 5,
            bulk_confirm_threshold: 10,
            request_timeout_secs: 30,
            logging: LoggingConfig::default(),
        }
    }
}

impl DashConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DashConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file; a missing file yields `Ok(None)`
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map(Some)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.reload_interval_secs == 0 {
            return Err(Error::Config(
                "reload_interval_secs must be positive".to_string(),
            ));
        }
        if self.backend_url.trim().is_empty() {
            return Err(Error::Config("backend_url must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Backend URL without a trailing slash, ready for path joining
    pub fn base_url(&self) -> &str {
        self.backend_url.trim().trim_end_matches('/')
    }
}

/// Locate the config file:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory (`<config dir>/roster/config.toml`)
pub fn config_file_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|d| d.join("roster").join("config.toml"))
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// No file at `path`; `explicit` when the path was asked for by name
    Missing { path: PathBuf, explicit: bool },
    /// No config location could be determined
    Defaults,
}

impl ConfigOrigin {
    /// Emit the load diagnostic; call once a subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigOrigin::Missing { explicit: true, .. } => warn!("{}", self),
            _ => info!("{}", self),
        }
    }
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::File(path) => write!(f, "Loaded configuration from {}", path.display()),
            ConfigOrigin::Missing {
                path,
                explicit: true,
            } => write!(
                f,
                "Config file not found: {} (using defaults)",
                path.display()
            ),
            ConfigOrigin::Missing {
                path,
                explicit: false,
            } => write!(f, "No config file at {} (using defaults)", path.display()),
            ConfigOrigin::Defaults => write!(f, "No config location (using defaults)"),
        }
    }
}

/// Load configuration and resolve the backend URL in priority order:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. Compiled default
///
/// Nothing is logged here. The returned origin carries the diagnostic so it
/// can be reported after tracing is set up with the configured level.
pub fn load_config(
    cli_config: Option<&Path>,
    cli_backend: Option<&str>,
) -> Result<(DashConfig, ConfigOrigin)> {
    let (mut config, origin) = match config_file_path(cli_config) {
        Some(path) => match DashConfig::load_file(&path)? {
            Some(config) => (config, ConfigOrigin::File(path)),
            None => (
                DashConfig::default(),
                ConfigOrigin::Missing {
                    path,
                    explicit: cli_config.is_some(),
                },
            ),
        },
        None => (DashConfig::default(), ConfigOrigin::Defaults),
    };

    if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
        if !url.trim().is_empty() {
            config.backend_url = url;
        }
    }

    if let Some(url) = cli_backend {
        config.backend_url = url.to_string();
    }

    config.validate()?;
    Ok((config, origin))
}
