//! Server configuration.
//!
//! Loaded from an optional TOML file. The file is sparse: every key has a
//! default, so a config only lists what it changes. Unknown keys are
//! rejected so typos surface at startup instead of being silently ignored.
//!
//! ## Configuration Options
//!
//! ```toml
//! listen = "0.0.0.0:9607"      # Address the HTTP server binds to
//! data_dir = "data"            # Photos, scratch previews, default database
//! # database = "data/photoframe.db"
//!
//! [placeholder]
//! url = "https://picsum.photos/800/480"
//! timeout_secs = 10
//!
//! [weather]
//! base_url = "https://api.open-meteo.com/v1/forecast"
//! timeout_secs = 10
//!
//! [remote]
//! # base_url = "http://photos.local/api/thumbnail"
//! timeout_secs = 30
//!
//! [processing]
//! # command = "/usr/local/bin/epaper-convert"
//! args = []
//!
//! [fonts]
//! text = ["/usr/share/fonts/noto/NotoSans-Regular.ttf", ...]
//! icons = ["/usr/share/fonts/material/MaterialSymbolsOutlined.ttf", ...]
//! ```
//!
//! Command-line flags and the `DATA_DIR` / `DB_PATH` environment variables
//! override `listen`, `data_dir` and `database` after the file is loaded.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Database file name used when `database` is not set.
pub const DEFAULT_DATABASE_NAME: &str = "photoframe.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address for the HTTP server.
    pub listen: String,
    /// Root of photos and scratch previews.
    pub data_dir: PathBuf,
    /// SQLite database. Defaults to `<data_dir>/photoframe.db`.
    pub database: Option<PathBuf>,
    pub placeholder: PlaceholderConfig,
    pub weather: WeatherConfig,
    pub remote: RemoteConfig,
    pub processing: ProcessingConfig,
    pub fonts: FontsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:9607".to_string(),
            data_dir: PathBuf::from("data"),
            database: None,
            placeholder: PlaceholderConfig::default(),
            weather: WeatherConfig::default(),
            remote: RemoteConfig::default(),
            processing: ProcessingConfig::default(),
            fonts: FontsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validate values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.placeholder.url.trim().is_empty() {
            return Err(ConfigError::Validation("placeholder.url must not be empty".into()));
        }
        if self.weather.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("weather.base_url must not be empty".into()));
        }
        for (name, secs) in [
            ("placeholder.timeout_secs", self.placeholder.timeout_secs),
            ("weather.timeout_secs", self.weather.timeout_secs),
            ("remote.timeout_secs", self.remote.timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Validation(format!("{name} must be at least 1")));
            }
        }
        if self
            .processing
            .command
            .as_ref()
            .is_some_and(|c| c.as_os_str().is_empty())
        {
            return Err(ConfigError::Validation(
                "processing.command must not be empty when set".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|e| ConfigError::Validation(format!("listen address '{}': {e}", self.listen)))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_DATABASE_NAME))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaceholderConfig {
    /// Image fetched when the pool is empty or unreadable.
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            url: "https://picsum.photos/800/480".to_string(),
            timeout_secs: 10,
        }
    }
}

impl PlaceholderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// Open-Meteo forecast endpoint.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_secs: 10,
        }
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Photo service for assets stored by key instead of local path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Keys are fetched as `GET <base_url>/<key>`. Unset disables remote assets.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External processing tool. Without `command` the built-in processor runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub command: Option<PathBuf>,
    /// Arguments placed before the generated ones.
    pub args: Vec<String>,
}

/// Prioritized font candidates; the first readable one wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    pub text: Vec<PathBuf>,
    pub icons: Vec<PathBuf>,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            text: [
                "/usr/share/fonts/noto/NotoSans-Regular.ttf",
                "fonts/NotoSans-Regular.ttf",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/System/Library/Fonts/Supplemental/Arial.ttf",
                "/Library/Fonts/Arial.ttf",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            icons: [
                "/usr/share/fonts/material/MaterialSymbolsOutlined.ttf",
                "fonts/MaterialSymbolsOutlined.ttf",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        }
    }
}

/// Parse a config from TOML text, filling in defaults, and validate it.
pub fn parse_config(text: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, or stock defaults when `path` is `None`.
///
/// An explicitly given file must exist.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    match path {
        Some(path) => parse_config(&fs::read_to_string(path)?),
        None => {
            let config = ServerConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo frame server configuration
# ================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Address the HTTP server listens on.
listen = "0.0.0.0:9607"

# Directory holding photos and scratch previews (thumb_*.jpg).
# Recorded asset paths under /data/ or /app/data/ are remapped here.
data_dir = "data"

# SQLite database with the images and devices tables.
# Defaults to <data_dir>/photoframe.db.
# database = "data/photoframe.db"

# ---------------------------------------------------------------------------
# Placeholder image, served when no photo can be loaded
# ---------------------------------------------------------------------------
[placeholder]
url = "https://picsum.photos/800/480"
timeout_secs = 10

# ---------------------------------------------------------------------------
# Weather overlay (Open-Meteo)
# ---------------------------------------------------------------------------
[weather]
base_url = "https://api.open-meteo.com/v1/forecast"
timeout_secs = 10

# ---------------------------------------------------------------------------
# Remote photo service for assets stored by key
# ---------------------------------------------------------------------------
[remote]
# Keys are fetched as GET <base_url>/<key>. Leave unset to disable.
# base_url = "http://photos.local/api/thumbnail"
timeout_secs = 30

# ---------------------------------------------------------------------------
# Final processing step
# ---------------------------------------------------------------------------
[processing]
# External converter, called as:
#   <command> [args]... [--<option> <value>]... --output <out.png> --thumbnail <thumb.jpg> <input.png>
# Leave unset to use the built-in processor (rotate, resize, PNG).
# command = "/usr/local/bin/epaper-convert"
args = []

# ---------------------------------------------------------------------------
# Overlay fonts, tried in order
# ---------------------------------------------------------------------------
[fonts]
text = [
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "fonts/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
]
icons = [
    "/usr/share/fonts/material/MaterialSymbolsOutlined.ttf",
    "fonts/MaterialSymbolsOutlined.ttf",
]
"##
}
