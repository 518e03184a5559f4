//! Persistent configuration for tapwright.
//!
//! Everything needed to reach an existing automation session is carried in an
//! explicit [`HarnessConfig`] value rather than looked up from process-wide
//! state. The config can be built in code, or loaded from
//! `~/.tapwright/config.json`.
//!
//! # Example
//!
//! ```no_run
//! use tapwright_core::config::HarnessConfig;
//! use tapwright_core::platform::Platform;
//!
//! // Load (returns defaults if file doesn't exist)
//! let mut config = HarnessConfig::load();
//! config.platform = Some(Platform::Ios);
//! println!("Appium server: {}", config.server_url);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::platform::Platform;

const CONFIG_FILENAME: &str = "config.json";

/// Default Appium server endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4723";

/// Default directory (relative to the working directory) for screenshots.
pub const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";

/// Returns the tapwright home directory (`~/.tapwright/`).
///
/// Creates the directory if it doesn't exist. Falls back to the current
/// directory when no home directory can be determined.
pub fn tapwright_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tapwright");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Returns the logs directory (`~/.tapwright/logs/`), creating it if needed.
pub fn logs_dir() -> PathBuf {
    let dir = tapwright_dir().join("logs");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Errors from reading or writing a config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Explicit-wait tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WaitConfig {
    /// Upper bound for an element to become interactable.
    pub timeout_ms: u64,
    /// Delay between polls.
    pub poll_interval_ms: u64,
    /// Upper bound for a dismissed element to disappear.
    pub settle_timeout_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            poll_interval_ms: 250,
            settle_timeout_ms: 2000,
        }
    }
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

/// Configuration for attaching to an existing automation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL of the Appium server (no trailing `/session`).
    pub server_url: String,

    /// Attach to this session id instead of discovering one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Capabilities a discovered session must match.
    ///
    /// A key `k` matches either `k` or `appium:k` in the session's
    /// capabilities.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub capabilities: Map<String, Value>,

    /// Used when the session does not report `platformName`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Where screenshots are written.
    pub screenshot_dir: PathBuf,

    /// Timeout for a single HTTP request to the server.
    pub request_timeout_ms: u64,

    pub wait: WaitConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            session_id: None,
            capabilities: Map::new(),
            platform: None,
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
            request_timeout_ms: 30_000,
            wait: WaitConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Builds a config pointing at `server_url` with every other field defaulted.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Path of the user-level config file.
    pub fn default_path() -> PathBuf {
        tapwright_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.tapwright/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed;
    /// an unparsable file is logged. Use [`load_if_exists`](Self::load_if_exists)
    /// to surface that error instead.
    pub fn load() -> Self {
        Self::load_if_exists(&Self::default_path()).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable config");
            Self::default()
        })
    }

    /// Load config from `path` if it exists; a missing file yields [`Default`].
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_if_exists(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load config from an explicit path, reporting read and parse failures.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to `path` as pretty-printed JSON.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
