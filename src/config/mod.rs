//! Configuration management for opds-reader.
//!
//! Configuration is read from `~/.config/opds-reader/config.toml`.
//! If the file doesn't exist, a default configuration with comments is created.
//! The catalog core never reads this; the command line turns it into plain
//! arguments.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{PageLimit, DEFAULT_MAX_PAGES};
use crate::fetcher::retry::{RetryPolicy, DEFAULT_MAX_RETRIES};
use crate::normalizer::TimestampMode;
use crate::reconcile::UnknownUuidPolicy;

pub const DEFAULT_OPDS_URL: &str = "http://localhost:8080/opds";

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog URL history, most recently used first.
    pub opds_urls: Vec<String>,
    pub hide_newspapers: bool,
    pub hide_already_in_library: bool,
    pub fetch: FetchConfig,
    pub timestamps: TimestampConfig,
    pub reconcile: ReconcileConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            opds_urls: vec![DEFAULT_OPDS_URL.to_string()],
            hide_newspapers: true,
            hide_already_in_library: true,
            fetch: FetchConfig::default(),
            timestamps: TimestampConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds (default: 10)
    pub timeout_secs: u64,
    /// Retries for timeouts, connection errors, 5xx and 429 (default: 1)
    pub retries: u32,
    /// Delay before the first retry, doubled for each further one (default: 500)
    pub retry_backoff_ms: u64,
    /// Maximum number of pages fetched for one catalog (default: 1000)
    pub max_pages: usize,
    /// Follow `next` links without any page limit (default: false)
    pub unbounded_pagination: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: 500,
            max_pages: DEFAULT_MAX_PAGES,
            unbounded_pagination: false,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retries,
            base_delay: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn page_limit(&self) -> PageLimit {
        if self.unbounded_pagination {
            PageLimit::Unbounded
        } else {
            PageLimit::Pages(self.max_pages)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    /// Apply `±HH:MM` offsets instead of discarding them (default: false)
    pub offset_aware: bool,
}

impl TimestampConfig {
    pub fn mode(&self) -> TimestampMode {
        TimestampMode::from_offset_aware(self.offset_aware)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// What to do with a book the server has no timestamp for: "skip" or "abort"
    pub unknown_uuid: UnknownUuidPolicy,
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            // Create default config with comments
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;
        config.ensure_default_url();

        Ok(config)
    }

    /// Write the configuration to `path`, replacing the file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/opds-reader/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("opds-reader").join("config.toml"))
    }

    /// The most recently used catalog URL.
    pub fn current_url(&self) -> &str {
        self.opds_urls
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_OPDS_URL)
    }

    /// Moves `url` to the front of the history, adding it if new.
    pub fn remember_url(&mut self, url: &str) {
        self.opds_urls.retain(|u| u != url);
        self.opds_urls.insert(0, url.to_string());
    }

    /// The default URL always stays selectable.
    fn ensure_default_url(&mut self) {
        if !self.opds_urls.iter().any(|u| u == DEFAULT_OPDS_URL) {
            self.opds_urls.push(DEFAULT_OPDS_URL.to_string());
        }
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# opds-reader configuration

# Catalog URLs, most recently used first
opds_urls = ["http://localhost:8080/opds"]

# Hide entries tagged "News"
hide_newspapers = true

# Hide books already present in the local library
hide_already_in_library = true

[fetch]
# Per-request timeout in seconds
timeout_secs = 10

# Retries for transient failures (timeouts, connection errors, 5xx, 429)
retries = 1

# Delay before the first retry in milliseconds
retry_backoff_ms = 500

# Maximum number of pages fetched for one catalog
max_pages = 1000

# Follow "next" links without any page limit
unbounded_pagination = false

[timestamps]
# Apply timezone offsets instead of discarding them
offset_aware = false

[reconcile]
# Books the calibre server has no timestamp for: "skip" or "abort"
unknown_uuid = "skip"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
