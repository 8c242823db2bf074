//! Configuration management for Flowchat.
//!
//! Provides configuration loading from TOML files with support for
//! multiple file locations, environment variable overrides, and sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default chat endpoint of a locally running dashboard backend.
const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/support/chat";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path to the configuration file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML parse error.
        source: toml::de::Error,
    },
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// URL the chat request is POSTed to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token sent with the request.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Give up when no chunk arrives for this many seconds.
    ///
    /// Unset means wait indefinitely.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,

    /// Content rendering options.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Rendering options for segmented answers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    /// Drop lines of leaked model deliberation from prose.
    #[serde(default = "default_filter_noise")]
    pub filter_noise: bool,

    /// Additional line prefixes treated as deliberation (case-insensitive).
    #[serde(default)]
    pub extra_noise_prefixes: Vec<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_filter_noise() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            filter_noise: default_filter_noise(),
            extra_noise_prefixes: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file system.
    ///
    /// Priority order:
    /// 1. FLOWCHAT_CONFIG environment variable
    /// 2. ./config.toml (local directory)
    /// 3. ~/.config/flowchat/config.toml (user config)
    ///
    /// Returns default config if no config file found. `FLOWCHAT_API_KEY`
    /// overrides `api_key` in every case.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if a found file cannot be read.
    /// Returns [`ConfigError::ParseError`] if a found file is not valid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_file()?;
        if let Ok(key) = std::env::var("FLOWCHAT_API_KEY")
            && !key.is_empty()
        {
            config.api_key = Some(key);
        }
        Ok(config)
    }

    fn load_file() -> Result<Self, ConfigError> {
        // 1. Environment variable (highest priority)
        if let Ok(path) = std::env::var("FLOWCHAT_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Self::load_from(p);
            }
        }

        // 2. Local directory
        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Self::load_from(local);
        }

        // 3. User config directory (~/.config/flowchat/)
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config/flowchat/config.toml");
            if user_config.exists() {
                return Self::load_from(user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read.
    /// Returns [`ConfigError::ParseError`] if the file is not valid TOML.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Per-read idle timeout, if configured.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            read_timeout_secs: None,
            render: RenderConfig::default(),
        }
    }
}
