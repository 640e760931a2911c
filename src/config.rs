//! Configuration file handling for affiliate-studio.
//!
//! Loads configuration from `~/.config/affiliate-studio/config.toml` or a
//! custom path. Every field is optional; values merge with CLI flags and
//! built-in defaults in `main`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file structure for affiliate-studio.
/// Loaded from ~/.config/affiliate-studio/config.toml (or custom path via --config).
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

/// Defaults for the `generate` command's creative options. Values are kept
/// as strings here and validated together with CLI flags, so a typo in the
/// file gets the same error message as a typo on the command line.
#[derive(Debug, Deserialize, Default)]
pub struct GeneratorConfig {
    pub ratio: Option<String>,
    pub visual_style: Option<String>,
    pub tone: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiConfig {
    /// Override for the API base URL, mainly for proxies.
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VideoConfig {
    /// How long to wait for video generation before giving up, in seconds.
    pub timeout_secs: Option<u64>,
    /// Disable the timeout entirely and poll until the job finishes.
    pub wait_forever: Option<bool>,
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// With no explicit path, reads the default location and falls back to
    /// defaults when the file doesn't exist. An explicit path must exist;
    /// a mistyped `--config` is reported rather than ignored.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound { path });
            }
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        Ok(config)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    NotFound {
        path: PathBuf,
    },
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound { path } => {
                write!(f, "Config file '{}' does not exist", path.display())
            }
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::NotFound { .. } => None,
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("affiliate-studio").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/affiliate-studio/config.toml")
        })
}
