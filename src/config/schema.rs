//! Configuration schema for runx
//!
//! Configuration is stored at `~/.config/runx/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ephemeral environment cache settings
    pub cache: CacheConfig,

    /// Interpreter defaults
    pub interpreter: InterpreterConfig,

    /// Advisory version check settings
    pub advisory: AdvisoryConfig,

    /// Persistent per-app environment settings
    pub envs: EnvsConfig,
}

/// Ephemeral cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory (defaults to the platform cache dir)
    pub dir: Option<PathBuf>,

    /// Days before an unused environment expires
    pub expiration_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            expiration_days: 14,
        }
    }
}

impl CacheConfig {
    /// Resolved cache root
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("runx")
                .join("envs")
        })
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Interpreter used when `--python` is not given
    pub default: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            default: "python3".to_string(),
        }
    }
}

/// Advisory version check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Whether the periodic version check runs at all
    pub enabled: bool,

    /// Package index base URL for the version oracle
    pub index_url: String,

    /// Command invoked (with the app name appended) when a newer version
    /// exists. Empty means: print a note instead.
    pub upgrade_command: Vec<String>,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_url: "https://pypi.org".to_string(),
            upgrade_command: Vec::new(),
        }
    }
}

/// Persistent per-app environments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvsConfig {
    /// Directory holding long-lived per-app environments
    pub dir: Option<PathBuf>,
}

impl EnvsConfig {
    /// Resolved persistent environments root
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("runx")
                .join("venvs")
        })
    }
}
