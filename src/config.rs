//! Configuration loaded from `wscan.toml`
//!
//! Every field has a default, so a missing file, a missing section or a
//! missing key all fall back silently. CLI flags override whatever is loaded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::MatchMode;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "wscan.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings for the search engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// Case policy for index lookups and scans
    #[serde(default)]
    pub match_mode: MatchMode,

    /// Maximum files scanned at once on a cache miss (0 = one task per file, unbounded)
    #[serde(default = "default_max_concurrent_scans")]
    pub max_concurrent_scans: usize,
}

fn default_max_concurrent_scans() -> usize {
    64
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            max_concurrent_scans: default_max_concurrent_scans(),
        }
    }
}

/// Settings for the HTTP server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory uploaded files are written to
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Largest accepted request body on `/upload`, multipart framing included
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_max_upload_bytes() -> usize {
    32 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Load configuration from `path`, or defaults if the file does not exist
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("No config found at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    log::debug!("Loaded config from {:?}: {:?}", path, config);
    Ok(config)
}
