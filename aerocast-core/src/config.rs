use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use crate::{
    aggregate::YearRange,
    error::AeroError,
    provider::power::{DEFAULT_BASE_URL, DEFAULT_COMMUNITY},
};

pub const DEFAULT_BIND: &str = "127.0.0.1:3001";

/// Where the daily series comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// POWER user community; affects units of a few parameters.
    pub community: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            community: DEFAULT_COMMUNITY.to_string(),
            timeout_secs: 60,
        }
    }
}

/// In-memory series cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: false, ttl_secs: 3600, capacity: 64 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// bind = "127.0.0.1:3001"
///
/// [upstream]
/// base_url = "https://power.larc.nasa.gov"
///
/// [cache]
/// enabled = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub upstream: UpstreamConfig,
    pub years: YearRange,
    pub cache: CacheConfig,
    /// Fixes the prediction perturbation sequence when set.
    pub jitter_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            upstream: UpstreamConfig::default(),
            years: YearRange::default(),
            cache: CacheConfig::default(),
            jitter_seed: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "aerocast", "aerocast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AeroError> {
        self.bind
            .parse()
            .map_err(|_| AeroError::Config(format!("bind address '{}' is not host:port", self.bind)))
    }

    pub fn validate(&self) -> Result<(), AeroError> {
        self.bind_addr()?;

        if self.years.start > self.years.end {
            return Err(AeroError::Config(format!(
                "year range {}..{} is empty",
                self.years.start, self.years.end
            )));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(AeroError::Config("upstream timeout must be positive".to_string()));
        }
        if !self.upstream.base_url.starts_with("http://")
            && !self.upstream.base_url.starts_with("https://")
        {
            return Err(AeroError::Config(format!(
                "upstream base_url '{}' must be an http(s) URL",
                self.upstream.base_url
            )));
        }

        Ok(())
    }
}
