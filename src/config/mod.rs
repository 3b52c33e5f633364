use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::directory::DirectoryOptions;
use crate::error::{Result, TimevaultError};
use crate::vault::OwnerId;

const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Configuration file format (~/.timevault/timevault.toml).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Store file location. Defaults to ~/.timevault/vaults.db
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Owner identity used when --owner / TIMEVAULT_OWNER are not given.
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Countdown tick cadence in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// tracing filter directive, e.g. "info" or "timevault=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load config from a path. Returns default config if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| TimevaultError::InvalidConfig(e.to_string()))?;
        if config.engine.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(TimevaultError::InvalidConfig(format!(
                "engine.tick_interval_ms must be at least {}",
                MIN_TICK_INTERVAL_MS
            )));
        }
        Ok(config)
    }

    /// Save config to a path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TimevaultError::Serialization(format!("config: {}", e)))?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Configured store path, or the default under the timevault directory.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(timevault_dir()?.join("vaults.db")),
        }
    }

    /// Owner precedence: explicit value, config file, $USER, then "local".
    pub fn resolve_owner(&self, explicit: Option<&str>) -> OwnerId {
        explicit
            .map(str::to_string)
            .or_else(|| self.session.owner.clone())
            .or_else(|| std::env::var("USER").ok())
            .filter(|o| !o.trim().is_empty())
            .map(OwnerId::new)
            .unwrap_or_else(|| OwnerId::new("local"))
    }

    pub fn directory_options(&self) -> DirectoryOptions {
        DirectoryOptions {
            tick_interval: Duration::from_millis(self.engine.tick_interval_ms),
        }
    }
}

/// The timevault directory (~/.timevault).
pub fn timevault_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".timevault"))
        .ok_or_else(|| TimevaultError::Other("Could not determine home directory".into()))
}

/// Default config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(timevault_dir()?.join("timevault.toml"))
}
