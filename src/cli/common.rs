use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use timevault::clock::SystemClock;
use timevault::config::{self, Config};
use timevault::directory::VaultDirectory;
use timevault::error::{Result, TimevaultError};
use timevault::store::FileStore;
use timevault::vault::{OwnerId, VaultId};

use crate::cli::Cli;

/// Everything a command handler needs from the global flags.
pub struct Context {
    pub json: bool,
    pub config: Config,
    pub owner: OwnerId,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(p) => p.into(),
            None => config::config_path()?,
        };
        let config = Config::load(&config_path)?;
        let owner = config.resolve_owner(cli.owner.as_deref());
        Ok(Self {
            json: cli.json,
            config,
            owner,
        })
    }

    /// Open the file store and a directory session over it, recording any
    /// reveal that came due while no process was running.
    pub async fn open_directory(&self) -> Result<VaultDirectory> {
        let store = FileStore::open(self.config.store_path()?)?;
        let directory = VaultDirectory::open(
            self.owner.clone(),
            Arc::new(store),
            Arc::new(SystemClock::new()),
            self.config.directory_options(),
        )
        .await?;
        let revealed = directory.settle().await;
        if revealed > 0 {
            debug!(revealed, "recorded reveals that came due offline");
        }
        Ok(directory)
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the config level.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn parse_id(id: &str) -> Result<VaultId> {
    id.parse()
}

/// Parse a delay like "90s", "2h 30m", "7d", or a bare number of seconds.
pub fn parse_delay(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| TimevaultError::ValidationFailed(format!("Invalid delay '{}': {}", s, e)))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out =
        serde_json::to_string(value).map_err(|e| TimevaultError::Serialization(e.to_string()))?;
    println!("{}", out);
    Ok(())
}

/// Human form of a remaining-seconds count.
pub fn format_remaining(secs: u64) -> String {
    humantime::format_duration(std::time::Duration::from_secs(secs)).to_string()
}
