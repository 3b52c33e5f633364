pub mod common;
pub mod config;
pub mod create;
pub mod delete;
pub mod get;
pub mod hide;
pub mod json_output;
pub mod list;
pub mod reveal;
pub mod show;
pub mod watch;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "timevault",
    version,
    about = "Time-locked secrets: readable only after a delay you choose"
)]
pub struct Cli {
    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ~/.timevault/timevault.toml)
    #[arg(long, global = true, env = "TIMEVAULT_CONFIG")]
    pub config: Option<String>,

    /// Act as this owner
    #[arg(long, global = true, env = "TIMEVAULT_OWNER")]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a vault (reads the secret from stdin)
    Create {
        /// Display title
        #[arg(long)]
        title: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Waiting period after a reveal request (e.g. "90s", "2h", "7d", or seconds)
        #[arg(long)]
        delay: String,
    },

    /// List vaults, newest first
    List,

    /// Show one vault's status
    Show {
        /// Vault id
        id: String,
    },

    /// Request disclosure and start the countdown
    Reveal {
        /// Vault id
        id: String,
    },

    /// Print the secret of a revealed vault
    Get {
        /// Vault id
        id: String,
    },

    /// Re-arm a vault: clear the request and hide the secret again
    Hide {
        /// Vault id
        id: String,
    },

    /// Delete a vault permanently
    Delete {
        /// Vault id
        id: String,
    },

    /// Follow countdowns until they finish (Ctrl-C to stop)
    Watch {
        /// Only follow this vault
        id: Option<String>,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
}
