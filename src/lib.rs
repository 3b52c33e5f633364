//! Timevault: time-locked secrets.
//!
//! A vault holds one secret behind a delay. Nothing can be read until the
//! owner explicitly requests disclosure and the delay has fully elapsed since
//! that request. Hiding a revealed vault re-arms it. The library exposes the
//! engine (deadline arithmetic, the reveal state machine, cross-session
//! reconciliation), the caller-facing [`directory::VaultDirectory`], and the
//! store boundary with in-memory and file-backed implementations. The CLI is
//! gated behind the `cli` feature and is private to the binary.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use timevault::clock::SystemClock;
//! use timevault::directory::{DirectoryOptions, VaultDirectory};
//! use timevault::store::MemoryStore;
//! use timevault::vault::{NewVault, OwnerId};
//!
//! # async fn demo() -> timevault::error::Result<()> {
//! let dir = VaultDirectory::open(
//!     OwnerId::new("alice"),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SystemClock::new()),
//!     DirectoryOptions::default(),
//! )
//! .await?;
//! let vault = dir.create(NewVault::new("bank", "hunter2", 3600)).await?;
//! let receipt = dir.request_reveal(vault.id).await?;
//! assert!(receipt.started);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod store;
pub mod vault;
