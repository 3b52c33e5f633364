//! The persistence boundary.
//!
//! The engine never touches durable state except through [`VaultStore`]. The
//! store is the ordering authority: every lifecycle write is a conditional
//! update keyed on the stamps the writer last observed, and every accepted
//! write is announced to the owner's subscribers.

pub mod file;
pub mod memory;
mod records;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::vault::{OwnerId, RevealStamps, Vault, VaultId};

pub use file::FileStore;
pub use memory::MemoryStore;

/// What happened to a vault, as announced to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A change notification. Delivery is at-least-once, so handlers must be
/// idempotent; the notification carries no state and receivers reread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultChange {
    pub vault_id: VaultId,
    pub kind: ChangeKind,
}

/// Storage collaborator for vault records.
///
/// Every call names the acting owner; a record owned by someone else yields
/// `Unauthorized` and is never returned or modified.
#[async_trait]
pub trait VaultStore: Send + Sync + 'static {
    /// Persist a freshly built vault. Fails with `ValidationFailed` when the
    /// record breaks the create contract and `Unauthorized` when `vault.owner`
    /// is not `owner`. Returns the record as stored.
    async fn create(&self, owner: &OwnerId, vault: Vault) -> Result<Vault>;

    async fn get(&self, owner: &OwnerId, id: VaultId) -> Result<Vault>;

    /// All vaults of `owner`, newest first.
    async fn list(&self, owner: &OwnerId) -> Result<Vec<Vault>>;

    /// Replace the stamps with `next` only if they still equal `expected`.
    /// A mismatch is `Conflict`: another writer advanced the state and the
    /// caller must reread before trying again.
    async fn conditional_update(
        &self,
        owner: &OwnerId,
        id: VaultId,
        expected: RevealStamps,
        next: RevealStamps,
    ) -> Result<Vault>;

    async fn delete(&self, owner: &OwnerId, id: VaultId) -> Result<()>;

    /// Change notifications for every vault of `owner`.
    fn subscribe(&self, owner: &OwnerId) -> broadcast::Receiver<VaultChange>;
}

/// Order vaults newest first. Equal creation times fall back to id order so
/// the sequence never shuffles between renders.
pub fn sort_newest_first(vaults: &mut [Vault]) {
    vaults.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}
