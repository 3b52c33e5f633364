//! Record-set rules every store applies: ownership, the create contract and
//! the compare-and-set on reveal stamps. Stores own the locking and the
//! durability around these.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{Result, TimevaultError};
use crate::store::{sort_newest_first, ChangeKind, VaultChange};
use crate::vault::{NewVault, OwnerId, RevealStamps, Vault, VaultId};

const CHANNEL_CAPACITY: usize = 256;

pub(crate) type Records = HashMap<VaultId, Vault>;

pub(crate) fn owned<'a>(records: &'a Records, owner: &OwnerId, id: VaultId) -> Result<&'a Vault> {
    let vault = records.get(&id).ok_or(TimevaultError::NotFound)?;
    if vault.owner != *owner {
        return Err(TimevaultError::Unauthorized);
    }
    Ok(vault)
}

pub(crate) fn list(records: &Records, owner: &OwnerId) -> Vec<Vault> {
    let mut vaults: Vec<Vault> = records
        .values()
        .filter(|v| v.owner == *owner)
        .cloned()
        .collect();
    sort_newest_first(&mut vaults);
    vaults
}

pub(crate) fn insert(records: &mut Records, owner: &OwnerId, vault: Vault) -> Result<Vault> {
    if vault.owner != *owner {
        return Err(TimevaultError::Unauthorized);
    }
    validate_record(&vault)?;
    if records.contains_key(&vault.id) {
        return Err(TimevaultError::Conflict);
    }
    records.insert(vault.id, vault.clone());
    Ok(vault)
}

/// Swap the stamps for `next` if they still equal `expected`, bumping the
/// revision.
pub(crate) fn compare_and_set(
    records: &mut Records,
    owner: &OwnerId,
    id: VaultId,
    expected: RevealStamps,
    next: RevealStamps,
) -> Result<Vault> {
    let mut updated = owned(records, owner, id)?.clone();
    if updated.stamps() != expected {
        return Err(TimevaultError::Conflict);
    }
    if !next.is_consistent() {
        return Err(TimevaultError::ValidationFailed(
            "revealed_at requires reveal_requested_at".into(),
        ));
    }
    updated.set_stamps(next);
    updated.revision += 1;
    records.insert(id, updated.clone());
    Ok(updated)
}

pub(crate) fn remove(records: &mut Records, owner: &OwnerId, id: VaultId) -> Result<()> {
    owned(records, owner, id)?;
    records.remove(&id);
    Ok(())
}

fn validate_record(vault: &Vault) -> Result<()> {
    NewVault {
        title: vault.title.clone(),
        description: vault.description.clone(),
        secret: vault.secret.clone(),
        delay_seconds: vault.delay_seconds,
    }
    .validate()?;
    if vault.stamps() != RevealStamps::SECURED {
        return Err(TimevaultError::ValidationFailed(
            "a new vault must start secured".into(),
        ));
    }
    Ok(())
}

/// Per-owner broadcast channels for change notifications.
#[derive(Default)]
pub(crate) struct ChangeFeed {
    channels: Mutex<HashMap<OwnerId, broadcast::Sender<VaultChange>>>,
}

impl ChangeFeed {
    pub(crate) fn subscribe(&self, owner: &OwnerId) -> broadcast::Receiver<VaultChange> {
        self.channels
            .lock()
            .entry(owner.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub(crate) fn notify(&self, owner: &OwnerId, vault_id: VaultId, kind: ChangeKind) {
        if let Some(tx) = self.channels.lock().get(owner) {
            // No receivers is fine; nobody is watching.
            let _ = tx.send(VaultChange { vault_id, kind });
        }
    }
}
