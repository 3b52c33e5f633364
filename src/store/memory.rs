use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{Result, TimevaultError};
use crate::store::records::{self, ChangeFeed, Records};
use crate::store::{ChangeKind, VaultChange, VaultStore};
use crate::vault::{OwnerId, RevealStamps, Vault, VaultId};

struct Inner {
    vaults: Records,
    available: bool,
}

/// In-process store with real conditional-update semantics.
///
/// All sessions sharing one `MemoryStore` (via `Arc`) observe the same records
/// and receive each other's change notifications.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    feed: ChangeFeed,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                vaults: Records::new(),
                available: true,
            }),
            feed: ChangeFeed::default(),
        }
    }

    /// Simulate a backend outage: while unavailable every call fails with
    /// `StoreUnavailable` and nothing changes.
    pub fn set_available(&self, available: bool) {
        self.inner.lock().available = available;
    }

    /// Number of records across all owners.
    pub fn len(&self) -> usize {
        self.inner.lock().vaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_available(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.inner.lock();
        if !inner.available {
            return Err(TimevaultError::StoreUnavailable(
                "backend is not reachable".into(),
            ));
        }
        Ok(inner)
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    async fn create(&self, owner: &OwnerId, vault: Vault) -> Result<Vault> {
        let mut inner = self.lock_available()?;
        let stored = records::insert(&mut inner.vaults, owner, vault)?;
        self.feed.notify(owner, stored.id, ChangeKind::Created);
        debug!(vault_id = %stored.id, owner = %owner, "store: created");
        Ok(stored)
    }

    async fn get(&self, owner: &OwnerId, id: VaultId) -> Result<Vault> {
        let inner = self.lock_available()?;
        records::owned(&inner.vaults, owner, id).cloned()
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Vault>> {
        let inner = self.lock_available()?;
        Ok(records::list(&inner.vaults, owner))
    }

    async fn conditional_update(
        &self,
        owner: &OwnerId,
        id: VaultId,
        expected: RevealStamps,
        next: RevealStamps,
    ) -> Result<Vault> {
        let mut inner = self.lock_available()?;
        let updated =
            match records::compare_and_set(&mut inner.vaults, owner, id, expected, next) {
                Ok(updated) => updated,
                Err(TimevaultError::Conflict) => {
                    debug!(vault_id = %id, "store: conditional update conflict");
                    return Err(TimevaultError::Conflict);
                }
                Err(e) => return Err(e),
            };
        self.feed.notify(owner, id, ChangeKind::Updated);
        debug!(vault_id = %id, revision = updated.revision, "store: updated");
        Ok(updated)
    }

    async fn delete(&self, owner: &OwnerId, id: VaultId) -> Result<()> {
        let mut inner = self.lock_available()?;
        records::remove(&mut inner.vaults, owner, id)?;
        self.feed.notify(owner, id, ChangeKind::Deleted);
        debug!(vault_id = %id, "store: deleted");
        Ok(())
    }

    fn subscribe(&self, owner: &OwnerId) -> broadcast::Receiver<VaultChange> {
        self.feed.subscribe(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::NewVault;
    use chrono::Utc;

    fn owner() -> OwnerId {
        OwnerId::new("alice")
    }

    fn fresh(title: &str) -> Vault {
        NewVault::new(title, "secret", 30)
            .into_vault(owner(), Utc::now())
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new();
        let v = store.create(&owner(), fresh("a")).await.unwrap();
        let got = store.get(&owner(), v.id).await.unwrap();
        assert_eq!(got, v);
    }

    #[tokio::test]
    async fn test_foreign_owner_is_unauthorized() {
        let store = MemoryStore::new();
        let v = store.create(&owner(), fresh("a")).await.unwrap();
        let mallory = OwnerId::new("mallory");

        assert!(matches!(
            store.get(&mallory, v.id).await,
            Err(TimevaultError::Unauthorized)
        ));
        assert!(matches!(
            store.delete(&mallory, v.id).await,
            Err(TimevaultError::Unauthorized)
        ));
        assert!(matches!(
            store.create(&mallory, fresh("b")).await,
            Err(TimevaultError::Unauthorized)
        ));
        assert!(store.list(&mallory).await.unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_record() {
        let store = MemoryStore::new();
        let mut v = fresh("a");
        v.delay_seconds = 0;
        assert!(matches!(
            store.create(&owner(), v).await,
            Err(TimevaultError::ValidationFailed(_))
        ));

        let mut v = fresh("a");
        v.reveal_requested_at = Some(Utc::now());
        assert!(matches!(
            store.create(&owner(), v).await,
            Err(TimevaultError::ValidationFailed(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_conditional_update_conflicts_on_stale_expectation() {
        let store = MemoryStore::new();
        let v = store.create(&owner(), fresh("a")).await.unwrap();
        let requested = RevealStamps {
            reveal_requested_at: Some(Utc::now()),
            revealed_at: None,
        };

        let first = store
            .conditional_update(&owner(), v.id, RevealStamps::SECURED, requested)
            .await
            .unwrap();
        assert_eq!(first.revision, 1);

        let second = store
            .conditional_update(
                &owner(),
                v.id,
                RevealStamps::SECURED,
                RevealStamps {
                    reveal_requested_at: Some(Utc::now() + chrono::Duration::seconds(9)),
                    revealed_at: None,
                },
            )
            .await;
        assert!(matches!(second, Err(TimevaultError::Conflict)));
        assert_eq!(store.get(&owner(), v.id).await.unwrap().stamps(), requested);
    }

    #[tokio::test]
    async fn test_inconsistent_stamps_rejected() {
        let store = MemoryStore::new();
        let v = store.create(&owner(), fresh("a")).await.unwrap();
        let bad = RevealStamps {
            reveal_requested_at: None,
            revealed_at: Some(Utc::now()),
        };
        assert!(store
            .conditional_update(&owner(), v.id, RevealStamps::SECURED, bad)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unavailable_changes_nothing() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.create(&owner(), fresh("a")).await,
            Err(TimevaultError::StoreUnavailable(_))
        ));
        store.set_available(true);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_owner_changes_only() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe(&owner());
        let mut other = store.subscribe(&OwnerId::new("bob"));

        let v = store.create(&owner(), fresh("a")).await.unwrap();
        store.delete(&owner(), v.id).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            VaultChange {
                vault_id: v.id,
                kind: ChangeKind::Created
            }
        );
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Deleted);
        assert!(other.try_recv().is_err());
    }
}
