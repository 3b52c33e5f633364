//! The caller-facing collection of one owner's vaults.
//!
//! [`VaultDirectory`] seeds its local view from the store once, applies
//! commands through the [`RevealStateMachine`], and lets the
//! [`ReconciliationLoop`] fold in everything other sessions do. Local changes
//! stay provisional until the store acknowledges them and are rolled back on
//! any store error.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::engine::machine::{RevealStateMachine, Transition};
use crate::engine::reconcile::{LocalView, ReconciliationLoop, Reconciler, Shared, VaultUpdate};
use crate::engine::transition::{self, Action, Plan};
use crate::error::{Result, TimevaultError};
use crate::store::{sort_newest_first, VaultStore};
use crate::vault::secret::SecretValue;
use crate::vault::{NewVault, OwnerId, Status, Vault, VaultId, VaultView};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Tunables for a directory session.
#[derive(Debug, Clone)]
pub struct DirectoryOptions {
    /// Cadence of countdown ticks while a vault is Revealing.
    pub tick_interval: Duration,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Result of a reveal request.
#[derive(Debug, Clone, Serialize)]
pub struct RevealReceipt {
    #[serde(flatten)]
    pub view: VaultView,
    /// `true` if this call started the countdown, `false` if one was already
    /// running (or the vault was already revealed) and nothing changed.
    pub started: bool,
}

/// One session's view of an owner's vaults.
pub struct VaultDirectory {
    shared: Shared,
    reconciliation: ReconciliationLoop,
}

impl VaultDirectory {
    /// Seed from the store and start reconciling.
    pub async fn open(
        owner: OwnerId,
        store: Arc<dyn VaultStore>,
        clock: Arc<dyn Clock>,
        options: DirectoryOptions,
    ) -> Result<Self> {
        // Subscribe before listing so nothing written in between is missed.
        let changes = store.subscribe(&owner);
        let seeded = store.list(&owner).await?;

        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let mut view = LocalView::new(Reconciler::new(updates, tick_tx, options.tick_interval));
        let now = clock.now();
        let count = seeded.len();
        for vault in seeded {
            view.apply(vault, now);
        }

        let shared = Shared {
            machine: RevealStateMachine::new(owner.clone(), store.clone(), clock.clone()),
            owner,
            store,
            clock,
            view: Arc::new(Mutex::new(view)),
        };
        let reconciliation = ReconciliationLoop::spawn(shared.clone(), changes, tick_rx);
        info!(owner = %shared.owner, vaults = count, "directory opened");

        Ok(Self {
            shared,
            reconciliation,
        })
    }

    /// Validate, persist, and track a new vault.
    pub async fn create(&self, new: NewVault) -> Result<VaultView> {
        let vault = new.into_vault(self.shared.owner.clone(), self.shared.clock.now())?;
        let stored = self.shared.store.create(&self.shared.owner, vault).await?;
        info!(vault_id = %stored.id, delay_seconds = stored.delay_seconds, "vault created");

        let now = self.shared.clock.now();
        let view = VaultView::of(&stored, now);
        self.shared.view.lock().apply(stored, now);
        Ok(view)
    }

    /// Start the countdown. Repeating the request while one is running, or
    /// after the vault is revealed, changes nothing.
    pub async fn request_reveal(&self, id: VaultId) -> Result<RevealReceipt> {
        let t = self.transition(id, Action::RequestReveal).await?;
        Ok(RevealReceipt {
            view: VaultView::of(&t.vault, self.shared.clock.now()),
            started: t.applied,
        })
    }

    /// Re-arm: clear both stamps so the next request runs the full delay.
    pub async fn hide(&self, id: VaultId) -> Result<VaultView> {
        let t = self.transition(id, Action::Hide).await?;
        Ok(VaultView::of(&t.vault, self.shared.clock.now()))
    }

    /// Delete a vault. Its tick schedule stops before the store is asked.
    pub async fn delete(&self, id: VaultId) -> Result<()> {
        let current = self.current(id).await?;
        self.shared.view.lock().suspend(id);

        match self.shared.machine.delete(id).await {
            Ok(()) => {
                self.shared.view.lock().purge(id);
                Ok(())
            }
            Err(TimevaultError::NotFound) => {
                self.shared.view.lock().purge(id);
                Err(TimevaultError::NotFound)
            }
            Err(e) => {
                warn!(vault_id = %id, error = %e, "delete failed, vault reinstated");
                let now = self.shared.clock.now();
                self.shared.view.lock().resume(current, now);
                Err(e)
            }
        }
    }

    /// All vaults, newest first.
    pub fn list(&self) -> Vec<VaultView> {
        let vaults: Vec<Vault> = self.shared.view.lock().vaults().cloned().collect();
        newest_first(vaults, self.shared.clock.now())
    }

    pub async fn get(&self, id: VaultId) -> Result<VaultView> {
        let vault = self.current(id).await?;
        Ok(VaultView::of(&vault, self.shared.clock.now()))
    }

    /// The secret, once the vault is Revealed.
    pub async fn secret(&self, id: VaultId) -> Result<SecretValue> {
        let vault = self.current(id).await?;
        if vault.status() == Status::Revealed {
            info!(vault_id = %id, "secret disclosed");
            return Ok(vault.secret.clone());
        }
        let remaining_seconds = vault
            .countdown(self.shared.clock.now())
            .map(|c| c.seconds_remaining)
            .unwrap_or(vault.delay_seconds);
        Err(TimevaultError::Sealed { remaining_seconds })
    }

    /// Record every due reveal now instead of waiting for the next tick.
    /// Returns how many vaults became Revealed. A vault that fails is logged
    /// and skipped; the rest are still settled.
    pub async fn settle(&self) -> usize {
        let now = self.shared.clock.now();
        let due: Vec<Vault> = self
            .shared
            .view
            .lock()
            .vaults()
            .filter(|v| matches!(transition::plan_tick(v, now), Plan::Write { .. }))
            .cloned()
            .collect();

        let mut revealed = 0;
        for vault in due {
            if self.shared.record_reveal(&vault).await {
                revealed += 1;
            }
        }
        revealed
    }

    /// Reseed the local view from the store.
    pub async fn refresh(&self) -> Result<()> {
        self.shared.resync().await
    }

    /// Current views plus a receiver for every later change, taken atomically
    /// so no update falls between the two.
    pub fn subscribe(&self) -> (Vec<VaultView>, broadcast::Receiver<VaultUpdate>) {
        let (vaults, rx) = {
            let view = self.shared.view.lock();
            let vaults: Vec<Vault> = view.vaults().cloned().collect();
            (vaults, view.subscribe())
        };
        (newest_first(vaults, self.shared.clock.now()), rx)
    }

    /// Whether a countdown schedule is running for `id`.
    pub fn is_ticking(&self, id: VaultId) -> bool {
        self.shared.view.lock().is_scheduled(id)
    }

    /// Stop the loop and every tick schedule.
    pub fn shutdown(&self) {
        self.reconciliation.stop();
        self.shared.view.lock().shutdown();
    }

    /// Local copy if present, otherwise fetched (and thereby authorized)
    /// from the store.
    async fn current(&self, id: VaultId) -> Result<Vault> {
        let local = self.shared.view.lock().get(id).cloned();
        if let Some(vault) = local {
            return Ok(vault);
        }
        let vault = self.shared.store.get(&self.shared.owner, id).await?;
        let now = self.shared.clock.now();
        self.shared.view.lock().apply(vault.clone(), now);
        Ok(vault)
    }

    async fn transition(&self, id: VaultId, action: Action) -> Result<Transition> {
        let current = self.current(id).await?;
        if let Plan::Write { next, .. } = transition::plan(action, &current, self.shared.clock.now()) {
            let mut provisional = current.clone();
            provisional.set_stamps(next);
            self.shared.view.lock().put_provisional(provisional);
        }

        match self.shared.machine.apply(action, &current).await {
            Ok(t) => {
                let now = self.shared.clock.now();
                self.shared.view.lock().apply(t.vault.clone(), now);
                Ok(t)
            }
            Err(e) => {
                warn!(vault_id = %id, action = action.name(), error = %e, "transition failed, rolling back");
                let mut view = self.shared.view.lock();
                if matches!(e, TimevaultError::NotFound) {
                    view.purge(id);
                } else {
                    view.rollback(current);
                }
                Err(e)
            }
        }
    }
}

fn newest_first(mut vaults: Vec<Vault>, now: DateTime<Utc>) -> Vec<VaultView> {
    sort_newest_first(&mut vaults);
    vaults.iter().map(|v| VaultView::of(v, now)).collect()
}

impl Drop for VaultDirectory {
    fn drop(&mut self) {
        self.shared.view.lock().shutdown();
    }
}
