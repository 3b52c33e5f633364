//! Keeps every observer of a vault converged on the same derived status.
//!
//! Two kinds of signal drive reconciliation: store change notifications
//! (another session, or this one, wrote the vault) and per-vault clock ticks
//! that run once per interval while a vault is Revealing. On either signal the
//! `(status, seconds_remaining)` pair is recomputed from the latest record and
//! an update goes out only when the pair differs from the last one emitted.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::engine::machine::RevealStateMachine;
use crate::error::TimevaultError;
use crate::store::{ChangeKind, VaultChange, VaultStore};
use crate::vault::{OwnerId, Status, Vault, VaultId, VaultView};

/// A delta delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultUpdate {
    Changed(VaultView),
    Removed { vault_id: VaultId },
}

impl VaultUpdate {
    pub fn vault_id(&self) -> VaultId {
        match self {
            VaultUpdate::Changed(view) => view.id,
            VaultUpdate::Removed { vault_id } => *vault_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observed {
    status: Status,
    seconds_remaining: Option<u64>,
}

/// Per-vault tick task. Dropping it aborts the task immediately.
struct TickSchedule(JoinHandle<()>);

impl TickSchedule {
    fn start(id: VaultId, period: Duration, ticks: mpsc::UnboundedSender<VaultId>) -> Self {
        Self(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(id).is_err() {
                    return;
                }
            }
        }))
    }
}

impl Drop for TickSchedule {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Emission dedupe plus tick-schedule bookkeeping.
pub(crate) struct Reconciler {
    emitted: HashMap<VaultId, Observed>,
    schedules: HashMap<VaultId, TickSchedule>,
    updates: broadcast::Sender<VaultUpdate>,
    ticks: mpsc::UnboundedSender<VaultId>,
    tick_interval: Duration,
}

impl Reconciler {
    pub(crate) fn new(
        updates: broadcast::Sender<VaultUpdate>,
        ticks: mpsc::UnboundedSender<VaultId>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            emitted: HashMap::new(),
            schedules: HashMap::new(),
            updates,
            ticks,
            tick_interval,
        }
    }

    /// Recompute the observable pair for `vault`, emit it if it changed, and
    /// start or stop the vault's tick schedule to match its status.
    fn reconcile(&mut self, vault: &Vault, now: DateTime<Utc>) -> Option<VaultUpdate> {
        let view = VaultView::of(vault, now);
        self.sync_schedule(vault.id, view.status);

        let observed = Observed {
            status: view.status,
            seconds_remaining: view.seconds_remaining,
        };
        if self.emitted.get(&vault.id) == Some(&observed) {
            return None;
        }
        self.emitted.insert(vault.id, observed);
        debug!(vault_id = %vault.id, status = %view.status, remaining = ?view.seconds_remaining, "emit");
        let update = VaultUpdate::Changed(view);
        let _ = self.updates.send(update.clone());
        Some(update)
    }

    fn sync_schedule(&mut self, id: VaultId, status: Status) {
        let running = self.schedules.contains_key(&id);
        if status == Status::Revealing && !running {
            self.schedules.insert(
                id,
                TickSchedule::start(id, self.tick_interval, self.ticks.clone()),
            );
            info!(vault_id = %id, "countdown schedule started");
        } else if status != Status::Revealing && running {
            self.cancel(id);
        }
    }

    /// Stop the tick schedule for `id`, synchronously.
    fn cancel(&mut self, id: VaultId) {
        if self.schedules.remove(&id).is_some() {
            info!(vault_id = %id, "countdown schedule stopped");
        }
    }

    /// Stop tracking `id` entirely. Emits `Removed` if observers knew it.
    fn forget(&mut self, id: VaultId) -> Option<VaultUpdate> {
        self.cancel(id);
        self.emitted.remove(&id)?;
        let update = VaultUpdate::Removed { vault_id: id };
        let _ = self.updates.send(update.clone());
        Some(update)
    }

    fn is_scheduled(&self, id: VaultId) -> bool {
        self.schedules.contains_key(&id)
    }

    fn cancel_all(&mut self) {
        self.schedules.clear();
    }
}

/// Most tombstones a session keeps; the oldest go first.
const TOMBSTONE_LIMIT: usize = 1024;

/// Ids deleted in this session, in deletion order.
#[derive(Default)]
struct Tombstones {
    ids: HashSet<VaultId>,
    order: VecDeque<VaultId>,
}

impl Tombstones {
    fn contains(&self, id: &VaultId) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: VaultId) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > TOMBSTONE_LIMIT {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, id: &VaultId) {
        if self.ids.remove(id) {
            self.order.retain(|t| t != id);
        }
    }

    fn retain(&mut self, keep: impl Fn(&VaultId) -> bool) {
        self.ids.retain(|id| keep(id));
        let ids = &self.ids;
        self.order.retain(|id| ids.contains(id));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// The session's local copy of its vaults, mutated only by command handlers
/// and by the reconciliation loop.
///
/// Ids deleted in this session are tombstoned so late ticks or slow rereads
/// can never resurrect them. A resync drops the tombstones of ids the store no
/// longer holds, and only the most recent [`TOMBSTONE_LIMIT`] are kept.
pub(crate) struct LocalView {
    vaults: BTreeMap<VaultId, Vault>,
    removed: Tombstones,
    reconciler: Reconciler,
}

impl LocalView {
    pub(crate) fn new(reconciler: Reconciler) -> Self {
        Self {
            vaults: BTreeMap::new(),
            removed: Tombstones::default(),
            reconciler,
        }
    }

    pub(crate) fn get(&self, id: VaultId) -> Option<&Vault> {
        self.vaults.get(&id)
    }

    pub(crate) fn vaults(&self) -> impl Iterator<Item = &Vault> {
        self.vaults.values()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<VaultUpdate> {
        self.reconciler.updates.subscribe()
    }

    pub(crate) fn is_scheduled(&self, id: VaultId) -> bool {
        self.reconciler.is_scheduled(id)
    }

    /// Accept a record read from the store. Older revisions than the local
    /// copy are ignored.
    pub(crate) fn apply(&mut self, vault: Vault, now: DateTime<Utc>) -> bool {
        if self.removed.contains(&vault.id) {
            return false;
        }
        if let Some(local) = self.vaults.get(&vault.id) {
            if local.revision > vault.revision {
                debug!(vault_id = %vault.id, local = local.revision, incoming = vault.revision, "stale copy ignored");
                return false;
            }
        }
        self.reconciler.reconcile(&vault, now);
        self.vaults.insert(vault.id, vault);
        true
    }

    /// Record an unacknowledged local change. Nothing is emitted.
    pub(crate) fn put_provisional(&mut self, vault: Vault) {
        if !self.removed.contains(&vault.id) {
            self.vaults.insert(vault.id, vault);
        }
    }

    /// Undo a provisional change, unless a newer store copy already replaced it.
    pub(crate) fn rollback(&mut self, previous: Vault) {
        let still_ours = self
            .vaults
            .get(&previous.id)
            .map(|local| local.revision == previous.revision)
            .unwrap_or(false);
        if still_ours {
            debug!(vault_id = %previous.id, "provisional change rolled back");
            // A tick may have stopped the schedule while the provisional copy
            // was in place.
            self.reconciler.sync_schedule(previous.id, previous.status());
            self.vaults.insert(previous.id, previous);
        }
    }

    /// Withdraw `id` while its deletion is in flight: the schedule stops now,
    /// observers hear nothing until the store answers.
    pub(crate) fn suspend(&mut self, id: VaultId) -> Option<Vault> {
        self.removed.insert(id);
        self.reconciler.cancel(id);
        self.vaults.remove(&id)
    }

    /// Reinstate a suspended vault after its deletion failed.
    pub(crate) fn resume(&mut self, vault: Vault, now: DateTime<Utc>) {
        self.removed.remove(&vault.id);
        self.apply(vault, now);
    }

    /// Drop `id` for good and tell observers.
    pub(crate) fn purge(&mut self, id: VaultId) {
        self.removed.insert(id);
        self.vaults.remove(&id);
        self.reconciler.forget(id);
    }

    /// Re-emit `id` if its observable pair moved (e.g. the countdown advanced).
    pub(crate) fn refresh(&mut self, id: VaultId, now: DateTime<Utc>) {
        if let Some(vault) = self.vaults.get(&id) {
            self.reconciler.reconcile(vault, now);
        }
    }

    /// The vault a tick for `id` should act on, if it is still Revealing.
    /// A tick for anything else is stale; its schedule is stopped.
    pub(crate) fn tick_target(&mut self, id: VaultId) -> Option<Vault> {
        match self.vaults.get(&id) {
            Some(vault) if vault.status() == Status::Revealing => Some(vault.clone()),
            _ => {
                self.reconciler.cancel(id);
                None
            }
        }
    }

    /// Forget tombstones for ids absent from `live`, a fresh store listing.
    fn prune_tombstones(&mut self, live: &HashSet<VaultId>) {
        self.removed.retain(|id| live.contains(id));
    }

    pub(crate) fn shutdown(&mut self) {
        self.reconciler.cancel_all();
    }
}

/// Everything the loop and the command handlers share.
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) owner: OwnerId,
    pub(crate) store: Arc<dyn VaultStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) machine: RevealStateMachine,
    pub(crate) view: Arc<Mutex<LocalView>>,
}

impl Shared {
    /// Reread a vault the store says changed and adopt the store's copy.
    pub(crate) async fn on_store_change(&self, change: VaultChange) {
        if change.kind == ChangeKind::Deleted {
            self.view.lock().purge(change.vault_id);
            return;
        }
        match self.store.get(&self.owner, change.vault_id).await {
            Ok(vault) => {
                let now = self.clock.now();
                self.view.lock().apply(vault, now);
            }
            Err(TimevaultError::NotFound) | Err(TimevaultError::Unauthorized) => {
                self.view.lock().purge(change.vault_id);
            }
            Err(e) => {
                warn!(vault_id = %change.vault_id, error = %e, "reread after change failed");
            }
        }
    }

    /// Advance one Revealing vault: record the reveal when ready, otherwise
    /// just re-emit the countdown.
    pub(crate) async fn on_tick(&self, id: VaultId) {
        let target = self.view.lock().tick_target(id);
        let Some(vault) = target else {
            return;
        };

        let now = self.clock.now();
        let ready = vault.countdown(now).map(|c| c.ready).unwrap_or(false);
        if !ready {
            self.view.lock().refresh(id, now);
            return;
        }

        self.record_reveal(&vault).await;
    }

    /// Record the reveal of a ready vault and adopt the store's answer.
    /// Returns whether this call wrote `revealed_at`. A vault that is gone or
    /// no longer ours is purged; any other failure leaves it for a later try.
    pub(crate) async fn record_reveal(&self, vault: &Vault) -> bool {
        match self.machine.tick(vault).await {
            Ok(t) => {
                let now = self.clock.now();
                self.view.lock().apply(t.vault, now);
                t.applied
            }
            Err(TimevaultError::NotFound) | Err(TimevaultError::Unauthorized) => {
                self.view.lock().purge(vault.id);
                false
            }
            Err(e) => {
                warn!(vault_id = %vault.id, error = %e, "reveal not recorded");
                false
            }
        }
    }

    /// Reseed the whole view from the store.
    pub(crate) async fn resync(&self) -> crate::error::Result<()> {
        let vaults = self.store.list(&self.owner).await?;
        let now = self.clock.now();
        let mut view = self.view.lock();
        let live: HashSet<VaultId> = vaults.iter().map(|v| v.id).collect();
        let gone: Vec<VaultId> = view
            .vaults()
            .map(|v| v.id)
            .filter(|id| !live.contains(id))
            .collect();
        for id in gone {
            view.purge(id);
        }
        view.prune_tombstones(&live);
        for vault in vaults {
            view.apply(vault, now);
        }
        Ok(())
    }
}

/// Background task that feeds store notifications and clock ticks into the
/// shared view.
pub struct ReconciliationLoop {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl ReconciliationLoop {
    pub(crate) fn spawn(
        shared: Shared,
        mut changes: broadcast::Receiver<VaultChange>,
        mut ticks: mpsc::UnboundedReceiver<VaultId>,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(owner = %shared.owner, "reconciliation loop started");
            let mut store_open = true;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("reconciliation loop shutting down");
                        return;
                    }
                    change = changes.recv(), if store_open => match change {
                        Ok(change) => shared.on_store_change(change).await,
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "change notifications dropped, resyncing");
                            if let Err(e) = shared.resync().await {
                                warn!(error = %e, "resync failed");
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("store notification stream closed");
                            store_open = false;
                        }
                    },
                    Some(id) = ticks.recv() => shared.on_tick(id).await,
                }
            }
        });

        Self { handle, shutdown }
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
        self.handle.abort();
    }
}

impl Drop for ReconciliationLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
