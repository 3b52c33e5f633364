use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::engine::transition::{self, Action, Plan};
use crate::error::{Result, TimevaultError};
use crate::store::VaultStore;
use crate::vault::{OwnerId, Vault, VaultId};

/// Outcome of a transition attempt.
#[derive(Debug, Clone)]
pub struct Transition {
    /// The authoritative record after the attempt.
    pub vault: Vault,
    /// Whether this call wrote the change; `false` means it was already in
    /// effect (or illegal from the current state) and nothing was written.
    pub applied: bool,
}

/// Applies lifecycle transitions for one owner through conditional store
/// writes.
///
/// The store decides races. On `Conflict` the machine rereads the record,
/// replans against it, and tries once more; a second conflict surfaces as
/// `ConflictPersisted`.
#[derive(Clone)]
pub struct RevealStateMachine {
    owner: OwnerId,
    store: Arc<dyn VaultStore>,
    clock: Arc<dyn Clock>,
}

impl RevealStateMachine {
    pub fn new(owner: OwnerId, store: Arc<dyn VaultStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            owner,
            store,
            clock,
        }
    }

    pub async fn request_reveal(&self, current: &Vault) -> Result<Transition> {
        self.apply(Action::RequestReveal, current).await
    }

    pub async fn tick(&self, current: &Vault) -> Result<Transition> {
        self.apply(Action::Tick, current).await
    }

    pub async fn hide(&self, current: &Vault) -> Result<Transition> {
        self.apply(Action::Hide, current).await
    }

    pub async fn delete(&self, id: VaultId) -> Result<()> {
        self.store.delete(&self.owner, id).await?;
        info!(vault_id = %id, "vault deleted");
        Ok(())
    }

    /// Plan `action` against `current` and commit it.
    pub async fn apply(&self, action: Action, current: &Vault) -> Result<Transition> {
        if current.owner != self.owner {
            return Err(TimevaultError::Unauthorized);
        }

        match self.attempt(action, current.clone()).await? {
            Attempt::Done(t) => Ok(t),
            Attempt::Conflicted => {
                debug!(vault_id = %current.id, action = action.name(), "conflict, rereading");
                let fresh = self.store.get(&self.owner, current.id).await?;
                match self.attempt(action, fresh).await? {
                    Attempt::Done(t) => Ok(t),
                    Attempt::Conflicted => {
                        warn!(vault_id = %current.id, action = action.name(), "conflict persisted after retry");
                        Err(TimevaultError::ConflictPersisted)
                    }
                }
            }
        }
    }

    async fn attempt(&self, action: Action, vault: Vault) -> Result<Attempt> {
        let now = self.clock.now();
        let (expected, next) = match transition::plan(action, &vault, now) {
            Plan::NoOp => {
                debug!(vault_id = %vault.id, action = action.name(), status = %vault.status(), "no-op");
                return Ok(Attempt::Done(Transition {
                    vault,
                    applied: false,
                }));
            }
            Plan::Write { expected, next } => (expected, next),
        };

        match self
            .store
            .conditional_update(&self.owner, vault.id, expected, next)
            .await
        {
            Ok(updated) => {
                info!(
                    vault_id = %updated.id,
                    action = action.name(),
                    status = %updated.status(),
                    revision = updated.revision,
                    "transition applied"
                );
                Ok(Attempt::Done(Transition {
                    vault: updated,
                    applied: true,
                }))
            }
            Err(TimevaultError::Conflict) => Ok(Attempt::Conflicted),
            Err(e) => Err(e),
        }
    }
}

enum Attempt {
    Done(Transition),
    Conflicted,
}
