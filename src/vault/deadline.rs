//! Deadline arithmetic: the single place that answers "is it time yet".
//!
//! Everything here is a pure function of the recorded timestamps, the delay
//! and the caller's `now`, so a countdown survives restarts and reads the same
//! in every session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vault::{RevealStamps, Status, Vault};

/// Remaining wait for a vault with an outstanding reveal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Countdown {
    pub seconds_remaining: u64,
    pub ready: bool,
}

impl Countdown {
    pub const READY: Countdown = Countdown {
        seconds_remaining: 0,
        ready: true,
    };
}

/// Compute the countdown of `vault` at `now`.
///
/// Returns `None` for a Secured vault. A revealed vault is always ready. A
/// request stamped in the future (clock skew between sessions) counts as zero
/// elapsed time.
pub fn remaining(vault: &Vault, now: DateTime<Utc>) -> Option<Countdown> {
    let requested_at = vault.reveal_requested_at?;
    if vault.revealed_at.is_some() {
        return Some(Countdown::READY);
    }

    let elapsed = (now - requested_at).num_seconds().max(0) as u64;
    let seconds_remaining = vault.delay_seconds.saturating_sub(elapsed);
    Some(Countdown {
        seconds_remaining,
        ready: seconds_remaining == 0,
    })
}

/// Derive the lifecycle status from the stamps.
///
/// A vault whose countdown has reached zero stays Revealing until a tick
/// records `revealed_at`.
pub fn status(stamps: &RevealStamps) -> Status {
    match (stamps.reveal_requested_at, stamps.revealed_at) {
        (Some(_), Some(_)) => Status::Revealed,
        (Some(_), None) => Status::Revealing,
        (None, _) => Status::Secured,
    }
}
