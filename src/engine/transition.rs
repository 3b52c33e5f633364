//! Lifecycle transitions as pure plans.
//!
//! A plan says which stamps a transition expects and which it writes. An
//! illegal transition is not an error: it plans nothing, because concurrent
//! sessions routinely race on the same vault.

use chrono::{DateTime, Utc};

use crate::vault::{RevealStamps, Status, Vault};

/// A caller- or clock-initiated lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Secured -> Revealing. Never restarts a running countdown.
    RequestReveal,
    /// Revealing -> Revealed once the countdown is ready.
    Tick,
    /// Revealing | Revealed -> Secured.
    Hide,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::RequestReveal => "request_reveal",
            Action::Tick => "tick",
            Action::Hide => "hide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    NoOp,
    Write {
        expected: RevealStamps,
        next: RevealStamps,
    },
}

pub fn plan(action: Action, vault: &Vault, now: DateTime<Utc>) -> Plan {
    match action {
        Action::RequestReveal => plan_request_reveal(vault, now),
        Action::Tick => plan_tick(vault, now),
        Action::Hide => plan_hide(vault),
    }
}

pub fn plan_request_reveal(vault: &Vault, now: DateTime<Utc>) -> Plan {
    if vault.status() != Status::Secured {
        return Plan::NoOp;
    }
    Plan::Write {
        expected: vault.stamps(),
        next: RevealStamps {
            reveal_requested_at: Some(now),
            revealed_at: None,
        },
    }
}

/// Record `revealed_at = now` exactly once, and only when the countdown
/// computed at that same `now` is ready.
pub fn plan_tick(vault: &Vault, now: DateTime<Utc>) -> Plan {
    if vault.status() != Status::Revealing {
        return Plan::NoOp;
    }
    match vault.countdown(now) {
        Some(countdown) if countdown.ready => Plan::Write {
            expected: vault.stamps(),
            next: RevealStamps {
                reveal_requested_at: vault.reveal_requested_at,
                revealed_at: Some(now),
            },
        },
        _ => Plan::NoOp,
    }
}

/// Hiding a Revealing vault cancels the countdown.
pub fn plan_hide(vault: &Vault) -> Plan {
    if vault.status() == Status::Secured {
        return Plan::NoOp;
    }
    Plan::Write {
        expected: vault.stamps(),
        next: RevealStamps::SECURED,
    }
}
