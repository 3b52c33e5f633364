pub mod deadline;
pub mod secret;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TimevaultError};
use crate::vault::deadline::Countdown;
use crate::vault::secret::SecretValue;

/// Shortest allowed delay: one second.
pub const MIN_DELAY_SECONDS: u64 = 1;
/// Longest allowed delay: fifty years of 365 days.
pub const MAX_DELAY_SECONDS: u64 = 1_576_800_000;

/// Opaque, immutable vault identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultId(Uuid);

impl VaultId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for VaultId {
    type Err = TimevaultError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| TimevaultError::ValidationFailed(format!("'{}' is not a vault id", s)))
    }
}

/// Identity of the account that owns a vault. Authentication happens upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derived lifecycle status. Never stored; always recomputed from the stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Secured,
    Revealing,
    Revealed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Status::Secured => "secured",
            Status::Revealing => "revealing",
            Status::Revealed => "revealed",
        })
    }
}

/// The two timestamps that drive the lifecycle. Conditional updates compare
/// and replace exactly this pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealStamps {
    pub reveal_requested_at: Option<DateTime<Utc>>,
    pub revealed_at: Option<DateTime<Utc>>,
}

impl RevealStamps {
    pub const SECURED: RevealStamps = RevealStamps {
        reveal_requested_at: None,
        revealed_at: None,
    };

    /// A revealed stamp without a request stamp can never be recorded.
    pub fn is_consistent(&self) -> bool {
        self.revealed_at.is_none() || self.reveal_requested_at.is_some()
    }
}

/// The disclosure unit: one secret behind one delay policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: VaultId,
    pub owner: OwnerId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub secret: SecretValue,
    pub delay_seconds: u64,
    #[serde(default)]
    pub reveal_requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revealed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Bumped by the store on every accepted write; orders competing copies.
    #[serde(default)]
    pub revision: u64,
}

impl Vault {
    pub fn stamps(&self) -> RevealStamps {
        RevealStamps {
            reveal_requested_at: self.reveal_requested_at,
            revealed_at: self.revealed_at,
        }
    }

    pub fn set_stamps(&mut self, stamps: RevealStamps) {
        self.reveal_requested_at = stamps.reveal_requested_at;
        self.revealed_at = stamps.revealed_at;
    }

    pub fn status(&self) -> Status {
        deadline::status(&self.stamps())
    }

    /// Countdown for a vault with an outstanding request; `None` when Secured.
    pub fn countdown(&self, now: DateTime<Utc>) -> Option<Countdown> {
        deadline::remaining(self, now)
    }
}

/// What observers see of a vault at a given instant. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultView {
    pub id: VaultId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub delay_seconds: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal_requested_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_at: Option<DateTime<Utc>>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
    pub ready: bool,
}

impl VaultView {
    pub fn of(vault: &Vault, now: DateTime<Utc>) -> Self {
        let countdown = vault.countdown(now);
        Self {
            id: vault.id,
            title: vault.title.clone(),
            description: vault.description.clone(),
            delay_seconds: vault.delay_seconds,
            created_at: vault.created_at,
            reveal_requested_at: vault.reveal_requested_at,
            revealed_at: vault.revealed_at,
            status: vault.status(),
            seconds_remaining: countdown.map(|c| c.seconds_remaining),
            ready: countdown.map(|c| c.ready).unwrap_or(false),
        }
    }
}

/// Caller-supplied input for creating a vault.
#[derive(Debug, Clone)]
pub struct NewVault {
    pub title: String,
    pub description: Option<String>,
    pub secret: SecretValue,
    pub delay_seconds: u64,
}

impl NewVault {
    pub fn new(title: impl Into<String>, secret: impl Into<String>, delay_seconds: u64) -> Self {
        Self {
            title: title.into(),
            description: None,
            secret: SecretValue::new(secret),
            delay_seconds,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the create-time contract: non-blank title, non-empty secret,
    /// delay within `[MIN_DELAY_SECONDS, MAX_DELAY_SECONDS]`.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(TimevaultError::ValidationFailed(
                "title must not be empty".into(),
            ));
        }
        if self.secret.is_empty() {
            return Err(TimevaultError::ValidationFailed(
                "secret must not be empty".into(),
            ));
        }
        if !(MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS).contains(&self.delay_seconds) {
            return Err(TimevaultError::ValidationFailed(format!(
                "delay must be between {} and {} seconds, got {}",
                MIN_DELAY_SECONDS, MAX_DELAY_SECONDS, self.delay_seconds
            )));
        }
        Ok(())
    }

    /// Validate and build the full entity in one step.
    pub fn into_vault(self, owner: OwnerId, now: DateTime<Utc>) -> Result<Vault> {
        self.validate()?;
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(Vault {
            id: VaultId::generate(),
            owner,
            title: self.title.trim().to_string(),
            description,
            secret: self.secret,
            delay_seconds: self.delay_seconds,
            reveal_requested_at: None,
            revealed_at: None,
            created_at: now,
            revision: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_bounds() {
        assert!(NewVault::new("t", "s", 0).validate().is_err());
        assert!(NewVault::new("t", "s", MIN_DELAY_SECONDS).validate().is_ok());
        assert!(NewVault::new("t", "s", MAX_DELAY_SECONDS).validate().is_ok());
        let err = NewVault::new("t", "s", MAX_DELAY_SECONDS + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, TimevaultError::ValidationFailed(_)));
    }

    #[test]
    fn test_blank_title_and_empty_secret_rejected() {
        assert!(NewVault::new("   ", "s", 10).validate().is_err());
        assert!(NewVault::new("title", "", 10).validate().is_err());
    }

    #[test]
    fn test_into_vault_trims_and_starts_secured() {
        let now = Utc::now();
        let vault = NewVault::new("  bank  ", "pin", 60)
            .with_description("   ")
            .into_vault(OwnerId::new("alice"), now)
            .unwrap();
        assert_eq!(vault.title, "bank");
        assert_eq!(vault.description, None);
        assert_eq!(vault.status(), Status::Secured);
        assert_eq!(vault.created_at, now);
        assert_eq!(vault.stamps(), RevealStamps::SECURED);
    }

    #[test]
    fn test_vault_id_parse() {
        let id = VaultId::generate();
        assert_eq!(id.to_string().parse::<VaultId>().unwrap(), id);
        assert!("not-a-uuid".parse::<VaultId>().is_err());
    }
}
