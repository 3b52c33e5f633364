use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimevaultError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Rendered without the vault id so the message never confirms existence.
    #[error("Access denied")]
    Unauthorized,

    #[error("Vault not found")]
    NotFound,

    #[error("Concurrent update conflict")]
    Conflict,

    #[error("Vault changed concurrently; please retry")]
    ConflictPersisted,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Vault is sealed: {remaining_seconds}s remaining (request a reveal first if no countdown is running)")]
    Sealed { remaining_seconds: u64 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TimevaultError {
    /// Return a typed exit code for this error category.
    pub fn exit_code(&self) -> i32 {
        match self {
            TimevaultError::ValidationFailed(_) => 2,
            TimevaultError::Unauthorized => 4,
            TimevaultError::NotFound => 3,
            TimevaultError::Conflict => 5,
            TimevaultError::ConflictPersisted => 5,
            TimevaultError::StoreUnavailable(_) => 6,
            TimevaultError::Sealed { .. } => 7,
            TimevaultError::InvalidConfig(_) => 2,
            TimevaultError::Serialization(_) => 1,
            TimevaultError::Io(_) => 1,
            TimevaultError::Other(_) => 1,
        }
    }

    /// Return a string error code identifier.
    pub fn error_code(&self) -> &'static str {
        match self {
            TimevaultError::ValidationFailed(_) => "validation_failed",
            TimevaultError::Unauthorized => "unauthorized",
            TimevaultError::NotFound => "not_found",
            TimevaultError::Conflict => "conflict",
            TimevaultError::ConflictPersisted => "conflict_persisted",
            TimevaultError::StoreUnavailable(_) => "store_unavailable",
            TimevaultError::Sealed { .. } => "sealed",
            TimevaultError::InvalidConfig(_) => "invalid_config",
            TimevaultError::Serialization(_) => "serialization_error",
            TimevaultError::Io(_) => "io_error",
            TimevaultError::Other(_) => "error",
        }
    }

    /// Transient failures leave no committed state and may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TimevaultError::StoreUnavailable(_) | TimevaultError::ConflictPersisted
        )
    }
}

/// JSON error response for --json mode.
#[derive(Serialize)]
pub struct JsonError {
    pub error: JsonErrorDetail,
}

#[derive(Serialize)]
pub struct JsonErrorDetail {
    pub code: String,
    pub message: String,
    pub exit_code: i32,
    /// Retrying the same command may succeed.
    pub transient: bool,
}

impl JsonError {
    pub fn from_error(e: &TimevaultError) -> Self {
        Self {
            error: JsonErrorDetail {
                code: e.error_code().to_string(),
                message: e.to_string(),
                exit_code: e.exit_code(),
                transient: e.is_transient(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, TimevaultError>;
