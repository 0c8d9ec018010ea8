//! Error types for the secret store.

use thiserror::Error;

/// Errors that can occur during vault operations.
///
/// An absent key is not an error anywhere in this crate: deleting or
/// reading a missing key is a no-op or `None`.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The backend could not be reached or its schema could not be applied.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    /// A multi-statement write could not commit. Retry the whole operation.
    #[error("Transaction failed: {0}")]
    TransactionFailure(String),

    /// Ciphertext did not authenticate under the active key.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// More than one active version exists for one `(key, project)` pair.
    #[error("Integrity violation: {count} active versions of '{key}' in project '{project}'")]
    IntegrityViolation {
        key: String,
        project: String,
        count: u64,
    },

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Configuration error: {0}")]
    Config(#[from] envkeep_core::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl VaultError {
    /// Build a transaction failure from the error that aborted it.
    pub(crate) fn transaction(stage: &str, err: impl std::fmt::Display) -> Self {
        Self::TransactionFailure(format!("{stage}: {err}"))
    }
}

/// Convenience result alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
