//! Encrypted, versioned secret storage for envkeep.
//!
//! Values are sealed with AES-256-GCM and persisted as an append-only log
//! of versions per `(key, project)`. A project's view of the store is the
//! union of its own active versions and the global ones it does not
//! override.

pub mod cache;
pub mod crypto;
pub mod error;
pub mod resolver;
pub mod store;
pub mod types;
pub mod vault;

pub use cache::MaterializedCache;
pub use crypto::EncryptionKey;
pub use error::{Result, VaultError};
pub use store::{connect, DeleteFilter, Dialect, PostgresStore, RecordStore, SqliteStore, Window};
pub use types::{RenameTarget, Scope, SecretVersion, VersionId, VersionRef, VersionStat};
pub use vault::Vault;
