//! Persistence of secret versions.
//!
//! The [`RecordStore`] trait is the only way the rest of the crate touches
//! the database. Two backends implement it: an embedded SQLite file and a
//! PostgreSQL server, selected by [`connect`].

use std::sync::Arc;

use async_trait::async_trait;
use envkeep_core::BackendDriver;
use tracing::debug;

use crate::error::{Result, VaultError};
use crate::types::{ActiveRow, NewVersion, Replacement, Scope, SecretVersion, VersionRef, VersionStat};

mod postgres;
pub mod query;
mod shared;
mod sqlite;

pub use postgres::PostgresStore;
pub use query::{DeleteFilter, Dialect, Window};
pub use sqlite::SqliteStore;

/// Row-level primitives over the `environments` table.
///
/// Every method is a single statement or a single transaction. Callers
/// compose them; no method retries on failure.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Create the table and indexes if they do not exist.
    async fn ensure_schema(&self) -> Result<()>;

    /// Deprecate the active row of `(version.key, version.project)` and
    /// insert `version` as the new active row, atomically.
    ///
    /// Returns how many rows were deprecated (0 or 1).
    async fn supersede(&self, version: &NewVersion) -> Result<u64>;

    /// Replace each listed active row by its new version in one transaction.
    ///
    /// Fails with [`VaultError::TransactionFailure`] and writes nothing if any
    /// replaced row is no longer active.
    async fn supersede_all(&self, replacements: &[Replacement]) -> Result<()>;

    /// Active rows of exactly one scope, in case-insensitive key order.
    async fn select_active(&self, project: &Scope) -> Result<Vec<ActiveRow>>;

    /// Active rows of every scope, ordered by project then key.
    async fn select_all_active(&self) -> Result<Vec<ActiveRow>>;

    async fn find_active(&self, key: &str, project: &Scope) -> Result<Option<ActiveRow>>;

    /// Hard-delete rows matching `filter`, returning what was removed.
    async fn delete_matching(&self, filter: &DeleteFilter) -> Result<Vec<VersionRef>>;

    /// Deprecated rows of one scope, newest first, restricted to `window`.
    async fn select_deprecated_ordered(
        &self,
        project: &Scope,
        window: Window,
    ) -> Result<Vec<VersionRef>>;

    /// Delete the deprecated rows of a scope beyond the `keep` newest.
    async fn prune_deprecated(&self, project: &Scope, keep: u32) -> Result<Vec<VersionRef>>;

    /// Delete every row of a scope beyond the `keep` newest, active or not.
    async fn clear_scope(&self, project: &Scope, keep: u32) -> Result<Vec<VersionRef>>;

    /// Rewrite `key` on every row of `(previous, project)`.
    async fn rename_key(&self, previous: &str, next: &str, project: &Scope) -> Result<u64>;

    /// Move every row of project `previous` to project `next`. Global rows
    /// are never moved.
    async fn rename_project(&self, previous: &str, next: &str) -> Result<u64>;

    /// Versions of one key in one scope, newest first.
    async fn versions(
        &self,
        key: &str,
        project: &Scope,
        include_deprecated: bool,
    ) -> Result<Vec<SecretVersion>>;

    /// Version counts per key for the scope that owns each key as seen
    /// from `project`.
    async fn stats(&self, project: &Scope) -> Result<Vec<VersionStat>>;

    /// Release the connection pool.
    async fn close(&self);
}

/// Open the backend selected by `driver` and apply the schema.
pub async fn connect(driver: BackendDriver, connection_string: &str) -> Result<Arc<dyn RecordStore>> {
    debug!(driver = %driver, "opening record store");

    let store: Arc<dyn RecordStore> = match driver {
        BackendDriver::Sqlite => Arc::new(SqliteStore::connect(connection_string).await?),
        BackendDriver::Postgres => Arc::new(PostgresStore::connect(connection_string).await?),
    };

    store.ensure_schema().await?;
    Ok(store)
}

/// Engine codes for a writer that lost a race: SQLite `BUSY` and its
/// extended forms, PostgreSQL serialization failure and deadlock.
const CONTENTION_CODES: &[&str] = &["5", "261", "517", "40001", "40P01"];

/// Map an error raised inside a write transaction.
///
/// A unique violation means another writer activated the same
/// `(key, project)` first, and a busy or serialization error means the
/// engine refused to interleave two writers. Either way the caller has to
/// retry the whole operation.
pub(crate) fn write_error(stage: &str, err: sqlx::Error) -> VaultError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => VaultError::transaction(stage, db),
        sqlx::Error::Database(db)
            if db
                .code()
                .is_some_and(|code| CONTENTION_CODES.iter().any(|c| *c == code)) =>
        {
            VaultError::transaction(stage, db)
        }
        _ => VaultError::Database(err),
    }
}

/// Reject a deprecate that touched more than one active row.
pub(crate) fn check_deprecated(key: &str, project: &Scope, affected: u64) -> Result<()> {
    if affected > 1 {
        tracing::error!(
            key = %key,
            project = %project,
            affected,
            "multiple active versions found while superseding"
        );
        return Err(VaultError::IntegrityViolation {
            key: key.to_string(),
            project: project.to_string(),
            count: affected,
        });
    }
    Ok(())
}
