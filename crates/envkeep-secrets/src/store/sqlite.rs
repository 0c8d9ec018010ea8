//! Embedded SQLite backend.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, instrument};

use super::query::{self, ActiveRecord, StatRecord, VersionRecord, VersionRefRecord};
use super::shared::impl_record_store;
use super::{check_deprecated, write_error, DeleteFilter, Dialect, RecordStore, Window};
use crate::error::{Result, VaultError};
use crate::types::{ActiveRow, NewVersion, Replacement, Scope, SecretVersion, VersionRef, VersionStat};

/// Record store over a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database named by `connection_string`.
    ///
    /// Accepts a plain file path, a `sqlite:` URL, or `:memory:`. A plain
    /// path gets its parent directory and file created when missing.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let in_memory = connection_string.contains(":memory:");

        let options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(VaultError::StoreUnavailable)?
        } else if connection_string.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(connection_string)
                .map_err(VaultError::StoreUnavailable)?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        } else {
            let path = Path::new(connection_string);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| VaultError::StoreUnavailable(sqlx::Error::Io(e)))?;
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        let options = options.busy_timeout(Duration::from_secs(5));

        // Each connection to `:memory:` is its own database.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(VaultError::StoreUnavailable)?;

        debug!(in_memory, "connected to sqlite");
        Ok(Self { pool })
    }
}

impl_record_store!(SqliteStore, Sqlite, Dialect::Sqlite);

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("envkeep.db");
        let store = SqliteStore::connect(path.to_str().unwrap()).await.unwrap();
        store.ensure_schema().await.unwrap();
        (dir, store)
    }

    fn project() -> Scope {
        Scope::Project("test".to_string())
    }

    async fn set(store: &SqliteStore, key: &str, project: Scope, value: &str) -> NewVersion {
        let version = NewVersion::new(key, project, value.to_string());
        store.supersede(&version).await.unwrap();
        version
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let (_dir, store) = open().await;
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = SqliteStore::connect(":memory:").await.unwrap();
        store.ensure_schema().await.unwrap();
        set(&store, "K", Scope::Global, "v").await;
        assert_eq!(store.select_active(&Scope::Global).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_supersede_keeps_single_active_version() {
        let (_dir, store) = open().await;

        let first = NewVersion::new("KEY", project(), "one".to_string());
        assert_eq!(store.supersede(&first).await.unwrap(), 0);
        let second = NewVersion::new("KEY", project(), "two".to_string());
        assert_eq!(store.supersede(&second).await.unwrap(), 1);

        let active = store.versions("KEY", &project(), false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].ciphertext, "two");

        let all = store.versions("KEY", &project(), true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].version_id, second.version_id);
        assert!(all[1].deprecated);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_second_active_row() {
        let (_dir, store) = open().await;
        set(&store, "KEY", project(), "one").await;

        let result = sqlx::query(query::INSERT_VERSION)
            .bind("manual-id")
            .bind("KEY")
            .bind("two")
            .bind("test")
            .execute(&store.pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_late_insert_maps_to_transaction_failure() {
        let (_dir, store) = open().await;
        set(&store, "KEY", project(), "one").await;

        let err = sqlx::query(query::INSERT_VERSION)
            .bind("late-writer")
            .bind("KEY")
            .bind("two")
            .bind("test")
            .execute(&store.pool)
            .await
            .unwrap_err();
        assert!(matches!(
            write_error("insert", err),
            VaultError::TransactionFailure(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_leave_one_active_version() {
        let (_dir, store) = open().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let version = NewVersion::new("RACE", project(), format!("v{i}"));
                store.supersede(&version).await
            }));
        }

        let mut committed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(VaultError::TransactionFailure(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(committed >= 1);

        let active = store.versions("RACE", &project(), false).await.unwrap();
        assert_eq!(active.len(), 1);
        let all = store.versions("RACE", &project(), true).await.unwrap();
        assert_eq!(all.len(), committed);
    }

    #[tokio::test]
    async fn test_select_active_is_scoped_and_sorted() {
        let (_dir, store) = open().await;
        set(&store, "beta", project(), "b").await;
        set(&store, "Alpha", project(), "a").await;
        set(&store, "gamma", Scope::Global, "g").await;

        let keys: Vec<String> = store
            .select_active(&project())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["Alpha", "beta"]);

        let all = store.select_all_active().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].project, Scope::Global);
    }

    #[tokio::test]
    async fn test_supersede_all_aborts_on_stale_row() {
        let (_dir, store) = open().await;
        let a = set(&store, "A", project(), "a1").await;
        let b = set(&store, "B", Scope::Global, "b1").await;
        // B is superseded behind the batch's back.
        set(&store, "B", Scope::Global, "b2").await;

        let replacements = vec![
            Replacement {
                replaces: a.version_id.clone(),
                version: NewVersion::new("A", project(), "a2".to_string()),
            },
            Replacement {
                replaces: b.version_id.clone(),
                version: NewVersion::new("B", Scope::Global, "b3".to_string()),
            },
        ];

        let result = store.supersede_all(&replacements).await;
        assert!(matches!(result, Err(VaultError::TransactionFailure(_))));

        let a_active = store.find_active("A", &project()).await.unwrap().unwrap();
        assert_eq!(a_active.ciphertext, "a1");
        assert_eq!(store.versions("A", &project(), true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_matching_respects_filters() {
        let (_dir, store) = open().await;
        set(&store, "K", project(), "p1").await;
        set(&store, "K", project(), "p2").await;
        set(&store, "K", Scope::Global, "g1").await;

        let deleted = store
            .delete_matching(&DeleteFilter::new("K", &project(), false, false))
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(store.versions("K", &project(), true).await.unwrap().len(), 1);
        assert!(store.find_active("K", &Scope::Global).await.unwrap().is_some());

        let deleted = store
            .delete_matching(&DeleteFilter::new("K", &project(), true, true))
            .await
            .unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(deleted.iter().all(|r| r.key == "K"));
        assert!(store.versions("K", &Scope::Global, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune_keeps_newest_deprecated() {
        let (_dir, store) = open().await;
        let mut versions = Vec::new();
        for i in 0..5 {
            versions.push(set(&store, "TMP", project(), &format!("v{i}")).await);
        }

        let window = store
            .select_deprecated_ordered(&project(), Window::new(Some(2), 1))
            .await
            .unwrap();
        let ids: Vec<_> = window.iter().map(|r| r.version_id.clone()).collect();
        assert_eq!(ids, vec![versions[2].version_id.clone(), versions[1].version_id.clone()]);

        let deleted = store.prune_deprecated(&project(), 1).await.unwrap();
        assert_eq!(deleted.len(), 3);

        let remaining = store.versions("TMP", &project(), true).await.unwrap();
        let ids: Vec<_> = remaining.iter().map(|v| v.version_id.clone()).collect();
        assert_eq!(ids, vec![versions[4].version_id.clone(), versions[3].version_id.clone()]);
    }

    #[tokio::test]
    async fn test_clear_removes_active_rows_too() {
        let (_dir, store) = open().await;
        for i in 0..3 {
            set(&store, "TMP", project(), &format!("v{i}")).await;
        }
        set(&store, "OTHER", Scope::Global, "g").await;

        let deleted = store.clear_scope(&project(), 0).await.unwrap();
        assert_eq!(deleted.len(), 3);
        assert!(store.select_active(&project()).await.unwrap().is_empty());
        assert_eq!(store.select_active(&Scope::Global).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_key_and_project() {
        let (_dir, store) = open().await;
        set(&store, "OLD", project(), "1").await;
        set(&store, "OLD", project(), "2").await;
        set(&store, "OLD", Scope::Global, "g").await;

        assert_eq!(store.rename_key("OLD", "NEW", &project()).await.unwrap(), 2);
        assert!(store.find_active("NEW", &project()).await.unwrap().is_some());
        assert!(store.find_active("OLD", &Scope::Global).await.unwrap().is_some());

        assert_eq!(store.rename_project("test", "renamed").await.unwrap(), 2);
        assert!(store.select_active(&project()).await.unwrap().is_empty());
        let moved = Scope::Project("renamed".to_string());
        assert_eq!(store.select_active(&moved).await.unwrap().len(), 1);

        assert_eq!(store.rename_project("*", "elsewhere").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rename_onto_active_key_fails() {
        let (_dir, store) = open().await;
        set(&store, "A", project(), "a").await;
        set(&store, "B", project(), "b").await;

        let result = store.rename_key("A", "B", &project()).await;
        assert!(matches!(result, Err(VaultError::TransactionFailure(_))));
    }

    #[tokio::test]
    async fn test_stats_counts_owning_scope() {
        let (_dir, store) = open().await;
        set(&store, "shared", Scope::Global, "g1").await;
        set(&store, "shared", Scope::Global, "g2").await;
        set(&store, "shared", project(), "p1").await;
        set(&store, "Global_only", Scope::Global, "g").await;
        set(&store, "local", project(), "l1").await;
        set(&store, "local", project(), "l2").await;
        set(&store, "local", project(), "l3").await;

        let stats = store.stats(&project()).await.unwrap();
        let summary: Vec<(&str, &str, u64)> = stats
            .iter()
            .map(|s| (s.key.as_str(), s.project.as_str(), s.versions))
            .collect();
        assert_eq!(
            summary,
            vec![("Global_only", "*", 1), ("local", "test", 3), ("shared", "test", 1)]
        );
    }
}
