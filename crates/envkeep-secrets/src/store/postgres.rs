//! PostgreSQL backend.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, instrument};

use super::query::{self, ActiveRecord, StatRecord, VersionRecord, VersionRefRecord};
use super::shared::impl_record_store;
use super::{check_deprecated, write_error, DeleteFilter, Dialect, RecordStore, Window};
use crate::error::{Result, VaultError};
use crate::types::{ActiveRow, NewVersion, Replacement, Scope, SecretVersion, VersionRef, VersionStat};

/// Record store over a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to the server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(VaultError::StoreUnavailable)?;

        debug!("connected to postgres");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl_record_store!(PostgresStore, Postgres, Dialect::Postgres);
