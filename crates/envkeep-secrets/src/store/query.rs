//! Backend-neutral SQL for the `environments` table.
//!
//! Static statements use `$N` placeholders, which both SQLite and
//! PostgreSQL accept. The two places where the engines genuinely differ,
//! case-insensitive ordering and the unbounded `LIMIT`, are rendered by
//! [`Dialect`] so no caller ever passes a backend-specific sentinel.

use crate::types::{ActiveRow, Scope, SecretVersion, VersionId, VersionRef, VersionStat};

/// SQL flavour of a record store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

/// A slice of a newest-first listing: skip `offset` rows, then take at most
/// `limit` (or everything when `limit` is `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Window {
    /// Everything after the `keep` newest rows.
    pub fn beyond(keep: u32) -> Self {
        Self {
            limit: None,
            offset: keep,
        }
    }

    pub fn new(limit: Option<u32>, offset: u32) -> Self {
        Self { limit, offset }
    }
}

const ASCII_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ASCII_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

impl Dialect {
    /// `ORDER BY` expression sorting `column` case-insensitively, with the
    /// raw value as tiebreaker so the order is total.
    ///
    /// Only ASCII letters are folded and bytes are compared as-is, which is
    /// what SQLite's `NOCASE` does. PostgreSQL gets the same order through
    /// `translate` under the `"C"` collation.
    pub fn order_by_key(&self, column: &str) -> String {
        match self {
            Self::Sqlite => format!("{column} COLLATE NOCASE, {column}"),
            Self::Postgres => format!(
                "translate({column}, '{ASCII_UPPER}', '{ASCII_LOWER}') COLLATE \"C\", \
                 {column} COLLATE \"C\""
            ),
        }
    }

    /// `LIMIT`/`OFFSET` clause for `window`.
    pub fn window(&self, window: Window) -> String {
        match (self, window.limit) {
            (_, Some(limit)) => format!("LIMIT {limit} OFFSET {}", window.offset),
            // SQLite needs a LIMIT before OFFSET; a negative one means unbounded.
            (Self::Sqlite, None) => format!("LIMIT -1 OFFSET {}", window.offset),
            (Self::Postgres, None) => format!("OFFSET {}", window.offset),
        }
    }
}

/// Rows to hard-delete: one key, a set of projects, a set of deprecation
/// states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFilter {
    pub key: String,
    pub projects: Vec<Scope>,
    pub deprecated: Vec<bool>,
}

impl DeleteFilter {
    pub fn new(key: &str, project: &Scope, include_global: bool, include_deprecated: bool) -> Self {
        let mut projects = vec![project.clone()];
        if include_global && !project.is_global() {
            projects.push(Scope::Global);
        }

        let deprecated = if include_deprecated {
            vec![false, true]
        } else {
            vec![false]
        };

        Self {
            key: key.to_string(),
            projects,
            deprecated,
        }
    }
}

pub(crate) const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS environments (
        version_id TEXT PRIMARY KEY,
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        project TEXT NOT NULL,
        deprecated BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS environments_project_idx
    ON environments (project, deprecated)
    "#,
    // At most one active version per (key, project).
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS environments_active_key_idx
    ON environments (key, project)
    WHERE deprecated = FALSE
    "#,
];

pub(crate) const DEPRECATE_ACTIVE: &str = r#"
    UPDATE environments SET deprecated = TRUE
    WHERE key = $1 AND project = $2 AND deprecated = FALSE
"#;

pub(crate) const DEPRECATE_VERSION: &str = r#"
    UPDATE environments SET deprecated = TRUE
    WHERE version_id = $1 AND deprecated = FALSE
"#;

pub(crate) const INSERT_VERSION: &str = r#"
    INSERT INTO environments (version_id, key, value, project, deprecated)
    VALUES ($1, $2, $3, $4, FALSE)
"#;

pub(crate) const FIND_ACTIVE: &str = r#"
    SELECT version_id, key, project, value FROM environments
    WHERE key = $1 AND project = $2 AND deprecated = FALSE
"#;

pub(crate) const RENAME_KEY: &str = r#"
    UPDATE environments SET key = $1
    WHERE key = $2 AND project = $3
"#;

pub(crate) const RENAME_PROJECT: &str = r#"
    UPDATE environments SET project = $1
    WHERE project = $2 AND project <> '*'
"#;

pub(crate) fn select_active(dialect: Dialect) -> String {
    format!(
        "SELECT version_id, key, project, value FROM environments \
         WHERE project = $1 AND deprecated = FALSE \
         ORDER BY {}",
        dialect.order_by_key("key")
    )
}

pub(crate) fn select_all_active(dialect: Dialect) -> String {
    format!(
        "SELECT version_id, key, project, value FROM environments \
         WHERE deprecated = FALSE \
         ORDER BY project, {}",
        dialect.order_by_key("key")
    )
}

pub(crate) fn select_deprecated_ordered(dialect: Dialect, window: Window) -> String {
    format!(
        "SELECT version_id, key FROM environments \
         WHERE project = $1 AND deprecated = TRUE \
         ORDER BY version_id DESC {}",
        dialect.window(window)
    )
}

pub(crate) fn prune_deprecated(dialect: Dialect, window: Window) -> String {
    format!(
        "DELETE FROM environments WHERE version_id IN ( \
             SELECT version_id FROM environments \
             WHERE project = $1 AND deprecated = TRUE \
             ORDER BY version_id DESC {} \
         ) RETURNING version_id, key",
        dialect.window(window)
    )
}

pub(crate) fn clear_scope(dialect: Dialect, window: Window) -> String {
    format!(
        "DELETE FROM environments WHERE version_id IN ( \
             SELECT version_id FROM environments \
             WHERE project = $1 \
             ORDER BY version_id DESC {} \
         ) RETURNING version_id, key",
        dialect.window(window)
    )
}

pub(crate) fn versions(include_deprecated: bool) -> String {
    let filter = if include_deprecated {
        ""
    } else {
        "AND deprecated = FALSE "
    };
    format!(
        "SELECT version_id, key, project, value, deprecated FROM environments \
         WHERE key = $1 AND project = $2 {filter}\
         ORDER BY version_id DESC"
    )
}

/// Versions per key for the scope that owns the key from the caller's
/// point of view: project rows, plus global rows whose key the project
/// does not have at all.
pub(crate) fn stats(dialect: Dialect) -> String {
    format!(
        "SELECT key, project, versions FROM ( \
             SELECT key, project, COUNT(*) AS versions \
             FROM environments \
             WHERE project = $1 \
             GROUP BY key, project \
             UNION ALL \
             SELECT g.key, g.project, COUNT(*) AS versions \
             FROM environments g \
             WHERE g.project = '*' \
               AND NOT EXISTS ( \
                   SELECT 1 FROM environments p \
                   WHERE p.project = $1 AND p.key = g.key) \
             GROUP BY g.key, g.project \
         ) scoped \
         ORDER BY {}",
        dialect.order_by_key("key")
    )
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ActiveRecord {
    version_id: String,
    key: String,
    project: String,
    value: String,
}

impl From<ActiveRecord> for ActiveRow {
    fn from(r: ActiveRecord) -> Self {
        Self {
            version_id: VersionId::from(r.version_id),
            key: r.key,
            project: Scope::from_project(r.project),
            ciphertext: r.value,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VersionRecord {
    version_id: String,
    key: String,
    project: String,
    value: String,
    deprecated: bool,
}

impl From<VersionRecord> for SecretVersion {
    fn from(r: VersionRecord) -> Self {
        Self {
            version_id: VersionId::from(r.version_id),
            key: r.key,
            ciphertext: r.value,
            project: Scope::from_project(r.project),
            deprecated: r.deprecated,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VersionRefRecord {
    version_id: String,
    key: String,
}

impl From<VersionRefRecord> for VersionRef {
    fn from(r: VersionRefRecord) -> Self {
        Self {
            version_id: VersionId::from(r.version_id),
            key: r.key,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StatRecord {
    key: String,
    project: String,
    versions: i64,
}

impl From<StatRecord> for VersionStat {
    fn from(r: StatRecord) -> Self {
        Self {
            key: r.key,
            project: Scope::from_project(r.project),
            versions: u64::try_from(r.versions).unwrap_or(0),
        }
    }
}
