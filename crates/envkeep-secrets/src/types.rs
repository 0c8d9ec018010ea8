//! Core types for the versioned secret store.
//!
//! A secret key may have many persisted versions per scope. At most one of
//! them is active; the rest are deprecated history kept until pruned.

use std::fmt;

use envkeep_core::GLOBAL_PROJECT;
use uuid::Uuid;

use crate::error::{Result, VaultError};

/// Maximum allowed length for a secret key or project name.
const MAX_NAME_LEN: usize = 256;

/// The namespace a version belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// The global fallback tier, persisted as `"*"`.
    Global,
    /// A named project.
    Project(String),
}

impl Scope {
    /// Map a persisted project column to a scope.
    pub fn from_project(project: impl Into<String>) -> Self {
        let project = project.into();
        if project == GLOBAL_PROJECT {
            Self::Global
        } else {
            Self::Project(project)
        }
    }

    /// The value stored in the `project` column.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Global => GLOBAL_PROJECT,
            Self::Project(name) => name,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-ordered unique identifier of one persisted version.
///
/// UUIDv7 strings sort lexicographically in creation order, so "newest
/// first" is `ORDER BY version_id DESC` on every backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId(String);

impl VersionId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VersionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One persisted row of the `environments` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVersion {
    pub version_id: VersionId,
    pub key: String,
    /// Hex storage encoding produced by [`crate::crypto::encrypt`].
    pub ciphertext: String,
    pub project: Scope,
    pub deprecated: bool,
}

/// An active (non-deprecated) row as read by the resolver and rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRow {
    pub version_id: VersionId,
    pub key: String,
    pub project: Scope,
    pub ciphertext: String,
}

/// A new active version replacing whatever is active for `(key, project)`.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub version_id: VersionId,
    pub key: String,
    pub project: Scope,
    pub ciphertext: String,
}

impl NewVersion {
    pub fn new(key: impl Into<String>, project: Scope, ciphertext: String) -> Self {
        Self {
            version_id: VersionId::generate(),
            key: key.into(),
            project,
            ciphertext,
        }
    }
}

/// Replacement of one specific active row, used by key rotation.
#[derive(Debug, Clone)]
pub struct Replacement {
    /// The active row being superseded.
    pub replaces: VersionId,
    pub version: NewVersion,
}

/// Identity of one version, as listed by history windows or reported back
/// by delete, prune, and clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRef {
    pub version_id: VersionId,
    pub key: String,
}

/// Version count for one key in the scope that owns it for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionStat {
    pub key: String,
    pub project: Scope,
    pub versions: u64,
}

/// Target of a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameTarget {
    /// Rename a secret key, in the global scope or the caller's project.
    Key { global: bool },
    /// Move every row owned by one project to another project name.
    Project,
}

/// Validate a secret key.
///
/// Keys are exported as `KEY=value` lines, so `=`, whitespace and control
/// characters are rejected.
pub fn validate_key(key: &str) -> Result<()> {
    validate_name("key", key)?;
    if key.contains('=') {
        return Err(VaultError::InvalidName(format!(
            "key must not contain '=': {key}"
        )));
    }
    Ok(())
}

/// Validate a project name. `"*"` is accepted and means the global scope.
pub fn validate_project(project: &str) -> Result<()> {
    validate_name("project", project)
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VaultError::InvalidName(format!("{kind} must not be empty")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(VaultError::InvalidName(format!(
            "{kind} exceeds maximum length of {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(VaultError::InvalidName(format!(
            "{kind} contains whitespace or control characters: {name:?}"
        )));
    }
    Ok(())
}
