//! Scope resolution: project rows shadow global rows of the same key.

use std::collections::HashSet;

use tracing::{debug, error, instrument};

use crate::cache::MaterializedCache;
use crate::crypto::{decrypt, EncryptionKey};
use crate::error::{Result, VaultError};
use crate::store::RecordStore;
use crate::types::{ActiveRow, Scope};
use envkeep_core::SecretString;

/// Build the resolved view for `project`.
///
/// Every surviving ciphertext must decrypt; a single failure aborts the
/// whole load and no partial view is returned.
#[instrument(skip(store, key), fields(project = %project))]
pub async fn resolve(
    store: &dyn RecordStore,
    key: &EncryptionKey,
    project: &Scope,
) -> Result<MaterializedCache> {
    let project_rows = if project.is_global() {
        Vec::new()
    } else {
        store.select_active(project).await?
    };
    let global_rows = store.select_active(&Scope::Global).await?;

    check_unique(&project_rows)?;
    check_unique(&global_rows)?;

    let overridden: HashSet<&str> = project_rows.iter().map(|r| r.key.as_str()).collect();

    let mut cache = MaterializedCache::new();
    let mut shadowed = 0usize;
    for row in &global_rows {
        if overridden.contains(row.key.as_str()) {
            shadowed += 1;
            continue;
        }
        cache.insert(&row.key, decrypt_row(key, row)?);
    }
    for row in &project_rows {
        cache.insert(&row.key, decrypt_row(key, row)?);
    }

    debug!(
        project_rows = project_rows.len(),
        global_rows = global_rows.len(),
        shadowed,
        "resolved"
    );
    Ok(cache)
}

/// Effective value of one key for `project`, or `None` when neither the
/// project nor the global scope has an active row for it.
pub async fn resolve_key(
    store: &dyn RecordStore,
    key: &EncryptionKey,
    project: &Scope,
    name: &str,
) -> Result<Option<SecretString>> {
    if !project.is_global() {
        if let Some(row) = store.find_active(name, project).await? {
            return decrypt_row(key, &row).map(Some);
        }
    }

    match store.find_active(name, &Scope::Global).await? {
        Some(row) => decrypt_row(key, &row).map(Some),
        None => Ok(None),
    }
}

fn decrypt_row(key: &EncryptionKey, row: &ActiveRow) -> Result<SecretString> {
    decrypt(key, &row.ciphertext).map_err(|e| {
        error!(key = %row.key, project = %row.project, "failed to decrypt active version");
        e
    })
}

/// Rows of one scope must have distinct keys.
fn check_unique(rows: &[ActiveRow]) -> Result<()> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.key.as_str()) {
            let count = rows.iter().filter(|r| r.key == row.key).count() as u64;
            error!(key = %row.key, project = %row.project, count, "duplicate active versions");
            return Err(VaultError::IntegrityViolation {
                key: row.key.clone(),
                project: row.project.to_string(),
                count,
            });
        }
    }
    Ok(())
}
