//! The secret vault: one caller's session over the record store.
//!
//! A [`Vault`] owns a store handle, the active encryption key, the caller's
//! project, and the materialized view of that project. Every mutation
//! writes through the store first and then brings the view in line with
//! what the store now resolves to.

use std::collections::BTreeSet;
use std::sync::Arc;

use envkeep_core::{Config, SecretString};
use tracing::{debug, info, instrument};

use crate::cache::MaterializedCache;
use crate::crypto::{decrypt, encrypt, EncryptionKey};
use crate::error::{Result, VaultError};
use crate::resolver;
use crate::store::{self, DeleteFilter, RecordStore};
use crate::types::{
    validate_key, validate_project, NewVersion, RenameTarget, Replacement, Scope, SecretVersion,
    VersionRef, VersionStat,
};

/// A caller's handle on the secret store.
pub struct Vault {
    store: Arc<dyn RecordStore>,
    key: EncryptionKey,
    project: Scope,
    cache: MaterializedCache,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("project", &self.project)
            .field("dialect", &self.store.dialect())
            .field("entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Open the store described by `config` and apply the schema.
    ///
    /// The view is empty until [`Vault::load`] is called.
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let key = EncryptionKey::try_from(config.encryption_key()?)?;
        let connection_string = config.connection_string()?;

        let store = store::connect(config.driver, &connection_string).await?;
        Self::with_store(store, key, &config.project).await
    }

    /// Build a vault over an already connected store.
    pub async fn with_store(
        store: Arc<dyn RecordStore>,
        key: EncryptionKey,
        project: &str,
    ) -> Result<Self> {
        validate_project(project)?;
        store.ensure_schema().await?;

        Ok(Self {
            store,
            key,
            project: Scope::from_project(project),
            cache: MaterializedCache::new(),
        })
    }

    /// Rebuild the view from the store.
    pub async fn load(&mut self) -> Result<()> {
        self.cache = resolver::resolve(self.store.as_ref(), &self.key, &self.project).await?;
        debug!(entries = self.cache.len(), "loaded");
        Ok(())
    }

    /// Effective value of `key` for the caller's project.
    pub fn get(&self, key: &str) -> Option<&SecretString> {
        self.cache.get(key)
    }

    /// The resolved view, in case-insensitive key order.
    pub fn entries(&self) -> &MaterializedCache {
        &self.cache
    }

    pub fn project(&self) -> &Scope {
        &self.project
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    fn target_scope(&self, is_global: bool) -> Scope {
        if is_global {
            Scope::Global
        } else {
            self.project.clone()
        }
    }

    /// Make the view agree with the store for one key.
    async fn refresh(&mut self, key: &str) -> Result<()> {
        match resolver::resolve_key(self.store.as_ref(), &self.key, &self.project, key).await? {
            Some(value) => {
                self.cache.insert(key, value);
            }
            None => {
                self.cache.remove(key);
            }
        }
        Ok(())
    }

    async fn refresh_all<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let keys: BTreeSet<&str> = keys.into_iter().collect();
        for key in keys {
            self.refresh(key).await?;
        }
        Ok(())
    }

    /// Write a new active version of `key`.
    ///
    /// A global write made from inside a project that already overrides
    /// `key` is persisted but stays shadowed: the view keeps showing the
    /// project value.
    #[instrument(skip(self, value), fields(project = %self.project))]
    pub async fn set(&mut self, key: &str, value: &str, is_global: bool) -> Result<()> {
        validate_key(key)?;

        let scope = self.target_scope(is_global);
        let version = NewVersion::new(key, scope, encrypt(&self.key, value)?);
        let deprecated = self.store.supersede(&version).await?;

        let shadowed = is_global
            && !self.project.is_global()
            && self.store.find_active(key, &self.project).await?.is_some();

        if shadowed {
            debug!(deprecated, "global write shadowed by project override");
        } else {
            self.cache.insert(key, SecretString::new(value));
            debug!(deprecated, "set");
        }
        Ok(())
    }

    /// Hard-delete versions of `key`, returning the key of every deleted row.
    ///
    /// Deleting an absent key is a no-op. Removing a project override
    /// exposes the global value again.
    #[instrument(skip(self), fields(project = %self.project))]
    pub async fn delete(
        &mut self,
        key: &str,
        include_deprecated: bool,
        include_global: bool,
    ) -> Result<Vec<String>> {
        let filter = DeleteFilter::new(key, &self.project, include_global, include_deprecated);
        let deleted = self.store.delete_matching(&filter).await?;

        self.refresh_all(deleted.iter().map(|r| r.key.as_str())).await?;

        debug!(deleted = deleted.len(), "deleted");
        Ok(deleted.into_iter().map(|r| r.key).collect())
    }

    /// Rename a key or a project, returning the number of rows rewritten.
    ///
    /// Renaming onto a name that is already active fails with
    /// [`VaultError::InvalidName`]. Renaming the caller's own project moves
    /// the caller along with it.
    #[instrument(skip(self), fields(project = %self.project))]
    pub async fn rename(&mut self, previous: &str, next: &str, target: RenameTarget) -> Result<u64> {
        if previous == next {
            return Ok(0);
        }

        match target {
            RenameTarget::Key { global } => self.rename_key(previous, next, global).await,
            RenameTarget::Project => self.rename_project(previous, next).await,
        }
    }

    async fn rename_key(&mut self, previous: &str, next: &str, global: bool) -> Result<u64> {
        validate_key(next)?;
        let scope = self.target_scope(global);

        if self.store.find_active(next, &scope).await?.is_some() {
            return Err(VaultError::InvalidName(format!(
                "key '{next}' already exists in project '{scope}'"
            )));
        }

        let affected = self.store.rename_key(previous, next, &scope).await?;
        self.refresh_all([previous, next]).await?;

        debug!(affected, "renamed key");
        Ok(affected)
    }

    async fn rename_project(&mut self, previous: &str, next: &str) -> Result<u64> {
        validate_project(next)?;
        if Scope::from_project(previous).is_global() || Scope::from_project(next).is_global() {
            return Err(VaultError::InvalidName(
                "the global project cannot be renamed".to_string(),
            ));
        }

        let source = Scope::from_project(previous);
        let destination = Scope::from_project(next);

        let existing: BTreeSet<String> = self
            .store
            .select_active(&destination)
            .await?
            .into_iter()
            .map(|r| r.key)
            .collect();
        if let Some(row) = self
            .store
            .select_active(&source)
            .await?
            .into_iter()
            .find(|r| existing.contains(&r.key))
        {
            return Err(VaultError::InvalidName(format!(
                "key '{}' already exists in project '{next}'",
                row.key
            )));
        }

        let affected = self.store.rename_project(previous, next).await?;

        if self.project == source {
            self.project = destination.clone();
            info!(project = %self.project, "caller project renamed");
        }
        // The destination may already hold keys that shadow globals.
        if self.project == destination {
            self.load().await?;
        }

        debug!(affected, "renamed project");
        Ok(affected)
    }

    /// Delete deprecated versions beyond the `offset` newest.
    ///
    /// `with_global` targets the global scope instead of the caller's
    /// project. Active versions are never touched, so the view does not
    /// change.
    #[instrument(skip(self), fields(project = %self.project))]
    pub async fn prune(&mut self, offset: u32, with_global: bool) -> Result<Vec<VersionRef>> {
        let scope = self.target_scope(with_global);
        let deleted = self.store.prune_deprecated(&scope, offset).await?;

        debug!(deleted = deleted.len(), "pruned");
        Ok(deleted)
    }

    /// Delete every version beyond the `offset` newest, active ones
    /// included. `offset = 0` empties the scope; `with_global` selects the
    /// global scope as for [`Vault::prune`].
    #[instrument(skip(self), fields(project = %self.project))]
    pub async fn clear(&mut self, offset: u32, with_global: bool) -> Result<Vec<VersionRef>> {
        let scope = self.target_scope(with_global);
        let deleted = self.store.clear_scope(&scope, offset).await?;

        self.refresh_all(deleted.iter().map(|r| r.key.as_str())).await?;

        debug!(deleted = deleted.len(), "cleared");
        Ok(deleted)
    }

    /// Persisted versions of `key`, newest first.
    pub async fn history(
        &self,
        key: &str,
        is_global: bool,
        include_deprecated: bool,
    ) -> Result<Vec<SecretVersion>> {
        self.store
            .versions(key, &self.target_scope(is_global), include_deprecated)
            .await
    }

    /// Decrypt one historical version under the active key.
    pub fn reveal(&self, version: &SecretVersion) -> Result<SecretString> {
        decrypt(&self.key, &version.ciphertext)
    }

    /// Version counts per key for the caller's effective scope.
    pub async fn stats(&self) -> Result<Vec<VersionStat>> {
        self.store.stats(&self.project).await
    }

    /// Re-encrypt every active version in the store under `new_key`.
    ///
    /// Each row keeps its own project. Everything is decrypted before
    /// anything is written, and all replacements commit in one transaction;
    /// the vault switches to `new_key` only after that commit. Returns the
    /// number of versions rotated.
    #[instrument(skip(self, new_key))]
    pub async fn rotate(&mut self, new_key: EncryptionKey) -> Result<usize> {
        let rows = self.store.select_all_active().await?;

        let mut replacements = Vec::with_capacity(rows.len());
        for row in rows {
            let plaintext = decrypt(&self.key, &row.ciphertext)?;
            let ciphertext = encrypt(&new_key, plaintext.expose_secret())?;
            replacements.push(Replacement {
                replaces: row.version_id,
                version: NewVersion::new(row.key, row.project, ciphertext),
            });
        }

        self.store.supersede_all(&replacements).await?;
        self.key = new_key;

        info!(rotated = replacements.len(), "encryption key rotated");
        Ok(replacements.len())
    }

    /// Release the store.
    pub async fn close(self) {
        self.store.close().await;
    }
}
