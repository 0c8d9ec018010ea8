//! `RecordStore` body shared by the SQLite and PostgreSQL backends.
//!
//! The statements are identical on both engines; only the pool type, the
//! `QueryBuilder` database and the [`Dialect`](super::Dialect) differ. The
//! expanding module must import the names the body uses.

/// Implement [`RecordStore`](super::RecordStore) for a store type holding a
/// `pool` of the given sqlx database.
macro_rules! impl_record_store {
    ($store:ty, $db:ty, $dialect:expr) => {
        impl $store {
            async fn fetch_refs(&self, sql: &str, project: &Scope) -> Result<Vec<VersionRef>> {
                let rows: Vec<VersionRefRecord> = sqlx::query_as(sql)
                    .bind(project.as_str())
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows.into_iter().map(VersionRef::from).collect())
            }
        }

        #[async_trait]
        impl RecordStore for $store {
            fn dialect(&self) -> Dialect {
                $dialect
            }

            async fn ensure_schema(&self) -> Result<()> {
                for statement in query::SCHEMA {
                    sqlx::query(statement)
                        .execute(&self.pool)
                        .await
                        .map_err(VaultError::StoreUnavailable)?;
                }
                Ok(())
            }

            #[instrument(skip(self, version), fields(key = %version.key, project = %version.project))]
            async fn supersede(&self, version: &NewVersion) -> Result<u64> {
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| VaultError::transaction("begin", e))?;

                let affected = sqlx::query(query::DEPRECATE_ACTIVE)
                    .bind(&version.key)
                    .bind(version.project.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| write_error("deprecate", e))?
                    .rows_affected();
                check_deprecated(&version.key, &version.project, affected)?;

                sqlx::query(query::INSERT_VERSION)
                    .bind(version.version_id.as_str())
                    .bind(&version.key)
                    .bind(&version.ciphertext)
                    .bind(version.project.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| write_error("insert", e))?;

                tx.commit()
                    .await
                    .map_err(|e| VaultError::transaction("commit", e))?;

                debug!(deprecated = affected, version_id = %version.version_id, "superseded");
                Ok(affected)
            }

            #[instrument(skip(self, replacements), fields(count = replacements.len()))]
            async fn supersede_all(&self, replacements: &[Replacement]) -> Result<()> {
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| VaultError::transaction("begin", e))?;

                for replacement in replacements {
                    let affected = sqlx::query(query::DEPRECATE_VERSION)
                        .bind(replacement.replaces.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| write_error("deprecate", e))?
                        .rows_affected();
                    if affected != 1 {
                        return Err(VaultError::TransactionFailure(format!(
                            "version {} of '{}' is no longer active",
                            replacement.replaces, replacement.version.key
                        )));
                    }

                    let version = &replacement.version;
                    sqlx::query(query::INSERT_VERSION)
                        .bind(version.version_id.as_str())
                        .bind(&version.key)
                        .bind(&version.ciphertext)
                        .bind(version.project.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| write_error("insert", e))?;
                }

                tx.commit()
                    .await
                    .map_err(|e| VaultError::transaction("commit", e))?;

                debug!("replaced all versions");
                Ok(())
            }

            async fn select_active(&self, project: &Scope) -> Result<Vec<ActiveRow>> {
                let rows: Vec<ActiveRecord> = sqlx::query_as(&query::select_active(self.dialect()))
                    .bind(project.as_str())
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows.into_iter().map(ActiveRow::from).collect())
            }

            async fn select_all_active(&self) -> Result<Vec<ActiveRow>> {
                let rows: Vec<ActiveRecord> = sqlx::query_as(&query::select_all_active(self.dialect()))
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows.into_iter().map(ActiveRow::from).collect())
            }

            async fn find_active(&self, key: &str, project: &Scope) -> Result<Option<ActiveRow>> {
                let row: Option<ActiveRecord> = sqlx::query_as(query::FIND_ACTIVE)
                    .bind(key)
                    .bind(project.as_str())
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(row.map(ActiveRow::from))
            }

            #[instrument(skip(self, filter), fields(key = %filter.key))]
            async fn delete_matching(&self, filter: &DeleteFilter) -> Result<Vec<VersionRef>> {
                let mut builder = QueryBuilder::<$db>::new("DELETE FROM environments WHERE key = ");
                builder.push_bind(filter.key.as_str());

                builder.push(" AND project IN (");
                let mut projects = builder.separated(", ");
                for project in &filter.projects {
                    projects.push_bind(project.as_str());
                }
                projects.push_unseparated(") AND deprecated IN (");

                let mut states = builder.separated(", ");
                for deprecated in &filter.deprecated {
                    states.push_bind(*deprecated);
                }
                states.push_unseparated(") RETURNING version_id, key");

                let rows: Vec<VersionRefRecord> = builder
                    .build_query_as()
                    .fetch_all(&self.pool)
                    .await?;

                debug!(deleted = rows.len(), "deleted matching versions");
                Ok(rows.into_iter().map(VersionRef::from).collect())
            }

            async fn select_deprecated_ordered(
                &self,
                project: &Scope,
                window: Window,
            ) -> Result<Vec<VersionRef>> {
                self.fetch_refs(
                    &query::select_deprecated_ordered(self.dialect(), window),
                    project,
                )
                .await
            }

            #[instrument(skip(self), fields(project = %project))]
            async fn prune_deprecated(&self, project: &Scope, keep: u32) -> Result<Vec<VersionRef>> {
                let sql = query::prune_deprecated(self.dialect(), Window::beyond(keep));
                let deleted = self.fetch_refs(&sql, project).await?;
                debug!(deleted = deleted.len(), "pruned deprecated versions");
                Ok(deleted)
            }

            #[instrument(skip(self), fields(project = %project))]
            async fn clear_scope(&self, project: &Scope, keep: u32) -> Result<Vec<VersionRef>> {
                let sql = query::clear_scope(self.dialect(), Window::beyond(keep));
                let deleted = self.fetch_refs(&sql, project).await?;
                debug!(deleted = deleted.len(), "cleared versions");
                Ok(deleted)
            }

            #[instrument(skip(self), fields(project = %project))]
            async fn rename_key(&self, previous: &str, next: &str, project: &Scope) -> Result<u64> {
                let affected = sqlx::query(query::RENAME_KEY)
                    .bind(next)
                    .bind(previous)
                    .bind(project.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err(|e| write_error("rename key", e))?
                    .rows_affected();
                debug!(affected, "renamed key");
                Ok(affected)
            }

            #[instrument(skip(self))]
            async fn rename_project(&self, previous: &str, next: &str) -> Result<u64> {
                let affected = sqlx::query(query::RENAME_PROJECT)
                    .bind(next)
                    .bind(previous)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| write_error("rename project", e))?
                    .rows_affected();
                debug!(affected, "renamed project");
                Ok(affected)
            }

            async fn versions(
                &self,
                key: &str,
                project: &Scope,
                include_deprecated: bool,
            ) -> Result<Vec<SecretVersion>> {
                let rows: Vec<VersionRecord> = sqlx::query_as(&query::versions(include_deprecated))
                    .bind(key)
                    .bind(project.as_str())
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows.into_iter().map(SecretVersion::from).collect())
            }

            async fn stats(&self, project: &Scope) -> Result<Vec<VersionStat>> {
                let rows: Vec<StatRecord> = sqlx::query_as(&query::stats(self.dialect()))
                    .bind(project.as_str())
                    .fetch_all(&self.pool)
                    .await?;
                Ok(rows.into_iter().map(VersionStat::from).collect())
            }

            async fn close(&self) {
                self.pool.close().await;
            }
        }
    };
}

pub(crate) use impl_record_store;
