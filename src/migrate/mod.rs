//! Tag-based schema migrations.
//!
//! Each [`Migration`] provisions one table-like resource. After its `up`
//! succeeds the engine tags that resource with `Migration=<version>` and
//! `MigratedAt=<RFC 3339 UTC>`. Those tags are the only record of what has
//! been applied: on the next run a version whose tag is found is skipped.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use crate::config::{MIGRATED_AT_TAG, MIGRATION_TAG};
use crate::errors::{AppError, AppResult};
use crate::infra::UserRepository;

mod admin;
mod m20250405000000_users_table;

pub use admin::{
    poll_until, Attribute, AttributeKind, ResourceSchema, ResourceState, StorageAdmin, Tag,
};
pub use m20250405000000_users_table::CreateUsersTable;

/// A versioned, forward-only change to the store.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Ordered identifier, e.g. `20250405000000_users_table`
    fn version(&self) -> &str;

    /// Name of the resource this migration provisions and tags
    fn resource(&self) -> &str;

    async fn up(&self, admin: &dyn StorageAdmin) -> AppResult<()>;

    async fn down(&self, admin: &dyn StorageAdmin) -> AppResult<()>;
}

/// Applied state of one migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: String,
    pub applied: bool,
}

/// Applies an ordered list of migrations against a [`StorageAdmin`].
///
/// Not safe to run from two processes at once: both could see a version as
/// untagged and both try to create its resource.
pub struct MigrationEngine {
    admin: Arc<dyn StorageAdmin>,
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationEngine {
    pub fn new(admin: Arc<dyn StorageAdmin>, migrations: Vec<Box<dyn Migration>>) -> Self {
        Self { admin, migrations }
    }

    /// Apply every migration that is not tagged yet, in list order.
    ///
    /// Returns the versions applied by this run; empty when everything was
    /// already applied.
    ///
    /// # Errors
    /// [`AppError::MigrationFailed`] for the first failing version. Later
    /// migrations are not attempted and nothing is rolled back.
    pub async fn up(&self) -> AppResult<Vec<String>> {
        self.check_versions()?;

        let mut applied = Vec::new();
        for migration in &self.migrations {
            let version = migration.version();

            if self.is_applied(version).await? {
                tracing::info!(version, "migration already applied, skipping");
                continue;
            }

            tracing::info!(version, resource = migration.resource(), "applying migration");
            migration
                .up(self.admin.as_ref())
                .await
                .map_err(|e| AppError::migration(version, e))?;

            let tags = [
                Tag::new(MIGRATION_TAG, version),
                Tag::new(
                    MIGRATED_AT_TAG,
                    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
            ];
            self.admin
                .tag_resource(migration.resource(), &tags)
                .await
                .map_err(|e| AppError::migration(version, e))?;

            tracing::info!(version, "migration applied");
            applied.push(version.to_string());
        }

        Ok(applied)
    }

    /// Run every migration's `down`, last migration first.
    ///
    /// Not guarded by tags: this is an explicit operator teardown.
    pub async fn down(&self) -> AppResult<Vec<String>> {
        self.check_versions()?;

        let mut reverted = Vec::new();
        for migration in self.migrations.iter().rev() {
            let version = migration.version();
            tracing::info!(version, resource = migration.resource(), "reverting migration");

            migration
                .down(self.admin.as_ref())
                .await
                .map_err(|e| AppError::migration(version, e))?;

            tracing::info!(version, "migration reverted");
            reverted.push(version.to_string());
        }

        Ok(reverted)
    }

    /// Applied state of every known migration, in list order.
    pub async fn status(&self) -> AppResult<Vec<MigrationStatus>> {
        let mut statuses = Vec::with_capacity(self.migrations.len());
        for migration in &self.migrations {
            let version = migration.version();
            statuses.push(MigrationStatus {
                version: version.to_string(),
                applied: self.is_applied(version).await?,
            });
        }
        Ok(statuses)
    }

    async fn is_applied(&self, version: &str) -> AppResult<bool> {
        let tagged = self
            .admin
            .find_by_tag(MIGRATION_TAG, version)
            .await
            .map_err(|e| AppError::migration(version, e))?;
        Ok(!tagged.is_empty())
    }

    fn check_versions(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for migration in &self.migrations {
            if !seen.insert(migration.version()) {
                return Err(AppError::migration(
                    migration.version(),
                    "version is listed more than once",
                ));
            }
        }
        Ok(())
    }
}

/// Every migration of this service, oldest first.
pub fn all(users: Arc<dyn UserRepository>, admin_password: &str) -> Vec<Box<dyn Migration>> {
    vec![Box::new(CreateUsersTable::new(users, admin_password))]
}
