//! Commands module - CLI command implementations.
//!
//! Each command is implemented in its own module for separation of concerns.

pub mod migrate;
pub mod serve;

use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::errors::AppResult;
use crate::infra::{
    Database, MemoryStorageAdmin, MemoryUserStore, SqlStorageAdmin, SqlUserStore, UserRepository,
};
use crate::migrate::{self as migrations, MigrationEngine, StorageAdmin};

/// The user store and its administrator, both on the configured backend
pub(crate) struct Backend {
    pub users: Arc<dyn UserRepository>,
    pub admin: Arc<dyn StorageAdmin>,
}

impl Backend {
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        match config.storage_backend {
            StorageBackend::Postgres => {
                let db = Database::connect(&config.database_url).await?;
                Ok(Self {
                    users: Arc::new(SqlUserStore::new(db.get_connection())),
                    admin: Arc::new(SqlStorageAdmin::new(db.get_connection())),
                })
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on exit");
                Ok(Self {
                    users: Arc::new(MemoryUserStore::new()),
                    admin: Arc::new(MemoryStorageAdmin::new()),
                })
            }
        }
    }

    /// Engine over every migration of this service
    pub fn migrations(&self, config: &Config) -> MigrationEngine {
        MigrationEngine::new(
            self.admin.clone(),
            migrations::all(self.users.clone(), config.admin_initial_password()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_migrates_and_seeds_admin() {
        let config = Config::from_lookup(|key| {
            (key == "STORAGE_BACKEND").then(|| "memory".to_string())
        })
        .unwrap();

        let backend = Backend::from_config(&config).await.unwrap();
        let applied = backend.migrations(&config).up().await.unwrap();

        assert_eq!(applied.len(), 1);
        assert!(backend.users.get_user("admin").await.unwrap().is_some());
        assert!(backend.migrations(&config).up().await.unwrap().is_empty());
    }
}
