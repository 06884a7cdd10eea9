//! Migration: create the users table and seed the administrator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Attribute, AttributeKind, Migration, ResourceSchema, StorageAdmin};
use crate::config::{ADMIN_USERNAME, MIGRATION_WAIT_TIMEOUT_SECONDS, USERS_KEY_ATTRIBUTE, USERS_TABLE};
use crate::domain::{Password, User};
use crate::errors::AppResult;
use crate::infra::UserRepository;

const VERSION: &str = "20250405000000_users_table";

pub struct CreateUsersTable {
    users: Arc<dyn UserRepository>,
    admin_password: String,
    timeout: Duration,
}

impl CreateUsersTable {
    pub fn new(users: Arc<dyn UserRepository>, admin_password: impl Into<String>) -> Self {
        Self {
            users,
            admin_password: admin_password.into(),
            timeout: Duration::from_secs(MIGRATION_WAIT_TIMEOUT_SECONDS),
        }
    }

    /// Override how long to wait for the table to become active or vanish.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn schema() -> ResourceSchema {
        ResourceSchema {
            name: USERS_TABLE.to_string(),
            key: Attribute::required(USERS_KEY_ATTRIBUTE, AttributeKind::String),
            attributes: vec![
                Attribute::required("password_hash", AttributeKind::String),
                Attribute::optional("profile_path", AttributeKind::String),
                Attribute::required("created_at", AttributeKind::Timestamp),
                Attribute::required("updated_at", AttributeKind::Timestamp),
            ],
        }
    }

    async fn seed_admin(&self) -> AppResult<()> {
        if self.users.get_user(ADMIN_USERNAME).await?.is_some() {
            tracing::debug!("administrator already present");
            return Ok(());
        }

        let password = Password::placeholder(&self.admin_password)?;
        self.users
            .create_user(User::new(ADMIN_USERNAME.to_string(), password.into_string()))
            .await?;
        tracing::info!(username = ADMIN_USERNAME, "administrator seeded");
        Ok(())
    }
}

#[async_trait]
impl Migration for CreateUsersTable {
    fn version(&self) -> &str {
        VERSION
    }

    fn resource(&self) -> &str {
        USERS_TABLE
    }

    async fn up(&self, admin: &dyn StorageAdmin) -> AppResult<()> {
        admin.create_resource(&Self::schema()).await?;
        admin.wait_until_ready(USERS_TABLE, self.timeout).await?;
        self.seed_admin().await
    }

    async fn down(&self, admin: &dyn StorageAdmin) -> AppResult<()> {
        admin.delete_resource(USERS_TABLE).await?;
        admin.wait_until_gone(USERS_TABLE, self.timeout).await
    }
}
