//! Database connection and the SQL storage administrator.

use sea_orm::{Database as SeaDatabase, DatabaseConnection, DbErr};

mod storage_admin;

pub use storage_admin::SqlStorageAdmin;

/// Database wrapper for connection management
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Open a connection pool. Schema changes are left to the migration engine.
    pub async fn connect(database_url: &str) -> Result<Self, DbErr> {
        let connection = SeaDatabase::connect(database_url).await?;
        tracing::info!("Database connected");
        Ok(Self { connection })
    }

    /// Get a clone of the database connection.
    pub fn get_connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }
}
