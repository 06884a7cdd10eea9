//! Infrastructure layer - External systems integration
//!
//! - Postgres connection, user store and storage administrator
//! - In-memory equivalents of each
//! - Object storage for profile images

pub mod db;
pub mod memory;
pub mod profile_store;
pub mod repositories;

pub use db::{Database, SqlStorageAdmin};
pub use memory::{MemoryStorageAdmin, MemoryUserStore};
pub use profile_store::{FsProfileStore, MemoryProfileStore, ProfileStore, StoredObject};
pub use repositories::{SqlUserStore, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
pub use repositories::MockUserRepository;
