//! User Account API - user accounts behind ES384 bearer tokens
//!
//! This crate provides account CRUD, login, paged listing and profile
//! images over Axum, with tag-based storage migrations applied at startup.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **telemetry**: Logging setup
//! - **domain**: Core business entities and logic
//! - **auth**: Token issuing and verification, key material
//! - **secrets**: Where key material comes from
//! - **services**: Application use cases and business logic
//! - **migrate**: Tag-based migration engine and storage administration
//! - **infra**: Infrastructure concerns (database, object storage, in-memory backends)
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination cursors, responses)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Apply migrations and start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Show applied versions
//! cargo run -- migrate status
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod migrate;
pub mod secrets;
pub mod services;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Password, User};
pub use errors::{AppError, AppResult};
