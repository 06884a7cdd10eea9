//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    /// Missing, malformed, expired or foreign token, or a subject that does not
    /// own the addressed resource. Deliberately a single variant.
    #[error("not authorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token signing failed: {0}")]
    Signing(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("invalid pagination token")]
    InvalidCursor,

    // Startup
    #[error("migration {version} failed: {reason}")]
    MigrationFailed { version: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // External service errors
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Secret retrieval failed: {0}")]
    Secret(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Get error code for client
    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Signing(_) => "TOKEN_ERROR",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidCursor => "INVALID_CURSOR",
            AppError::MigrationFailed { .. } => "MIGRATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Secret(_) => "SECRET_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::InvalidCursor => {
                StatusCode::BAD_REQUEST
            }
            AppError::Signing(_)
            | AppError::MigrationFailed { .. }
            | AppError::Config(_)
            | AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Secret(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Conflict(msg) => format!("{} already exists", msg),

            // Hide details for internal/security errors
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Signing(msg) => {
                tracing::error!("Token signing error: {}", msg);
                "Failed to generate token".to_string()
            }
            AppError::Storage(msg) | AppError::Secret(msg) | AppError::Config(msg) => {
                tracing::error!("{}: {}", self.code(), msg);
                "An internal error occurred".to_string()
            }
            AppError::MigrationFailed { .. } => {
                tracing::error!("{}", self);
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn storage(msg: impl std::fmt::Display) -> Self {
        AppError::Storage(msg.to_string())
    }

    pub fn migration(version: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        AppError::MigrationFailed {
            version: version.into(),
            reason: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_401_with_generic_message() {
        let err = AppError::Unauthorized;
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), "not authorized");
    }

    #[test]
    fn test_invalid_cursor_is_client_error() {
        assert_eq!(AppError::InvalidCursor.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_migration_error_carries_version() {
        let err = AppError::migration("20250405000000_users_table", "table already exists");
        let text = err.to_string();
        assert!(text.contains("20250405000000_users_table"));
        assert!(text.contains("table already exists"));
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::storage("disk on fire at /var/lib");
        assert_eq!(err.user_message(), "An internal error occurred");
    }
}
