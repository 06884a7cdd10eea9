//! Authenticated subject extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;

/// Username verified by the access guard for the current request.
///
/// Only present on routes behind the guard. Extracting it anywhere else
/// fails with [`AppError::Unauthorized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(String);

impl Subject {
    pub(crate) fn new(username: String) -> Self {
        Self(username)
    }

    pub fn username(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Subject
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Subject>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
