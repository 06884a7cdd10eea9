//! Bearer token access guard.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::api::extractors::Subject;
use crate::auth::TokenAuthority;
use crate::config::BEARER_SCHEME;
use crate::errors::{AppError, AppResult};

/// Token from an `Authorization: Bearer <token>` header.
///
/// The value must be exactly two space-separated parts, the first being
/// `bearer` in any case, the second non-empty.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(AppError::Unauthorized),
    }
}

/// Authentication middleware.
///
/// Verifies the bearer token and makes the token's subject available to the
/// handler as a [`Subject`] extractor.
pub async fn access_guard(
    State(tokens): State<TokenAuthority>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let subject = tokens.verify(bearer_token(request.headers())?)?;
    request.extensions_mut().insert(Subject::new(subject));

    Ok(next.run(request).await)
}

/// Allow the request only if `subject` is `username`.
///
/// A mismatch is reported exactly like a bad token.
pub fn require_ownership(subject: &Subject, username: &str) -> AppResult<()> {
    if subject.username() == username {
        Ok(())
    } else {
        tracing::debug!(
            subject = subject.username(),
            resource = username,
            "ownership check failed"
        );
        Err(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_scheme_case_insensitive() {
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers("BEARER abc")).unwrap(), "abc");
    }

    #[test]
    fn test_malformed_headers_rejected() {
        for value in ["abc", "Basic abc", "Bearer", "Bearer ", "Bearer a b", "Bearer  abc"] {
            assert!(
                matches!(bearer_token(&headers(value)), Err(AppError::Unauthorized)),
                "{:?} accepted",
                value
            );
        }
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_require_ownership() {
        let alice = Subject::new("alice".into());
        assert!(require_ownership(&alice, "alice").is_ok());
        assert!(matches!(
            require_ownership(&alice, "bob"),
            Err(AppError::Unauthorized)
        ));
    }
}
