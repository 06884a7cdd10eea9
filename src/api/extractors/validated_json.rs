//! Validated JSON extractor - Deserialize then run `validator` rules.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::errors::AppError;

/// Validated JSON extractor that automatically validates requests.
///
/// Malformed JSON and failed `validator` rules both become
/// [`AppError::Validation`] (400).
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        Self::validated(value)
    }
}

impl<T: DeserializeOwned + Validate> ValidatedJson<T> {
    /// Parse and validate a body the handler already holds as bytes.
    ///
    /// For handlers that must authorize the caller before the body is
    /// looked at. The content type is not checked.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        let Json(value) =
            Json::<T>::from_bytes(bytes).map_err(|e| AppError::validation(e.body_text()))?;

        Self::validated(value)
    }

    fn validated(value: T) -> Result<Self, AppError> {
        value
            .validate()
            .map_err(|e| AppError::validation(format_validation_errors(&e)))?;

        Ok(ValidatedJson(value))
    }
}

/// Format validation errors into a user-friendly string
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request as HttpRequest};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
        password: String,
    }

    fn request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_payload_passes() {
        let ValidatedJson(payload) =
            ValidatedJson::<Payload>::from_request(request(r#"{"password":"long-enough"}"#), &())
                .await
                .unwrap();
        assert_eq!(payload.password, "long-enough");
    }

    #[tokio::test]
    async fn test_rule_violation_reports_message() {
        let err = ValidatedJson::<Payload>::from_request(request(r#"{"password":"short"}"#), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("at least 8")));
    }

    #[test]
    fn test_from_bytes_validates() {
        let ValidatedJson(payload) =
            ValidatedJson::<Payload>::from_bytes(br#"{"password":"long-enough"}"#).unwrap();
        assert_eq!(payload.password, "long-enough");

        for body in [&br#"{"password":"short"}"#[..], b"not json"] {
            assert!(matches!(
                ValidatedJson::<Payload>::from_bytes(body),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let err = ValidatedJson::<Payload>::from_request(request("{"), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
