//! Cursor pagination for list endpoints.
//!
//! Storage adapters walk their data with a native "last evaluated key": a
//! small ordered map of key attribute names to typed values. [`PageCursor`]
//! turns that map into an opaque, URL-safe `next_token` and back again.
//! The empty string means "first page" in requests and "no more pages" in
//! responses.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::errors::{AppError, AppResult};

/// A typed key attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Number, kept in its decimal text form
    N(String),
    /// Binary
    B(Vec<u8>),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(value) => Some(value),
            _ => None,
        }
    }
}

/// Native continuation key of a storage scan. Empty means "no position".
pub type LastKey = BTreeMap<String, AttributeValue>;

/// Opaque codec between [`LastKey`] and `next_token` strings.
///
/// The codec never looks at attribute names or types; schema checks belong
/// to the storage adapter that consumes the decoded key.
pub struct PageCursor;

impl PageCursor {
    /// Encode a last key. An empty key encodes to `""`.
    pub fn encode(key: &LastKey) -> AppResult<String> {
        if key.is_empty() {
            return Ok(String::new());
        }

        let bytes = serde_json::to_vec(key)
            .map_err(|e| AppError::internal(format!("cursor encoding failed: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Decode a cursor. `""` decodes to the empty key.
    ///
    /// # Errors
    /// [`AppError::InvalidCursor`] when the text is not valid base64url or the
    /// bytes are not a well-formed key map. Decoding is all-or-nothing.
    pub fn decode(cursor: &str) -> AppResult<LastKey> {
        if cursor.is_empty() {
            return Ok(LastKey::new());
        }

        let bytes = URL_SAFE_NO_PAD.decode(cursor).map_err(|e| {
            tracing::debug!(error = %e, "cursor is not valid base64url");
            AppError::InvalidCursor
        })?;

        serde_json::from_slice::<LastKey>(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "cursor payload is not a key map");
            AppError::InvalidCursor
        })
    }
}

/// Pagination query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRequest {
    pub limit: Option<u64>,
    pub next_token: Option<String>,
}

impl PageRequest {
    pub fn new(limit: u64, next_token: impl Into<String>) -> Self {
        Self {
            limit: Some(limit),
            next_token: Some(next_token.into()),
        }
    }

    /// Requested page size, clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Continuation token, `""` for the first page
    pub fn token(&self) -> &str {
        self.next_token.as_deref().unwrap_or_default()
    }
}

/// One page of results plus the token for the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub next_token: String,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, next_token: String) -> Self {
        Self { data, next_token }
    }

    /// Whether another page follows this one
    pub fn has_more(&self) -> bool {
        !self.next_token.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            next_token: self.next_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(pairs: &[(&str, AttributeValue)]) -> LastKey {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_empty_key_is_empty_token() {
        assert_eq!(PageCursor::encode(&LastKey::new()).unwrap(), "");
        assert!(PageCursor::decode("").unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_types() {
        let original = key(&[
            ("username", AttributeValue::S("alice".into())),
            ("score", AttributeValue::N("-12.50".into())),
            ("blob", AttributeValue::B(vec![0, 255, 7])),
        ]);

        let token = PageCursor::encode(&original).unwrap();
        assert!(!token.is_empty());
        assert_eq!(PageCursor::decode(&token).unwrap(), original);
    }

    #[test]
    fn test_token_is_url_safe() {
        let original = key(&[("username", AttributeValue::S("ä/+?&=".repeat(10)))]);
        let token = PageCursor::encode(&original).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(
            PageCursor::decode("not-valid-base64!!"),
            Err(AppError::InvalidCursor)
        ));
    }

    #[test]
    fn test_non_map_payload_rejected() {
        let token = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        assert!(matches!(PageCursor::decode(&token), Err(AppError::InvalidCursor)));
    }

    #[test]
    fn test_unknown_attribute_type_rejected() {
        let token = URL_SAFE_NO_PAD.encode(br#"{"username":{"S":"alice"},"x":{"BOOL":true}}"#);
        assert!(matches!(PageCursor::decode(&token), Err(AppError::InvalidCursor)));
    }

    #[test]
    fn test_truncated_token_rejected() {
        let token = PageCursor::encode(&key(&[(
            "username",
            AttributeValue::S("alice".into()),
        )]))
        .unwrap();
        let truncated = &token[..token.len() - 4];
        assert!(matches!(PageCursor::decode(truncated), Err(AppError::InvalidCursor)));
    }

    #[test]
    fn test_page_request_limit_clamped() {
        assert_eq!(PageRequest::default().limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::new(0, "").limit(), 1);
        assert_eq!(PageRequest::new(10_000, "").limit(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::default().token(), "");
    }
}
