//! ES384 bearer tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};

use super::KeyMaterial;
use crate::config::{SECONDS_PER_HOUR, TOKEN_LIFETIME_HOURS};
use crate::errors::{AppError, AppResult};

/// The only algorithm tokens are signed and accepted with.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::ES384;

/// Token claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Claims for `subject` valid for the fixed lifetime starting at `issued_at`.
    pub fn new(subject: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        let expires_at = issued_at + Duration::hours(TOKEN_LIFETIME_HOURS);
        Self {
            sub: subject.into(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }
}

pub(super) fn sign(keys: &KeyMaterial, claims: &Claims) -> AppResult<String> {
    let key = keys
        .signing_key()
        .ok_or_else(|| AppError::Signing("no private key loaded".into()))?;

    encode(&Header::new(TOKEN_ALGORITHM), claims, key).map_err(|e| AppError::Signing(e.to_string()))
}

fn validation() -> Validation {
    let mut validation = Validation::new(TOKEN_ALGORITHM);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation
}

pub(super) fn decode_claims(
    keys: &KeyMaterial,
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(token, keys.verifying_key(), &validation()).map(|data| data.claims)
}

/// Issues and verifies bearer tokens. Cheap to clone and safe to share.
#[derive(Debug, Clone)]
pub struct TokenAuthority {
    keys: Arc<KeyMaterial>,
}

impl TokenAuthority {
    pub fn new(keys: KeyMaterial) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }

    /// Token lifetime in seconds
    pub fn lifetime_seconds(&self) -> i64 {
        TOKEN_LIFETIME_HOURS * SECONDS_PER_HOUR
    }

    /// Issue a token for `subject`, valid for 24 hours from now.
    pub fn issue(&self, subject: &str) -> AppResult<String> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if it were `issued_at`.
    pub fn issue_at(&self, subject: &str, issued_at: DateTime<Utc>) -> AppResult<String> {
        if subject.is_empty() {
            return Err(AppError::Signing("empty subject".into()));
        }
        sign(&self.keys, &Claims::new(subject, issued_at))
    }

    /// Verify a token and return its subject.
    ///
    /// Every failure, whether structural, algorithm, signature or expiry,
    /// becomes [`AppError::Unauthorized`]. The reason is only logged at debug.
    pub fn verify(&self, token: &str) -> AppResult<String> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "token header rejected");
            AppError::Unauthorized
        })?;

        if header.alg != TOKEN_ALGORITHM {
            tracing::debug!(alg = ?header.alg, "token algorithm rejected");
            return Err(AppError::Unauthorized);
        }

        let claims = decode_claims(&self.keys, token).map_err(|e| {
            tracing::debug!(error = %e, "token verification failed");
            AppError::Unauthorized
        })?;

        if claims.sub.is_empty() {
            tracing::debug!("token has an empty subject");
            return Err(AppError::Unauthorized);
        }

        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::EncodingKey;

    use super::*;

    const PRIMARY_PRIVATE: &[u8] = include_bytes!("../../tests/fixtures/es384_primary_private.pem");
    const PRIMARY_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/es384_primary_public.pem");
    const OTHER_PRIVATE: &[u8] = include_bytes!("../../tests/fixtures/es384_other_private.pem");
    const OTHER_PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/es384_other_public.pem");

    fn authority() -> TokenAuthority {
        TokenAuthority::new(KeyMaterial::from_pem(PRIMARY_PRIVATE, PRIMARY_PUBLIC).unwrap())
    }

    fn reheader(token: &str, header_json: &str) -> String {
        let mut parts = token.splitn(2, '.');
        let _ = parts.next();
        let rest = parts.next().unwrap();
        format!("{}.{}", URL_SAFE_NO_PAD.encode(header_json), rest)
    }

    #[test]
    fn test_issue_then_verify_returns_subject() {
        let authority = authority();
        for subject in ["admin", "alice", "user.with.dots", "ünïcødé"] {
            let token = authority.issue(subject).unwrap();
            assert_eq!(authority.verify(&token).unwrap(), subject);
        }
    }

    #[test]
    fn test_claims_lifetime_is_24_hours() {
        let now = Utc::now();
        let claims = Claims::new("alice", now);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert_eq!(authority().lifetime_seconds(), 86400);
    }

    #[test]
    fn test_header_names_es384() {
        let token = authority().issue("alice").unwrap();
        assert_eq!(decode_header(&token).unwrap().alg, Algorithm::ES384);
    }

    #[test]
    fn test_expired_token_rejected() {
        let authority = authority();
        let issued_at = Utc::now() - Duration::hours(TOKEN_LIFETIME_HOURS) - Duration::minutes(1);
        let token = authority.issue_at("alice", issued_at).unwrap();
        assert!(matches!(authority.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_token_near_end_of_window_accepted() {
        let authority = authority();
        let issued_at = Utc::now() - Duration::hours(TOKEN_LIFETIME_HOURS) + Duration::minutes(5);
        let token = authority.issue_at("alice", issued_at).unwrap();
        assert_eq!(authority.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn test_foreign_key_pair_rejected() {
        let foreign =
            TokenAuthority::new(KeyMaterial::from_pem(OTHER_PRIVATE, OTHER_PUBLIC).unwrap());
        let token = foreign.issue("admin").unwrap();
        assert!(matches!(authority().verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_tampered_algorithm_rejected() {
        let authority = authority();
        let token = authority.issue("admin").unwrap();

        for header in [
            r#"{"alg":"HS384","typ":"JWT"}"#,
            r#"{"alg":"RS384","typ":"JWT"}"#,
            r#"{"alg":"ES256","typ":"JWT"}"#,
            r#"{"alg":"none","typ":"JWT"}"#,
        ] {
            let tampered = reheader(&token, header);
            assert!(
                matches!(authority.verify(&tampered), Err(AppError::Unauthorized)),
                "header {} accepted",
                header
            );
        }
    }

    #[test]
    fn test_hmac_with_public_key_as_secret_rejected() {
        let claims = Claims::new("admin", Utc::now());
        let forged = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(PRIMARY_PUBLIC),
        )
        .unwrap();
        assert!(matches!(authority().verify(&forged), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let authority = authority();
        let token = authority.issue("alice").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = serde_json::to_vec(&Claims::new("admin", Utc::now())).unwrap();
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(forged_claims),
            parts[2]
        );
        assert!(matches!(authority.verify(&forged), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_garbage_rejected() {
        let authority = authority();
        for token in ["", "garbage", "a.b.c", "...."] {
            assert!(matches!(authority.verify(token), Err(AppError::Unauthorized)));
        }
    }

    #[test]
    fn test_verify_only_keys_cannot_issue() {
        let authority = TokenAuthority::new(KeyMaterial::verify_only(PRIMARY_PUBLIC).unwrap());
        assert!(matches!(authority.issue("alice"), Err(AppError::Signing(_))));

        let token = self::authority().issue("alice").unwrap();
        assert_eq!(authority.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn test_empty_subject_not_issued() {
        assert!(matches!(authority().issue(""), Err(AppError::Signing(_))));
    }
}
