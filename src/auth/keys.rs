//! ECDSA key material.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey};

use super::token::{self, Claims};
use crate::errors::{AppError, AppResult};
use crate::secrets::SecretSource;

/// Signing and verification keys, immutable once loaded.
///
/// The private key never leaves this struct; `Debug` prints neither key.
#[derive(Clone)]
pub struct KeyMaterial {
    signing: Option<EncodingKey>,
    verifying: DecodingKey,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("can_sign", &self.can_sign())
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Parse a PKCS#8 private key and an SPKI public key.
    ///
    /// # Errors
    /// [`AppError::Config`] if either PEM fails to parse or the two keys are
    /// not halves of the same P-384 pair.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> AppResult<Self> {
        let signing = EncodingKey::from_ec_pem(private_pem)
            .map_err(|e| AppError::Config(format!("invalid ECDSA private key: {}", e)))?;
        let keys = Self {
            signing: Some(signing),
            verifying: Self::parse_public(public_pem)?,
        };

        keys.check_pair()?;
        Ok(keys)
    }

    /// Verification-only keys. Issuing with these fails with [`AppError::Signing`].
    pub fn verify_only(public_pem: &[u8]) -> AppResult<Self> {
        Ok(Self {
            signing: None,
            verifying: Self::parse_public(public_pem)?,
        })
    }

    /// Fetch both PEMs from a secret source and parse them.
    pub async fn load(
        source: &dyn SecretSource,
        private_key_path: &str,
        public_key_path: &str,
    ) -> AppResult<Self> {
        let private_pem = source.get_secret_value(private_key_path).await?;
        let public_pem = source.get_secret_value(public_key_path).await?;

        let keys = Self::from_pem(&private_pem, &public_pem)?;
        tracing::info!(
            private_key = private_key_path,
            public_key = public_key_path,
            "ECDSA key material loaded"
        );
        Ok(keys)
    }

    pub fn can_sign(&self) -> bool {
        self.signing.is_some()
    }

    pub(crate) fn signing_key(&self) -> Option<&EncodingKey> {
        self.signing.as_ref()
    }

    pub(crate) fn verifying_key(&self) -> &DecodingKey {
        &self.verifying
    }

    fn parse_public(public_pem: &[u8]) -> AppResult<DecodingKey> {
        DecodingKey::from_ec_pem(public_pem)
            .map_err(|e| AppError::Config(format!("invalid ECDSA public key: {}", e)))
    }

    /// Sign a probe token and verify it with the public half.
    fn check_pair(&self) -> AppResult<()> {
        let probe = Claims::new("key-pair-probe", Utc::now());
        let encoded = token::sign(self, &probe)
            .map_err(|e| AppError::Config(format!("ECDSA private key unusable: {}", e)))?;

        token::decode_claims(self, &encoded).map_err(|e| {
            AppError::Config(format!(
                "ECDSA private and public keys do not form a pair: {}",
                e
            ))
        })?;
        Ok(())
    }
}
