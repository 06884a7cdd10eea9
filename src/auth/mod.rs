//! Token authentication.
//!
//! [`KeyMaterial`] holds the ECDSA P-384 key pair loaded at startup and
//! [`TokenAuthority`] issues and verifies ES384 bearer tokens with it. The
//! HTTP guard that consumes verified subjects lives in `api::middleware`.

mod keys;
mod token;

pub use keys::KeyMaterial;
pub use token::{Claims, TokenAuthority, TOKEN_ALGORITHM};
