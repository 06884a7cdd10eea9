//! AWS Secrets Manager adapter.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::Client;

use super::{non_empty, SecretSource};
use crate::errors::{AppError, AppResult};

/// Fetches secrets with `GetSecretValue`, accepting string or binary payloads.
#[derive(Clone)]
pub struct AwsSecretSource {
    client: Client,
}

impl AwsSecretSource {
    /// Build a client from the default AWS credential and region chain.
    pub async fn from_env() -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&shared))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretSource for AwsSecretSource {
    async fn get_secret_value(&self, path: &str) -> AppResult<Vec<u8>> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(path)
            .send()
            .await
            .map_err(|e| AppError::Secret(format!("get_secret_value {}: {}", path, e)))?;

        if let Some(text) = output.secret_string() {
            return non_empty(path, text.as_bytes().to_vec());
        }
        if let Some(blob) = output.secret_binary() {
            return non_empty(path, blob.as_ref().to_vec());
        }

        Err(AppError::Secret(format!("secret {} has no payload", path)))
    }
}
