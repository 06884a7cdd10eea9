//! Secret retrieval.
//!
//! A [`SecretSource`] resolves a secret path such as `/ecdsa/private-key` to
//! raw bytes. Adapters only map their backend's failures onto
//! [`AppError::Secret`]; there is no retry or caching layer here.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, SecretBackend};
use crate::errors::{AppError, AppResult};

#[cfg(feature = "aws")]
mod aws;

#[cfg(feature = "aws")]
pub use aws::AwsSecretSource;

/// Named secret lookup.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the secret stored under `path`.
    ///
    /// # Errors
    /// [`AppError::Secret`] when the secret is missing, empty or the backend fails.
    async fn get_secret_value(&self, path: &str) -> AppResult<Vec<u8>>;
}

/// Build the secret source selected by configuration.
pub async fn from_config(config: &Config) -> AppResult<Arc<dyn SecretSource>> {
    match config.secret_backend {
        SecretBackend::Env => Ok(Arc::new(EnvSecretSource)),
        SecretBackend::File => Ok(Arc::new(FileSecretSource::new(&config.secrets_dir))),
        #[cfg(feature = "aws")]
        SecretBackend::Aws => Ok(Arc::new(AwsSecretSource::from_env().await)),
        #[cfg(not(feature = "aws"))]
        SecretBackend::Aws => Err(AppError::Config(
            "SECRET_BACKEND=aws requires the `aws` feature".into(),
        )),
    }
}

fn non_empty(path: &str, bytes: Vec<u8>) -> AppResult<Vec<u8>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::Secret(format!("secret {} is empty", path)));
    }
    Ok(bytes)
}

/// Reads secrets from environment variables.
///
/// `/ecdsa/private-key` is looked up as `ECDSA_PRIVATE_KEY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    /// Environment variable name for a secret path
    pub fn variable_name(path: &str) -> String {
        path.trim_matches('/')
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn get_secret_value(&self, path: &str) -> AppResult<Vec<u8>> {
        let name = Self::variable_name(path);
        let value = std::env::var(&name)
            .map_err(|_| AppError::Secret(format!("{} is not set (secret {})", name, path)))?;
        non_empty(path, value.into_bytes())
    }
}

/// Reads secrets from files under a root directory, e.g. mounted secrets.
#[derive(Debug, Clone)]
pub struct FileSecretSource {
    root: PathBuf,
}

impl FileSecretSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::Secret(format!("invalid secret path {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl SecretSource for FileSecretSource {
    async fn get_secret_value(&self, path: &str) -> AppResult<Vec<u8>> {
        let file = self.resolve(path)?;
        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|e| AppError::Secret(format!("{}: {}", file.display(), e)))?;
        non_empty(path, bytes)
    }
}

/// In-process secrets, used by tests and the memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretSource {
    secrets: HashMap<String, Vec<u8>>,
}

impl MemorySecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, path: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.secrets.insert(path.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretSource for MemorySecretSource {
    async fn get_secret_value(&self, path: &str) -> AppResult<Vec<u8>> {
        let bytes = self
            .secrets
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::Secret(format!("secret {} not found", path)))?;
        non_empty(path, bytes)
    }
}
