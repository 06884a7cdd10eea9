//! Application settings loaded from environment variables.

use std::{env, path::PathBuf, str::FromStr};

use super::constants::{
    DEFAULT_ADMIN_PASSWORD, DEFAULT_DATABASE_URL, DEFAULT_LOG_LEVEL,
    DEFAULT_PRIVATE_KEY_SECRET_PATH, DEFAULT_PROFILE_STORAGE_DIR, DEFAULT_PUBLIC_KEY_SECRET_PATH,
    DEFAULT_SECRETS_DIR, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
};
use crate::errors::{AppError, AppResult};

/// Where user records and migration bookkeeping live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Config(format!("unknown STORAGE_BACKEND '{}'", other))),
        }
    }
}

/// Where key material is fetched from at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretBackend {
    Env,
    File,
    Aws,
}

impl FromStr for SecretBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "file" => Ok(Self::File),
            "aws" => Ok(Self::Aws),
            other => Err(AppError::Config(format!("unknown SECRET_BACKEND '{}'", other))),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub log_level: String,
    pub storage_backend: StorageBackend,
    pub database_url: String,
    pub secret_backend: SecretBackend,
    pub secrets_dir: PathBuf,
    pub private_key_secret_path: String,
    pub public_key_secret_path: String,
    pub profile_storage_dir: PathBuf,
    admin_initial_password: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("log_level", &self.log_level)
            .field("storage_backend", &self.storage_backend)
            .field("database_url", &"[REDACTED]")
            .field("secret_backend", &self.secret_backend)
            .field("secrets_dir", &self.secrets_dir)
            .field("private_key_secret_path", &self.private_key_secret_path)
            .field("public_key_secret_path", &self.public_key_secret_path)
            .field("profile_storage_dir", &self.profile_storage_dir)
            .field("admin_initial_password", &"[REDACTED]")
            .finish()
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let server_port = match lookup("SERVER_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("invalid SERVER_PORT '{}'", raw)))?,
            None => DEFAULT_SERVER_PORT,
        };

        Ok(Self {
            server_host: get("SERVER_HOST", DEFAULT_SERVER_HOST),
            server_port,
            log_level: get("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            storage_backend: get("STORAGE_BACKEND", "postgres").parse()?,
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            secret_backend: get("SECRET_BACKEND", "env").parse()?,
            secrets_dir: PathBuf::from(get("SECRETS_DIR", DEFAULT_SECRETS_DIR)),
            private_key_secret_path: get(
                "ECDSA_PRIVATE_KEY_SECRET_PATH",
                DEFAULT_PRIVATE_KEY_SECRET_PATH,
            ),
            public_key_secret_path: get(
                "ECDSA_PUBLIC_KEY_SECRET_PATH",
                DEFAULT_PUBLIC_KEY_SECRET_PATH,
            ),
            profile_storage_dir: PathBuf::from(get(
                "PROFILE_STORAGE_DIR",
                DEFAULT_PROFILE_STORAGE_DIR,
            )),
            admin_initial_password: get("ADMIN_INITIAL_PASSWORD", DEFAULT_ADMIN_PASSWORD),
        })
    }

    /// Placeholder password seeded for the bootstrap administrator.
    pub fn admin_initial_password(&self) -> &str {
        &self.admin_initial_password
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.secret_backend, SecretBackend::Env);
        assert_eq!(config.private_key_secret_path, "/ecdsa/private-key");
        assert_eq!(config.admin_initial_password(), "admin");
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "9000"),
            ("STORAGE_BACKEND", "Memory"),
            ("SECRET_BACKEND", "file"),
            ("SECRETS_DIR", "/tmp/keys"),
        ]))
        .unwrap();
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.secret_backend, SecretBackend::File);
        assert_eq!(config.secrets_dir, PathBuf::from("/tmp/keys"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("SERVER_PORT", "eighty")])),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("STORAGE_BACKEND", "dynamo")])),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_lookup(lookup(&[(
            "DATABASE_URL",
            "postgres://user:hunter2@db/accounts",
        )]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
