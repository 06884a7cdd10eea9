//! Logging setup.
//!
//! The subscriber is configured from an explicit [`LogConfig`] value built
//! once at startup and handed to [`LogConfig::init`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::DEFAULT_LOG_LEVEL;

/// Logging configuration for the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `user_account_api=debug,tower_http=info`
    pub filter: String,
    /// Emit ANSI colour codes
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_LEVEL.to_string(),
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Resolve the filter: `--verbose` wins, then `RUST_LOG`, then `LOG_LEVEL`.
    pub fn resolve(verbose: bool, rust_log: Option<String>, log_level: Option<String>) -> Self {
        let filter = if verbose {
            "debug".to_string()
        } else {
            rust_log
                .or(log_level)
                .map(|level| level.trim().to_ascii_lowercase())
                .filter(|level| !level.is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
        };

        Self {
            filter,
            ..Self::default()
        }
    }

    /// Read `RUST_LOG` / `LOG_LEVEL` from the environment.
    pub fn from_env(verbose: bool) -> Self {
        Self::resolve(
            verbose,
            std::env::var("RUST_LOG").ok(),
            std::env::var("LOG_LEVEL").ok(),
        )
    }

    /// Install the global subscriber. Call once, before any other work.
    pub fn init(&self) {
        let filter = EnvFilter::try_new(&self.filter)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_ansi(self.ansi))
            .with(filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_everything() {
        let config = LogConfig::resolve(true, Some("warn".into()), Some("error".into()));
        assert_eq!(config.filter, "debug");
    }

    #[test]
    fn test_rust_log_before_log_level() {
        let config = LogConfig::resolve(false, Some("trace".into()), Some("warn".into()));
        assert_eq!(config.filter, "trace");

        let config = LogConfig::resolve(false, None, Some("WARN".into()));
        assert_eq!(config.filter, "warn");
    }

    #[test]
    fn test_default_level() {
        assert_eq!(LogConfig::resolve(false, None, None).filter, "info");
        assert_eq!(LogConfig::resolve(false, None, Some("  ".into())).filter, "info");
    }
}
