//! Migrate command - Storage migration management.

use super::Backend;
use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::AppResult;

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    tracing::info!("Running migration command...");

    let backend = Backend::from_config(&config).await?;
    let engine = backend.migrations(&config);

    match args.action {
        MigrateAction::Up => {
            let applied = engine.up().await?;
            tracing::info!(count = applied.len(), "Migrations completed successfully");
        }
        MigrateAction::Down => {
            tracing::warn!("Reverting all migrations...");
            let reverted = engine.down().await?;
            tracing::info!(count = reverted.len(), "Rollback completed successfully");
        }
        MigrateAction::Status => {
            for status in engine.status().await? {
                let state = if status.applied { "applied" } else { "pending" };
                println!("{}: {}", status.version, state);
            }
        }
    }

    Ok(())
}
