//! User Account API - Application entry point
//!
//! CLI-based entry point that dispatches to various commands.

use clap::Parser;

use user_account_api::{
    cli::{Cli, Commands},
    commands,
    config::Config,
    telemetry::LogConfig,
};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logging is configured once, before anything else runs
    LogConfig::from_env(cli.verbose).init();

    let result = match Config::from_env() {
        Ok(config) => {
            tracing::debug!(?config, "Configuration loaded");
            match cli.command {
                Commands::Serve(args) => commands::serve::execute(args, config).await,
                Commands::Migrate(args) => commands::migrate::execute(args, config).await,
            }
        }
        Err(e) => Err(e),
    };

    // Handle errors
    if let Err(e) = result {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
