//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

/// User Account API - accounts, bearer tokens and profile images
#[derive(Parser, Debug)]
#[command(name = "user-account-api")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations, then start the HTTP server
    Serve(ServeArgs),

    /// Run storage migrations
    Migrate(MigrateArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "SERVER_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "SERVER_PORT")]
    pub port: u16,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Apply migrations whose version tag is missing
    Up,
    /// Revert every migration, newest first
    Down,
    /// Show which versions are applied
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["user-account-api", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, 8080),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_migrate_actions() {
        let cli = Cli::try_parse_from(["user-account-api", "-v", "migrate", "status"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Migrate(MigrateArgs {
                action: MigrateAction::Status
            })
        ));
        assert!(Cli::try_parse_from(["user-account-api", "migrate", "fresh"]).is_err());
    }
}
