//! Blobpilot - batch upload orchestration CLI
//!
#![doc = "Blobpilot - batch upload orchestration CLI"]
#![doc = "Main entry point for the Blobpilot command-line application."]

use anyhow::Result;

use blobpilot::cli::{Cli, Commands};
use blobpilot::commands;
use blobpilot::config::Config;
use blobpilot::logging::{bootstrap_subscriber, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration, surfacing override warnings before logging is set up
    let config_path = cli.config.as_deref().unwrap_or("config/blobpilot.yaml");
    let config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        Config::load(config_path, &cli)
    })?;

    // Logging goes to stderr; stdout carries command output
    init_logging(&config.logging)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Connect { private_key } => {
            tracing::info!("Connecting account");
            commands::session::connect(config, &private_key).await?;
            Ok(())
        }
        Commands::Import { session, names } => {
            tracing::info!(session_id = %session, count = names.len(), "Importing existing blobs");
            commands::session::import(config, &session, &names).await?;
            Ok(())
        }
        Commands::Upload {
            session,
            mode,
            count,
            delay_ms,
        } => {
            tracing::info!(session_id = %session, mode = %mode, "Starting upload batch");
            commands::upload::run_upload(config, &session, mode, count, delay_ms).await?;
            Ok(())
        }
        Commands::Delete { session, names } => {
            tracing::info!(session_id = %session, count = names.len(), "Starting bulk deletion");
            commands::delete::run_delete(config, &session, &names).await?;
            Ok(())
        }
        Commands::List { session, json } => {
            tracing::debug!(session_id = %session, "Listing uploads");
            commands::list::list_uploads(config, &session, json).await?;
            Ok(())
        }
        Commands::Disconnect { session } => {
            tracing::info!(session_id = %session, "Disconnecting session");
            commands::session::disconnect(config, &session).await?;
            Ok(())
        }
    }
}
