//! Command-line interface definition for Blobpilot
//!
//! This module defines the CLI structure using clap's derive API,
//! providing one subcommand per session, upload, and deletion operation.

use crate::generator::ContentMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Blobpilot - batch uploads into ledger-backed blob storage
///
/// Connect an account, drive batches of generated uploads through the
/// register/confirm/transfer protocol, and manage the upload history.
#[derive(Parser, Debug, Clone)]
#[command(name = "blobpilot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/blobpilot.yaml")]
    pub config: Option<String>,

    /// Override the session snapshot file
    #[arg(long, env = "BLOBPILOT_STORE")]
    pub store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Blobpilot
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a session from an account private key
    Connect {
        /// Ed25519 private key (hex, 0x-hex, or ed25519-priv- form)
        #[arg(long, env = "BLOBPILOT_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
    },

    /// Import blobs that already exist on the network into a session
    Import {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Blob names to import
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Run a batch of uploads and stream progress events as NDJSON
    Upload {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Content to generate: text or image
        #[arg(short, long, default_value = "text")]
        mode: ContentMode,

        /// Number of items to upload
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Idle wait between items in milliseconds
        #[arg(short, long)]
        delay_ms: Option<u64>,
    },

    /// Delete blobs from the ledger and storage network
    Delete {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Blob names to delete, in order
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List a session's uploads grouped by folder
    List {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Print machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Remove a session and its history
    Disconnect {
        /// Session identifier
        #[arg(short, long)]
        session: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/blobpilot.yaml".to_string()),
            store: None,
            verbose: false,
            command: Commands::List {
                session: String::new(),
                json: false,
            },
        }
    }
}
