//! Blobpilot - batch upload orchestration library
//!
//! This library drives batches of generated content through a
//! ledger-backed storage network: each item is generated, committed,
//! registered on the ledger, confirmed and transferred, with live progress
//! fanned out to observers and results persisted per session.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Durable session store with per-session serialization
//! - `generator`: Text and image content sources
//! - `pipeline`: Per-item state machine, batch driver and deletion driver
//! - `events`: Progress events, per-session broadcaster and NDJSON framing
//! - `network`: Storage network and ledger collaborators
//! - `query`: Folder-grouped views of upload history
//! - `service`: The `BlobPilot` engine tying it all together
//! - `identity`: Account keys, addresses and signing
//! - `config`: Configuration management and validation
//! - `logging`: Tracing subscriber setup
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Handlers behind each CLI subcommand
//!
//! # Example
//!
//! ```no_run
//! use blobpilot::{BlobPilot, Config};
//! use blobpilot::cli::Cli;
//! use blobpilot::generator::ContentMode;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse();
//!     let config = Config::load("config/blobpilot.yaml", &cli)?;
//!     config.validate()?;
//!
//!     let pilot = BlobPilot::from_config(config).await?;
//!     let session = pilot.connect("0x...").await?;
//!     let mut events = pilot.subscribe(&session.session_id).await?;
//!     pilot
//!         .start_batch(&session.session_id, ContentMode::Text, Some(3), None)
//!         .await?;
//!     while let Some(event) = events.recv().await {
//!         if event.is_terminal() {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod identity;
pub mod logging;
pub mod network;
pub mod pipeline;
pub mod query;
pub mod service;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{PilotError, Result};
pub use events::{EventBroadcaster, ProgressEvent, Step, Subscription};
pub use service::{BlobPilot, ConnectedSession};
pub use session::{Session, SessionStore, UploadRecord};
