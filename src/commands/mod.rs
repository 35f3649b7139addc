//! Command handlers for the CLI
//!
//! Each handler builds what it needs from the loaded [`Config`] and
//! prints its result to stdout. Logging goes to stderr.
//!
//! - [`session`] -- connect, import, disconnect
//! - [`upload`] -- run a batch and stream its events as NDJSON
//! - [`delete`] -- bulk deletion with a per-name report
//! - [`list`] -- upload history as a table or JSON

use crate::config::Config;
use crate::error::Result;
use crate::service::BlobPilot;

pub mod delete;
pub mod list;
pub mod session;
pub mod upload;

/// Build the engine with REST collaborators
pub(crate) async fn engine(config: Config) -> Result<BlobPilot> {
    BlobPilot::from_config(config).await
}
