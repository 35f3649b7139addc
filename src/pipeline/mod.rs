//! Upload and deletion orchestration
//!
//! - [`upload`] -- drives one item through generate, commit, register,
//!   confirm and transfer
//! - [`batch`] -- runs the item pipeline over a whole batch in a
//!   background task
//! - [`delete`] -- removes a list of names, blocking until done
//!
//! Everything the drivers need is bundled in a [`PipelineContext`], which
//! is cheap to clone into spawned tasks.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::events::{EventBroadcaster, ProgressEvent};
use crate::network::{Ledger, StorageNetwork};
use crate::session::SessionStore;

pub mod batch;
pub mod delete;
pub mod upload;

pub use batch::{BatchHandle, BatchRequest, BatchRunner, BatchSummary};
pub use delete::{run_deletion, DeletionOutcome, DeletionReport, DeletionSummary};
pub use upload::{ItemFailure, ItemOutcome, UploadItem};

/// Error-message markers that end a whole batch
const FATAL_MARKERS: &[&str] = &["INSUFFICIENT", "SEQUENCE"];

/// True if a failure message signals funds exhaustion or a sequencing
/// conflict
pub fn is_fatal_message(message: &str) -> bool {
    let upper = message.to_uppercase();
    FATAL_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Tunables the drivers read on every run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Bound on waiting for ledger finalization
    pub confirmation_timeout: Duration,
    /// Object lifetime from registration, saturated when out of range
    pub expiration: chrono::TimeDelta,
    /// Wait after each successful deletion
    pub deletion_cooldown: Duration,
}

impl PipelineSettings {
    /// Extract the pipeline settings from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            confirmation_timeout: config.ledger.confirmation_timeout(),
            expiration: chrono::TimeDelta::try_days(config.ledger.expiration_days)
                .unwrap_or(chrono::TimeDelta::MAX),
            deletion_cooldown: Duration::from_millis(config.deletion.cooldown_ms),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Shared handles used by every driver
#[derive(Clone)]
pub struct PipelineContext {
    /// Durable sessions
    pub store: SessionStore,
    /// Live event fan-out
    pub events: EventBroadcaster,
    /// Storage network collaborator
    pub storage: Arc<dyn StorageNetwork>,
    /// Ledger collaborator
    pub ledger: Arc<dyn Ledger>,
    /// Timeouts and cooldowns
    pub settings: PipelineSettings,
}

impl PipelineContext {
    /// Publish an event to the session's observers
    pub fn publish(&self, session_id: &str, event: ProgressEvent) {
        let delivered = self.events.publish(session_id, &event);
        tracing::trace!(
            session_id = %session_id,
            kind = event.kind(),
            observers = delivered,
            "Published event"
        );
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("store", &self.store.path())
            .field("storage", &self.storage)
            .field("ledger", &self.ledger)
            .field("settings", &self.settings)
            .finish()
    }
}
