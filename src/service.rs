//! Outward-facing operations over sessions, batches and events
//!
//! [`BlobPilot`] owns the store, the broadcaster, the collaborators and
//! the batch runner, and exposes the operations a transport layer or the
//! CLI needs: session lifecycle, batch upload, bulk delete, listing and
//! live event subscription.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{PilotError, Result};
use crate::events::{EventBroadcaster, Subscription};
use crate::generator::{self, ContentMode, ContentSource};
use crate::identity::short_address;
use crate::network::{HttpLedgerClient, HttpStorageClient, Ledger, StorageNetwork};
use crate::pipeline::{
    run_deletion, BatchHandle, BatchRequest, BatchRunner, DeletionReport, PipelineContext,
    PipelineSettings,
};
use crate::query::UploadListing;
use crate::session::{ImportOutcome, Session, SessionStore};

/// Result of connecting an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedSession {
    /// New session id
    pub session_id: String,
    /// Full account address
    pub address: String,
    /// Abbreviated address for display
    pub short_address: String,
}

/// The orchestration engine
#[derive(Clone)]
pub struct BlobPilot {
    config: Arc<Config>,
    runner: BatchRunner,
}

impl BlobPilot {
    /// Build the engine over explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns an error if the session snapshot exists but cannot be read.
    pub async fn new(
        config: Config,
        storage: Arc<dyn StorageNetwork>,
        ledger: Arc<dyn Ledger>,
    ) -> Result<Self> {
        let store = SessionStore::open(&config.store.path).await?;
        let ctx = PipelineContext {
            store,
            events: EventBroadcaster::new(),
            storage,
            ledger,
            settings: PipelineSettings::from_config(&config),
        };

        Ok(Self {
            config: Arc::new(config),
            runner: BatchRunner::new(ctx),
        })
    }

    /// Build the engine with REST collaborators from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built or the session
    /// snapshot cannot be read.
    pub async fn from_config(config: Config) -> Result<Self> {
        let storage = Arc::new(HttpStorageClient::new(&config.network)?);
        let ledger = Arc::new(HttpLedgerClient::new(&config.network, &config.ledger)?);
        Self::new(config, storage, ledger).await
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared pipeline handles
    pub fn context(&self) -> &PipelineContext {
        self.runner.context()
    }

    /// Create a session from raw key material
    ///
    /// # Errors
    ///
    /// Returns `PilotError::InvalidCredentials` if the key cannot be parsed.
    pub async fn connect(&self, raw_key: &str) -> Result<ConnectedSession> {
        let session = self.context().store.create(raw_key).await?;
        Ok(ConnectedSession {
            short_address: short_address(&session.address),
            session_id: session.id,
            address: session.address,
        })
    }

    /// Fetch a session
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.context().store.get(session_id).await
    }

    /// Record names that already exist remotely
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn import_existing(
        &self,
        session_id: &str,
        names: &[String],
    ) -> Result<ImportOutcome> {
        self.context().store.import_existing(session_id, names).await
    }

    /// Start a batch with the generator for `mode`
    ///
    /// `count` and `delay_ms` fall back to the configured defaults.
    ///
    /// # Errors
    ///
    /// - `PilotError::InvalidRequest` if `count` is zero or above the limit
    /// - `PilotError::SessionNotFound` if the id is unknown
    /// - `PilotError::SessionBusy` if a batch is already running
    pub async fn start_batch(
        &self,
        session_id: &str,
        mode: ContentMode,
        count: Option<usize>,
        delay_ms: Option<u64>,
    ) -> Result<BatchHandle> {
        let source = generator::for_mode(mode, &self.config.generator)?;
        self.start_batch_with_source(session_id, source, count, delay_ms)
            .await
    }

    /// Start a batch with a caller-supplied content source
    ///
    /// # Errors
    ///
    /// Same as [`BlobPilot::start_batch`].
    pub async fn start_batch_with_source(
        &self,
        session_id: &str,
        source: Arc<dyn ContentSource>,
        count: Option<usize>,
        delay_ms: Option<u64>,
    ) -> Result<BatchHandle> {
        let count = count.unwrap_or(self.config.batch.default_count);
        if count == 0 || count > self.config.batch.max_count {
            return Err(PilotError::InvalidRequest(format!(
                "count must be between 1 and {}, got {}",
                self.config.batch.max_count, count
            ))
            .into());
        }
        let delay = Duration::from_millis(delay_ms.unwrap_or(self.config.batch.default_delay_ms));

        self.runner
            .start(
                BatchRequest {
                    session_id: session_id.to_string(),
                    count,
                    delay,
                },
                source,
            )
            .await
    }

    /// Cancel the running batch of a session; `false` if none was running
    pub fn cancel_batch(&self, session_id: &str) -> bool {
        self.runner.cancel(session_id)
    }

    /// True while a batch is running for the session
    pub fn is_batch_active(&self, session_id: &str) -> bool {
        self.runner.is_active(session_id)
    }

    /// Delete names, blocking until every one was handled
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn delete_blobs(&self, session_id: &str, names: &[String]) -> Result<DeletionReport> {
        run_deletion(self.context(), session_id, names).await
    }

    /// Upload history, flat and grouped by folder
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn list_uploads(&self, session_id: &str) -> Result<UploadListing> {
        let session = self.get_session(session_id).await?;
        Ok(UploadListing::from_session(&session))
    }

    /// Attach a live observer to a session's events
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn subscribe(&self, session_id: &str) -> Result<Subscription> {
        if !self.context().store.contains(session_id).await {
            return Err(PilotError::SessionNotFound(session_id.to_string()).into());
        }
        Ok(self.context().events.subscribe(session_id))
    }

    /// Tear down a session: cancel its batch, drop its observers, forget it
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn disconnect(&self, session_id: &str) -> Result<()> {
        self.context().store.delete(session_id).await?;
        self.runner.cancel(session_id);
        let observers = self.context().events.close_session(session_id);
        tracing::info!(session_id = %session_id, observers, "Disconnected session");
        Ok(())
    }
}
