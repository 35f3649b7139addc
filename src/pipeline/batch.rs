//! Background batch driver
//!
//! [`BatchRunner::start`] validates the session, registers the batch as
//! active and spawns the loop; it returns as soon as the task is running.
//! Everything after that is observable only through the event broadcaster
//! and the session's upload history.
//!
//! At most one batch runs per session. A second start while one is
//! active is rejected with `PilotError::SessionBusy`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::upload::{ItemOutcome, UploadItem};
use super::PipelineContext;
use crate::error::{PilotError, Result};
use crate::events::ProgressEvent;
use crate::generator::ContentSource;
use crate::identity::Identity;

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Target session
    pub session_id: String,
    /// Items to attempt
    pub count: usize,
    /// Idle wait between items
    pub delay: Duration,
}

/// How a batch ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items requested
    pub total: usize,
    /// Items uploaded and recorded
    pub uploaded: usize,
    /// Items that failed
    pub failed: usize,
    /// True if a fatal failure stopped the batch
    pub fatal: bool,
    /// True if the batch was cancelled
    pub cancelled: bool,
}

/// Handle to a running batch
#[derive(Debug)]
pub struct BatchHandle {
    session_id: String,
    token: CancellationToken,
    join: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Session the batch runs for
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request cancellation; the loop stops at its next checkpoint
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the batch to finish
    ///
    /// # Errors
    ///
    /// Returns an error if the batch task panicked.
    pub async fn wait(self) -> Result<BatchSummary> {
        Ok(self.join.await?)
    }
}

struct ActiveBatch {
    id: u64,
    token: CancellationToken,
}

type ActiveMap = Arc<Mutex<HashMap<String, ActiveBatch>>>;

fn lock_active(active: &ActiveMap) -> std::sync::MutexGuard<'_, HashMap<String, ActiveBatch>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the active entry when the batch task ends, however it ends
struct ActiveGuard {
    active: ActiveMap,
    session_id: String,
    id: u64,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut active = lock_active(&self.active);
        if active.get(&self.session_id).map(|b| b.id) == Some(self.id) {
            active.remove(&self.session_id);
        }
    }
}

/// Starts and tracks batches
#[derive(Clone)]
pub struct BatchRunner {
    ctx: PipelineContext,
    active: ActiveMap,
    next_id: Arc<AtomicU64>,
}

impl BatchRunner {
    /// Create a runner over the shared pipeline context
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            ctx,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Pipeline context the runner drives
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Start a batch in the background
    ///
    /// # Errors
    ///
    /// - `PilotError::SessionNotFound` if the session does not exist
    /// - `PilotError::InvalidCredentials` if its stored key no longer parses
    /// - `PilotError::SessionBusy` if a batch is already running for it
    pub async fn start(
        &self,
        request: BatchRequest,
        source: Arc<dyn ContentSource>,
    ) -> Result<BatchHandle> {
        let session = self.ctx.store.get(&request.session_id).await?;
        let identity = Identity::from_private_key(&session.credentials)?;

        let token = CancellationToken::new();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut active = lock_active(&self.active);
            if active.contains_key(&request.session_id) {
                return Err(PilotError::SessionBusy(request.session_id.clone()).into());
            }
            active.insert(
                request.session_id.clone(),
                ActiveBatch {
                    id,
                    token: token.clone(),
                },
            );
        }

        let guard = ActiveGuard {
            active: self.active.clone(),
            session_id: request.session_id.clone(),
            id,
        };

        tracing::info!(
            session_id = %request.session_id,
            count = request.count,
            delay_ms = request.delay.as_millis() as u64,
            "Starting batch"
        );

        let ctx = self.ctx.clone();
        let session_id = request.session_id.clone();
        let task_token = token.clone();
        let join = tokio::spawn(async move {
            let _guard = guard;
            run_batch(ctx, request, identity, source, task_token).await
        });

        Ok(BatchHandle {
            session_id,
            token,
            join,
        })
    }

    /// Cancel the running batch of a session
    ///
    /// Returns `false` if no batch was running.
    pub fn cancel(&self, session_id: &str) -> bool {
        match lock_active(&self.active).get(session_id) {
            Some(batch) => {
                batch.token.cancel();
                tracing::info!(session_id = %session_id, "Cancelling batch");
                true
            }
            None => false,
        }
    }

    /// True while a batch is running for the session
    pub fn is_active(&self, session_id: &str) -> bool {
        lock_active(&self.active).contains_key(session_id)
    }
}

async fn run_batch(
    ctx: PipelineContext,
    request: BatchRequest,
    identity: Identity,
    source: Arc<dyn ContentSource>,
    token: CancellationToken,
) -> BatchSummary {
    let session_id = request.session_id.as_str();
    let total = request.count;
    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };

    ctx.publish(session_id, ProgressEvent::Start { total });

    for index in 0..total {
        let current = index + 1;
        let outcome = UploadItem::new(
            &ctx,
            session_id,
            &identity,
            source.as_ref(),
            &token,
            index,
            total,
        )
        .run()
        .await;

        match outcome {
            ItemOutcome::Uploaded { name } => {
                tracing::info!(session_id = %session_id, item = current, name = %name, "Item uploaded");
                summary.uploaded += 1;
            }
            ItemOutcome::Failed(failure) => {
                tracing::warn!(
                    session_id = %session_id,
                    item = current,
                    step = ?failure.step,
                    error = %failure.message,
                    "Item failed"
                );
                summary.failed += 1;
                ctx.publish(
                    session_id,
                    ProgressEvent::Error {
                        current,
                        message: failure.message.clone(),
                    },
                );
                if failure.is_fatal() {
                    tracing::error!(session_id = %session_id, item = current, "Fatal failure, stopping batch");
                    summary.fatal = true;
                    ctx.publish(
                        session_id,
                        ProgressEvent::Fatal {
                            message: failure.message,
                        },
                    );
                    break;
                }
            }
            ItemOutcome::Cancelled => {
                summary.cancelled = true;
                ctx.publish(session_id, ProgressEvent::Cancelled { current });
                break;
            }
        }

        if current < total {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    summary.cancelled = true;
                    ctx.publish(session_id, ProgressEvent::Cancelled { current: current + 1 });
                    break;
                }

                _ = tokio::time::sleep(request.delay) => {}
            }
        }
    }

    ctx.publish(
        session_id,
        ProgressEvent::Done {
            total,
            uploaded: summary.uploaded,
        },
    );

    tracing::info!(
        session_id = %session_id,
        total = summary.total,
        uploaded = summary.uploaded,
        failed = summary.failed,
        fatal = summary.fatal,
        cancelled = summary.cancelled,
        "Batch finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBroadcaster;
    use crate::generator::TextGenerator;
    use crate::network::{FakeLedger, FakeStorage};
    use crate::pipeline::PipelineSettings;
    use crate::session::SessionStore;
    use tempfile::TempDir;

    const KEY: &str = "9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

    async fn runner() -> (BatchRunner, Arc<FakeLedger>, String, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path().join("sessions.json"))
            .await
            .unwrap();
        let session = store.create(KEY).await.unwrap();
        let ledger = Arc::new(FakeLedger::new());
        let ctx = PipelineContext {
            store,
            events: EventBroadcaster::new(),
            storage: Arc::new(FakeStorage::new()),
            ledger: ledger.clone(),
            settings: PipelineSettings::default(),
        };
        (BatchRunner::new(ctx), ledger, session.id, dir)
    }

    fn request(session_id: &str, count: usize, delay_ms: u64) -> BatchRequest {
        BatchRequest {
            session_id: session_id.to_string(),
            count,
            delay: Duration::from_millis(delay_ms),
        }
    }

    #[tokio::test]
    async fn test_batch_uploads_every_item() {
        let (runner, _ledger, session_id, _dir) = runner().await;
        let handle = runner
            .start(request(&session_id, 3, 0), Arc::new(TextGenerator))
            .await
            .unwrap();

        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.uploaded, 3);
        assert_eq!(summary.failed, 0);
        assert!(!runner.is_active(&session_id));
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_while_running() {
        let (runner, _ledger, session_id, _dir) = runner().await;
        let handle = runner
            .start(request(&session_id, 2, 10_000), Arc::new(TextGenerator))
            .await
            .unwrap();

        let err = runner
            .start(request(&session_id, 1, 0), Arc::new(TextGenerator))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PilotError>(),
            Some(PilotError::SessionBusy(_))
        ));

        assert!(runner.cancel(&session_id));
        let summary = handle.wait().await.unwrap();
        assert!(summary.cancelled);
        assert!(!runner.is_active(&session_id));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (runner, _ledger, _session_id, _dir) = runner().await;
        let err = runner
            .start(request("missing", 1, 0), Arc::new(TextGenerator))
            .await
            .unwrap_err();
        assert!(crate::error::is_not_found(&err));
    }

    #[tokio::test]
    async fn test_non_fatal_failure_continues() {
        let (runner, ledger, session_id, _dir) = runner().await;
        ledger.fail_registration(1, "connection reset by peer");

        let summary = runner
            .start(request(&session_id, 3, 0), Arc::new(TextGenerator))
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.fatal);
    }

    #[tokio::test]
    async fn test_cancel_without_batch_is_false() {
        let (runner, _ledger, session_id, _dir) = runner().await;
        assert!(!runner.cancel(&session_id));
    }
}
