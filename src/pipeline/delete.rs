//! Blocking bulk deletion
//!
//! Names are processed strictly in order. For each one the object is
//! removed from the storage network on a best-effort basis, then a ledger
//! deletion is submitted and confirmed. Only the ledger result decides the
//! item's success; on success the matching records leave the session's
//! history and the driver cools down before the next name.

use serde::{Deserialize, Serialize};

use super::PipelineContext;
use crate::error::{PilotError, Result};
use crate::identity::Identity;

/// Result for one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    /// Storage name
    pub name: String,
    /// True if the ledger deletion finalized
    pub success: bool,
    /// Failure description when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSummary {
    /// Names deleted
    pub deleted: usize,
    /// Names that failed
    pub failed: usize,
}

/// Full result of a deletion run, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    /// Per-name results
    pub results: Vec<DeletionOutcome>,
    /// Aggregate counts
    pub summary: DeletionSummary,
}

impl DeletionOutcome {
    fn deleted(name: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            error: None,
        }
    }

    fn failed(name: &str, err: impl std::fmt::Display) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            error: Some(err.to_string()),
        }
    }
}

impl DeletionReport {
    fn push(&mut self, outcome: DeletionOutcome) {
        if outcome.success {
            self.summary.deleted += 1;
        } else {
            self.summary.failed += 1;
        }
        self.results.push(outcome);
    }
}

/// Delete `names` for a session, returning once every name was handled
///
/// # Errors
///
/// Returns `PilotError::SessionNotFound` if the session does not exist
/// when the run starts. Per-name failures are reported in the returned
/// report instead; if the session disappears mid-run, the names not yet
/// attempted are reported as failed.
pub async fn run_deletion(
    ctx: &PipelineContext,
    session_id: &str,
    names: &[String],
) -> Result<DeletionReport> {
    let session = ctx.store.get(session_id).await?;
    let identity = Identity::from_private_key(&session.credentials)?;

    tracing::info!(session_id = %session_id, count = names.len(), "Starting deletion");

    let mut report = DeletionReport::default();
    let mut names_left = names.iter().enumerate();
    while let Some((index, name)) = names_left.next() {
        let outcome = match delete_one(ctx, &identity, name).await {
            Ok(()) => match ctx.store.remove_upload(session_id, name).await {
                Ok(removed) => {
                    tracing::info!(
                        session_id = %session_id,
                        name = %name,
                        records = removed,
                        "Deleted"
                    );
                    DeletionOutcome::deleted(name)
                }
                Err(e) if crate::error::is_not_found(&e) => {
                    // ledger already finalized this one; the rest are skipped
                    tracing::warn!(
                        session_id = %session_id,
                        name = %name,
                        "Session closed during deletion"
                    );
                    report.push(DeletionOutcome::deleted(name));
                    for (_, skipped) in names_left.by_ref() {
                        report.push(DeletionOutcome::failed(skipped, &e));
                    }
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        name = %name,
                        error = %e,
                        "Deleted on the ledger but history was not updated"
                    );
                    DeletionOutcome::deleted(name)
                }
            },
            Err(e) => {
                tracing::warn!(session_id = %session_id, name = %name, error = %e, "Deletion failed");
                DeletionOutcome::failed(name, &e)
            }
        };

        let cool_down = outcome.success && index + 1 < names.len();
        report.push(outcome);
        if cool_down {
            tokio::time::sleep(ctx.settings.deletion_cooldown).await;
        }
    }

    tracing::info!(
        session_id = %session_id,
        deleted = report.summary.deleted,
        failed = report.summary.failed,
        "Deletion finished"
    );
    Ok(report)
}

async fn delete_one(ctx: &PipelineContext, identity: &Identity, name: &str) -> Result<()> {
    if let Err(e) = ctx.storage.delete_object(&identity.address, name).await {
        tracing::debug!(name = %name, error = %e, "Storage deletion failed, continuing");
    }

    let tx = ctx.ledger.delete_object(identity, name).await?;

    let bound = ctx.settings.confirmation_timeout;
    match tokio::time::timeout(bound, ctx.ledger.wait_for_finalization(&tx)).await {
        Ok(result) => result,
        Err(_) => Err(PilotError::ConfirmationTimeout {
            tx_hash: tx.hash,
            seconds: bound.as_secs(),
        }
        .into()),
    }
}
