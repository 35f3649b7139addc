//! The per-item upload state machine
//!
//! An item moves strictly forward through
//! `Pending -> Generated -> Committed -> Registered -> Confirmed -> Transferred`.
//! A `progress` event is published on entry to each user-visible step.
//! Any failure ends the item where it stands: nothing is recorded unless
//! the transfer succeeded.
//!
//! Cancellation is observed at every step boundary and while waiting for
//! ledger finalization.

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::{is_fatal_message, PipelineContext};
use crate::error::PilotError;
use crate::events::{ProgressEvent, Step};
use crate::generator::{ContentSource, GeneratedContent};
use crate::identity::Identity;
use crate::network::{Commitments, PendingTx, Registration};
use crate::session::UploadRecord;

/// Where an item currently stands, reported when it stops early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemState {
    /// Nothing done yet
    Pending,
    /// Bytes and name produced
    Generated,
    /// Commitments computed
    Committed,
    /// Registration transaction submitted
    Registered,
    /// Registration finalized on the ledger
    Confirmed,
    /// Bytes stored and record appended
    Transferred,
}

/// Why an item stopped short
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Step that failed
    pub step: Step,
    /// Failure description
    pub message: String,
}

impl ItemFailure {
    fn new(step: Step, err: impl std::fmt::Display) -> Self {
        Self {
            step,
            message: err.to_string(),
        }
    }

    /// True if this failure ends the whole batch
    pub fn is_fatal(&self) -> bool {
        is_fatal_message(&self.message)
    }
}

/// Final result of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Stored and recorded under `name`
    Uploaded {
        /// Storage name
        name: String,
    },
    /// Stopped by a step failure
    Failed(ItemFailure),
    /// Stopped by cancellation
    Cancelled,
}

/// One item of a batch
pub struct UploadItem<'a> {
    ctx: &'a PipelineContext,
    session_id: &'a str,
    identity: &'a Identity,
    source: &'a dyn ContentSource,
    token: &'a CancellationToken,
    index: usize,
    total: usize,
    state: ItemState,
}

type StepResult<T> = std::result::Result<T, ItemOutcome>;

impl<'a> UploadItem<'a> {
    /// Prepare item `index` (0-based) of a batch of `total`
    pub fn new(
        ctx: &'a PipelineContext,
        session_id: &'a str,
        identity: &'a Identity,
        source: &'a dyn ContentSource,
        token: &'a CancellationToken,
        index: usize,
        total: usize,
    ) -> Self {
        Self {
            ctx,
            session_id,
            identity,
            source,
            token,
            index,
            total,
            state: ItemState::Pending,
        }
    }

    /// 1-based position used in events
    pub fn current(&self) -> usize {
        self.index + 1
    }

    /// Drive the item to completion
    pub async fn run(mut self) -> ItemOutcome {
        match self.drive().await {
            Ok(name) => ItemOutcome::Uploaded { name },
            Err(outcome) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    item = self.current(),
                    state = ?self.state,
                    outcome = ?outcome,
                    "Item stopped"
                );
                outcome
            }
        }
    }

    async fn drive(&mut self) -> StepResult<String> {
        let content = self.generate().await?;
        let commitments = self.commit(&content).await?;
        let tx = self.register(&content, &commitments).await?;
        self.confirm(&tx).await?;
        self.transfer(&content, &tx).await?;
        Ok(content.name)
    }

    fn checkpoint(&self) -> StepResult<()> {
        if self.token.is_cancelled() {
            return Err(ItemOutcome::Cancelled);
        }
        Ok(())
    }

    fn progress(&self, step: Step, name: Option<&str>, hash: Option<&str>) {
        self.ctx.publish(
            self.session_id,
            ProgressEvent::Progress {
                current: self.current(),
                total: self.total,
                step,
                name: name.map(String::from),
                hash: hash.map(String::from),
            },
        );
    }

    async fn generate(&mut self) -> StepResult<GeneratedContent> {
        self.checkpoint()?;
        self.progress(Step::Generate, None, None);

        let content = self.source.generate(self.index).await;
        self.state = ItemState::Generated;
        Ok(content)
    }

    async fn commit(&mut self, content: &GeneratedContent) -> StepResult<Commitments> {
        self.checkpoint()?;
        self.progress(Step::Register, Some(&content.name), None);

        let commitments = self
            .ctx
            .storage
            .compute_commitments(&content.data)
            .await
            .map_err(|e| ItemOutcome::Failed(ItemFailure::new(Step::Register, e)))?;
        self.state = ItemState::Committed;
        Ok(commitments)
    }

    async fn register(
        &mut self,
        content: &GeneratedContent,
        commitments: &Commitments,
    ) -> StepResult<PendingTx> {
        self.checkpoint()?;

        let expires_at = Utc::now()
            .checked_add_signed(self.ctx.settings.expiration)
            .ok_or_else(|| {
                let err = PilotError::InvalidRequest(format!(
                    "expiration of {} days is out of range",
                    self.ctx.settings.expiration.num_days()
                ));
                ItemOutcome::Failed(ItemFailure::new(Step::Register, err))
            })?;
        let registration = Registration {
            name: content.name.clone(),
            root: commitments.root.clone(),
            size: content.data.len() as u64,
            expiration_micros: expires_at.timestamp_micros(),
        };
        let tx = self
            .ctx
            .ledger
            .register_object(self.identity, &registration)
            .await
            .map_err(|e| ItemOutcome::Failed(ItemFailure::new(Step::Register, e)))?;
        self.state = ItemState::Registered;
        Ok(tx)
    }

    async fn confirm(&mut self, tx: &PendingTx) -> StepResult<()> {
        self.checkpoint()?;
        self.progress(Step::Confirm, None, Some(&tx.hash));

        let bound = self.ctx.settings.confirmation_timeout;
        let wait = tokio::time::timeout(bound, self.ctx.ledger.wait_for_finalization(tx));

        tokio::select! {
            biased;

            _ = self.token.cancelled() => return Err(ItemOutcome::Cancelled),

            result = wait => match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    return Err(ItemOutcome::Failed(ItemFailure::new(Step::Confirm, e)));
                }
                Err(_) => {
                    let timeout = PilotError::ConfirmationTimeout {
                        tx_hash: tx.hash.clone(),
                        seconds: bound.as_secs(),
                    };
                    return Err(ItemOutcome::Failed(ItemFailure::new(Step::Confirm, timeout)));
                }
            },
        }

        self.state = ItemState::Confirmed;
        Ok(())
    }

    async fn transfer(&mut self, content: &GeneratedContent, tx: &PendingTx) -> StepResult<()> {
        self.checkpoint()?;
        self.progress(Step::Upload, None, None);

        let fail = |e: anyhow::Error| ItemOutcome::Failed(ItemFailure::new(Step::Upload, e));

        self.ctx
            .storage
            .put_object(&self.identity.address, &content.name, &content.data)
            .await
            .map_err(fail)?;

        let record = UploadRecord::uploaded(
            content.name.clone(),
            content.data.len() as u64,
            tx.hash.clone(),
        );
        self.ctx
            .store
            .append_upload(self.session_id, record)
            .await
            .map_err(fail)?;
        self.state = ItemState::Transferred;

        self.ctx.publish(
            self.session_id,
            ProgressEvent::Uploaded {
                name: content.name.clone(),
                current: self.current(),
            },
        );
        Ok(())
    }
}
