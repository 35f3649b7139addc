//! Batch upload command
//!
//! Subscribes before starting so the `start` event is never missed, then
//! writes one NDJSON frame per event to stdout until `done`. Ctrl-C
//! cancels the batch; the remaining `cancelled` and `done` frames are
//! still printed.

use std::io::Write;

use futures::{future, StreamExt};

use crate::config::Config;
use crate::error::Result;
use crate::events::ndjson_frames;
use crate::generator::ContentMode;

/// Run a batch and stream its events
pub async fn run_upload(
    config: Config,
    session_id: &str,
    mode: ContentMode,
    count: Option<usize>,
    delay_ms: Option<u64>,
) -> Result<()> {
    let pilot = super::engine(config).await?;
    let events = pilot.subscribe(session_id).await?;
    let handle = pilot.start_batch(session_id, mode, count, delay_ms).await?;

    // stop right after the terminal event
    let until_done = events.scan(false, |finished, event| {
        if *finished {
            return future::ready(None);
        }
        *finished = event.is_terminal();
        future::ready(Some(event))
    });
    let mut frames = Box::pin(ndjson_frames(until_done));

    let mut interrupted = false;
    loop {
        tokio::select! {
            frame = frames.next() => {
                let Some(frame) = frame else { break };
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(frame.as_bytes())?;
                stdout.flush()?;
            }
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                tracing::warn!(session_id = %session_id, "Interrupted, cancelling batch");
                interrupted = true;
                handle.cancel();
            }
        }
    }

    let summary = handle.wait().await?;
    tracing::info!(
        uploaded = summary.uploaded,
        failed = summary.failed,
        "Upload command finished"
    );
    Ok(())
}
