//! Newline-delimited JSON framing for event streams
//!
//! One event per line, no trailing commas, no envelope. A consumer can
//! split on `\n` and parse each line independently.

use futures::{Stream, StreamExt};

use super::ProgressEvent;
use crate::error::{PilotError, Result};

/// Encode one event as a single NDJSON frame, newline included
pub fn encode_frame(event: &ProgressEvent) -> Result<String> {
    let mut line = serde_json::to_string(event).map_err(PilotError::from)?;
    line.push('\n');
    Ok(line)
}

/// Map an event stream onto NDJSON frames
///
/// Events that fail to encode are logged and skipped so one bad frame
/// does not end the stream.
pub fn ndjson_frames<S>(events: S) -> impl Stream<Item = String>
where
    S: Stream<Item = ProgressEvent>,
{
    events.filter_map(|event| async move {
        match encode_frame(&event) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(kind = event.kind(), error = %e, "Failed to encode event frame");
                None
            }
        }
    })
}
