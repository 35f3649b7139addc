//! Progress events and their live fan-out
//!
//! - [`ProgressEvent`] -- the ephemeral events a batch emits
//! - [`broadcaster::EventBroadcaster`] -- per-session registry of observers
//! - [`frame`] -- newline-delimited JSON framing for observer streams
//!
//! Events are never persisted and never replayed: an observer sees only
//! what is published after it subscribed.

use serde::{Deserialize, Serialize};

pub mod broadcaster;
pub mod frame;

pub use broadcaster::{EventBroadcaster, Subscription};
pub use frame::{encode_frame, ndjson_frames};

/// Pipeline step named in `progress` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Producing the item's bytes and name
    Generate,
    /// Computing commitments and registering on the ledger
    Register,
    /// Waiting for ledger finalization
    Confirm,
    /// Transferring bytes to the storage network
    Upload,
}

/// A progress event for one session's batch
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"progress","current":1,"total":3,"step":"generate"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Emitted once before the first item
    Start {
        /// Items requested
        total: usize,
    },
    /// Emitted on entry to each step of an item
    Progress {
        /// 1-based item position
        current: usize,
        /// Items requested
        total: usize,
        /// Step being entered
        step: Step,
        /// Storage name, once known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Pending transaction hash, while confirming
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hash: Option<String>,
    },
    /// An item completed and was recorded
    Uploaded {
        /// Storage name
        name: String,
        /// 1-based item position
        current: usize,
    },
    /// An item failed; the batch may continue
    Error {
        /// 1-based item position
        current: usize,
        /// Failure description
        message: String,
    },
    /// A failure that ends the batch
    Fatal {
        /// Failure description
        message: String,
    },
    /// The batch was cancelled before item `current` finished
    Cancelled {
        /// 1-based item position
        current: usize,
    },
    /// Emitted once after the loop ends, whatever the reason
    Done {
        /// Items requested
        total: usize,
        /// Items uploaded by this batch
        uploaded: usize,
    },
}

impl ProgressEvent {
    /// Progress event for `step` without payload
    pub fn progress(current: usize, total: usize, step: Step) -> Self {
        Self::Progress {
            current,
            total,
            step,
            name: None,
            hash: None,
        }
    }

    /// Short tag of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Progress { .. } => "progress",
            Self::Uploaded { .. } => "uploaded",
            Self::Error { .. } => "error",
            Self::Fatal { .. } => "fatal",
            Self::Cancelled { .. } => "cancelled",
            Self::Done { .. } => "done",
        }
    }

    /// True for the event that closes a batch
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}
