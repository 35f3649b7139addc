//! Error types for Blobpilot
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Blobpilot operations
///
/// Covers credential parsing, session lookup, batch admission,
/// collaborator (storage network / ledger) failures, and persistence.
#[derive(Error, Debug)]
pub enum PilotError {
    /// Key material could not be parsed into a signing key
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Operation referenced a session id absent from the store
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A batch is already running for the session
    #[error("Session busy: a batch is already running for {0}")]
    SessionBusy(String),

    /// Ledger did not finalize a transaction within the configured bound
    #[error("Confirmation timeout: transaction {tx_hash} not finalized after {seconds}s")]
    ConfirmationTimeout {
        /// Pending transaction hash
        tx_hash: String,
        /// Configured bound in seconds
        seconds: u64,
    },

    /// Request parameters out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Snapshot write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Storage network collaborator errors
    #[error("Storage network error: {0}")]
    Storage(String),

    /// Ledger collaborator errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Content generation errors
    #[error("Generator error: {0}")]
    Generator(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Blobpilot operations
///
/// Uses `anyhow::Error` so context can be attached freely; typed variants
/// are recovered with `downcast_ref::<PilotError>()`.
pub type Result<T> = anyhow::Result<T>;

/// Returns the [`PilotError`] carried by an `anyhow::Error`, if any.
pub fn as_pilot_error(err: &anyhow::Error) -> Option<&PilotError> {
    err.downcast_ref::<PilotError>()
}

/// True when the error is a [`PilotError::SessionNotFound`].
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(as_pilot_error(err), Some(PilotError::SessionNotFound(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_display() {
        let error = PilotError::InvalidCredentials("bad hex".to_string());
        assert_eq!(error.to_string(), "Invalid credentials: bad hex");
    }

    #[test]
    fn test_session_not_found_display() {
        let error = PilotError::SessionNotFound("abc".to_string());
        assert_eq!(error.to_string(), "Session not found: abc");
    }

    #[test]
    fn test_session_busy_display() {
        let error = PilotError::SessionBusy("abc".to_string());
        assert_eq!(
            error.to_string(),
            "Session busy: a batch is already running for abc"
        );
    }

    #[test]
    fn test_confirmation_timeout_display() {
        let error = PilotError::ConfirmationTimeout {
            tx_hash: "0xabc".to_string(),
            seconds: 60,
        };
        assert_eq!(
            error.to_string(),
            "Confirmation timeout: transaction 0xabc not finalized after 60s"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: PilotError = io_error.into();
        assert!(matches!(error, PilotError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let error: PilotError = json_error.into();
        assert!(matches!(error, PilotError::Serialization(_)));
    }

    #[test]
    fn test_is_not_found_through_anyhow() {
        let err: anyhow::Error = PilotError::SessionNotFound("x".into()).into();
        assert!(is_not_found(&err));

        let other: anyhow::Error = PilotError::Storage("down".into()).into();
        assert!(!is_not_found(&other));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PilotError>();
    }
}
