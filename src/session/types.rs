use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an upload record entered a session's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    /// Registered and transferred by the upload pipeline
    Pipeline,
    /// Imported by reference to content that already exists remotely
    Imported,
}

/// One item considered present in the storage network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Storage path-like identifier
    pub name: String,
    /// Byte length; `None` when unknown (manual imports)
    pub size: Option<u64>,
    /// When the record was added
    pub timestamp: DateTime<Utc>,
    /// Ledger transaction that registered the item; `None` when unknown
    pub confirmation_handle: Option<String>,
    /// Pipeline upload or manual import
    pub origin: RecordOrigin,
}

impl UploadRecord {
    /// Record for an item that completed registration and transfer
    pub fn uploaded(name: impl Into<String>, size: u64, tx_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: Some(size),
            timestamp: Utc::now(),
            confirmation_handle: Some(tx_hash.into()),
            origin: RecordOrigin::Pipeline,
        }
    }

    /// Record for a name imported by reference
    pub fn imported(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            timestamp: Utc::now(),
            confirmation_handle: None,
            origin: RecordOrigin::Imported,
        }
    }
}

/// A connected account's durable context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Random hex token
    pub id: String,
    /// Canonical private-key string
    pub credentials: String,
    /// Account address derived from the credentials
    pub address: String,
    /// Upload history in insertion order
    pub uploads: Vec<UploadRecord>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// True if a record with this name is already in the history
    pub fn has_upload(&self, name: &str) -> bool {
        self.uploads.iter().any(|u| u.name == name)
    }
}

/// Result of a manual import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// Names appended by this call
    pub added: usize,
    /// History length after the call
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploaded_record_fields() {
        let record = UploadRecord::uploaded("uploads/a.txt", 12, "0xfeed");
        assert_eq!(record.size, Some(12));
        assert_eq!(record.confirmation_handle.as_deref(), Some("0xfeed"));
        assert_eq!(record.origin, RecordOrigin::Pipeline);
    }

    #[test]
    fn test_imported_record_has_unknown_size_and_handle() {
        let record = UploadRecord::imported("docs/b.txt");
        assert!(record.size.is_none());
        assert!(record.confirmation_handle.is_none());
        assert_eq!(record.origin, RecordOrigin::Imported);
    }

    #[test]
    fn test_origin_serializes_snake_case() {
        let json = serde_json::to_string(&RecordOrigin::Imported).unwrap();
        assert_eq!(json, "\"imported\"");
    }
}
