//! Collaborators on the far side of the upload pipeline
//!
//! The pipeline talks to two remote systems through the traits defined
//! here:
//!
//! - [`StorageNetwork`] -- computes content commitments and holds the
//!   object bytes.
//! - [`Ledger`] -- registers and deletes objects by transaction and
//!   reports finalization.
//!
//! Concrete implementations:
//!
//! - [`http::HttpStorageClient`] / [`http::HttpLedgerClient`] -- REST
//!   clients built on `reqwest`.
//! - [`fake::FakeStorage`] / [`fake::FakeLedger`] -- in-process doubles
//!   with failure injection, used by tests.

use crate::error::Result;
use crate::identity::Identity;
use serde::{Deserialize, Serialize};

pub mod commitments;
pub mod fake;
pub mod http;

pub use commitments::{compute_commitments, CHUNK_SIZE};
pub use fake::{FakeLedger, FakeStorage};
pub use http::{HttpLedgerClient, HttpStorageClient};

/// Integrity commitments over an object's bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitments {
    /// `0x`-prefixed root digest
    pub root: String,
    /// Number of chunks the digest covers
    pub chunk_count: usize,
}

/// What a registration transaction declares about an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Storage name
    pub name: String,
    /// Commitment root
    pub root: String,
    /// Byte size
    pub size: u64,
    /// Expiration timestamp in microseconds since the epoch
    pub expiration_micros: i64,
}

/// Handle to a submitted, not yet finalized, ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    /// Transaction hash
    pub hash: String,
}

/// Storage network client
#[async_trait::async_trait]
pub trait StorageNetwork: Send + Sync + std::fmt::Debug {
    /// Compute the commitment root over `data`
    async fn compute_commitments(&self, data: &[u8]) -> Result<Commitments>;

    /// Store `data` for `account` under `name`
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PilotError::Storage`] if the network rejects
    /// the transfer.
    async fn put_object(&self, account: &str, name: &str, data: &[u8]) -> Result<()>;

    /// Remove an object; callers treat failures as best-effort
    async fn delete_object(&self, account: &str, name: &str) -> Result<()>;
}

/// Ledger client
#[async_trait::async_trait]
pub trait Ledger: Send + Sync + std::fmt::Debug {
    /// Submit a registration transaction signed by `signer`
    async fn register_object(&self, signer: &Identity, registration: &Registration)
        -> Result<PendingTx>;

    /// Submit a deletion transaction signed by `signer`
    async fn delete_object(&self, signer: &Identity, name: &str) -> Result<PendingTx>;

    /// Resolve once `tx` is finalized
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PilotError::Ledger`] carrying the VM status
    /// when the transaction finalized unsuccessfully. Implementations may
    /// wait indefinitely; callers bound the wait.
    async fn wait_for_finalization(&self, tx: &PendingTx) -> Result<()>;
}
