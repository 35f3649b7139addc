//! In-process collaborator doubles
//!
//! [`FakeStorage`] keeps objects in memory; [`FakeLedger`] finalizes every
//! transaction immediately. Both record what they were asked to do and
//! accept scripted failures so pipeline behavior can be exercised without
//! a network:
//!
//! ```
//! use blobpilot::network::{FakeLedger, Ledger, PendingTx};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let ledger = FakeLedger::new();
//! ledger.fail_registration(2, "INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE");
//! assert!(ledger.wait_for_finalization(&PendingTx { hash: "0x1".into() }).await.is_ok());
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{compute_commitments, Commitments, Ledger, PendingTx, Registration, StorageNetwork};
use crate::error::{PilotError, Result};
use crate::identity::Identity;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Storage network held in memory
#[derive(Debug, Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    put_failures: Mutex<HashMap<usize, String>>,
    delete_failures: Mutex<HashSet<String>>,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FakeStorage {
    /// Empty storage that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `call`-th transfer (1-based) with `message`
    pub fn fail_put(&self, call: usize, message: impl Into<String>) {
        lock(&self.put_failures).insert(call, message.into());
    }

    /// Fail every deletion of `name`
    pub fn fail_delete(&self, name: impl Into<String>) {
        lock(&self.delete_failures).insert(name.into());
    }

    /// Stored bytes for an object
    pub fn object(&self, account: &str, name: &str) -> Option<Vec<u8>> {
        lock(&self.objects)
            .get(&(account.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    /// Number of transfer attempts
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of deletion attempts
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StorageNetwork for FakeStorage {
    async fn compute_commitments(&self, data: &[u8]) -> Result<Commitments> {
        Ok(compute_commitments(data))
    }

    async fn put_object(&self, account: &str, name: &str, data: &[u8]) -> Result<()> {
        let call = self.put_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = lock(&self.put_failures).remove(&call) {
            return Err(PilotError::Storage(message).into());
        }
        lock(&self.objects).insert((account.to_string(), name.to_string()), data.to_vec());
        Ok(())
    }

    async fn delete_object(&self, account: &str, name: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.delete_failures).contains(name) {
            return Err(PilotError::Storage(format!("cannot delete {}", name)).into());
        }
        lock(&self.objects).remove(&(account.to_string(), name.to_string()));
        Ok(())
    }
}

/// Ledger that finalizes instantly unless told otherwise
#[derive(Debug, Default)]
pub struct FakeLedger {
    registrations: Mutex<Vec<Registration>>,
    deletions: Mutex<Vec<String>>,
    registration_failures: Mutex<HashMap<usize, String>>,
    deletion_failures: Mutex<HashMap<String, String>>,
    finalization_failures: Mutex<HashMap<String, String>>,
    finalization_delay: Mutex<Option<Duration>>,
    register_calls: AtomicUsize,
    next_tx: AtomicUsize,
}

impl FakeLedger {
    /// Ledger that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the `call`-th registration (1-based) with `message`
    pub fn fail_registration(&self, call: usize, message: impl Into<String>) {
        lock(&self.registration_failures).insert(call, message.into());
    }

    /// Reject deletion of `name` with `message`
    pub fn fail_deletion(&self, name: impl Into<String>, message: impl Into<String>) {
        lock(&self.deletion_failures).insert(name.into(), message.into());
    }

    /// Make finalization of transaction `hash` fail with `message`
    pub fn fail_finalization(&self, hash: impl Into<String>, message: impl Into<String>) {
        lock(&self.finalization_failures).insert(hash.into(), message.into());
    }

    /// Delay every finalization by `delay`
    pub fn delay_finalization(&self, delay: Duration) {
        *lock(&self.finalization_delay) = Some(delay);
    }

    /// Registrations accepted so far, in order
    pub fn registrations(&self) -> Vec<Registration> {
        lock(&self.registrations).clone()
    }

    /// Names whose deletion was accepted, in order
    pub fn deletions(&self) -> Vec<String> {
        lock(&self.deletions).clone()
    }

    /// Number of registration attempts
    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    fn next_hash(&self) -> String {
        format!("0x{:064x}", self.next_tx.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait::async_trait]
impl Ledger for FakeLedger {
    async fn register_object(
        &self,
        _signer: &Identity,
        registration: &Registration,
    ) -> Result<PendingTx> {
        let call = self.register_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = lock(&self.registration_failures).remove(&call) {
            return Err(PilotError::Ledger(message).into());
        }
        lock(&self.registrations).push(registration.clone());
        Ok(PendingTx {
            hash: self.next_hash(),
        })
    }

    async fn delete_object(&self, _signer: &Identity, name: &str) -> Result<PendingTx> {
        if let Some(message) = lock(&self.deletion_failures).get(name) {
            return Err(PilotError::Ledger(message.clone()).into());
        }
        lock(&self.deletions).push(name.to_string());
        Ok(PendingTx {
            hash: self.next_hash(),
        })
    }

    async fn wait_for_finalization(&self, tx: &PendingTx) -> Result<()> {
        let delay = *lock(&self.finalization_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = lock(&self.finalization_failures).get(&tx.hash) {
            return Err(PilotError::Ledger(message.clone()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

    fn registration(name: &str) -> Registration {
        Registration {
            name: name.to_string(),
            root: "0x00".to_string(),
            size: 1,
            expiration_micros: 0,
        }
    }

    #[tokio::test]
    async fn test_scripted_registration_failure_hits_only_that_call() {
        let ledger = FakeLedger::new();
        let identity = Identity::from_private_key(KEY).unwrap();
        ledger.fail_registration(2, "INSUFFICIENT_BALANCE");

        assert!(ledger.register_object(&identity, &registration("a")).await.is_ok());
        assert!(ledger.register_object(&identity, &registration("b")).await.is_err());
        assert!(ledger.register_object(&identity, &registration("c")).await.is_ok());
        assert_eq!(ledger.register_calls(), 3);
        assert_eq!(ledger.registrations().len(), 2);
    }

    #[tokio::test]
    async fn test_transaction_hashes_are_unique() {
        let ledger = FakeLedger::new();
        let identity = Identity::from_private_key(KEY).unwrap();
        let a = ledger.delete_object(&identity, "a").await.unwrap();
        let b = ledger.delete_object(&identity, "a").await.unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[tokio::test]
    async fn test_storage_put_and_delete() {
        let storage = FakeStorage::new();
        storage.put_object("0x1", "a", b"x").await.unwrap();
        assert_eq!(storage.object("0x1", "a"), Some(b"x".to_vec()));

        storage.fail_delete("b");
        assert!(storage.delete_object("0x1", "b").await.is_err());
        storage.delete_object("0x1", "a").await.unwrap();
        assert_eq!(storage.object_count(), 0);
        assert_eq!(storage.delete_calls(), 2);
    }
}
