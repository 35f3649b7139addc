//! REST clients for the storage network and the ledger
//!
//! [`HttpStorageClient`] addresses objects as
//! `{storage_url}/v1/blobs/{account}/{name}`, each `/`-separated part of
//! the name percent-encoded as its own path segment. Commitments are
//! computed locally, so only transfers and deletions touch the network.
//!
//! [`HttpLedgerClient`] submits signed entry-function transactions to
//! `{ledger_url}/transactions` and polls
//! `{ledger_url}/transactions/by_hash/{hash}` until the transaction leaves
//! the pending state.

use std::time::Duration;

use ed25519_dalek::Signer;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::{compute_commitments, Commitments, Ledger, PendingTx, Registration, StorageNetwork};
use crate::config::{LedgerConfig, NetworkConfig};
use crate::error::{PilotError, Result};
use crate::identity::Identity;

/// Entry function registering an object
pub const REGISTER_FUNCTION: &str = "0x1::blob_metadata::register_blob";
/// Entry function deleting an object
pub const DELETE_FUNCTION: &str = "0x1::blob_metadata::delete_blob";

fn build_client(timeout_seconds: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| PilotError::Config(format!("failed to build HTTP client: {}", e)).into())
}

/// Turn a non-success response into a message, preferring the body text
async fn failure_message(response: Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.trim().is_empty() => {
            // Ledger errors carry the VM status in `message`
            serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| body.trim().to_string())
        }
        _ => format!("HTTP {}", status.as_u16()),
    }
}

/// Storage network over REST
#[derive(Debug, Clone)]
pub struct HttpStorageClient {
    client: Client,
    base_url: Url,
}

impl HttpStorageClient {
    /// Create a client from the network configuration
    ///
    /// # Errors
    ///
    /// Returns `PilotError::Config` if the storage URL cannot serve as a
    /// base or the HTTP client cannot be built.
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let base_url = Url::parse(config.storage_url.trim())
            .map_err(|e| PilotError::Config(format!("invalid storage URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(PilotError::Config(format!(
                "storage URL cannot be a base: {}",
                config.storage_url
            ))
            .into());
        }
        Ok(Self {
            client: build_client(config.request_timeout_seconds)?,
            base_url,
        })
    }

    fn object_url(&self, account: &str, name: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| PilotError::Storage(format!("cannot address object {}", name)))?
            .pop_if_empty()
            .extend(["v1", "blobs", account])
            .extend(name.split('/'));
        Ok(url)
    }
}

#[async_trait::async_trait]
impl StorageNetwork for HttpStorageClient {
    async fn compute_commitments(&self, data: &[u8]) -> Result<Commitments> {
        Ok(compute_commitments(data))
    }

    async fn put_object(&self, account: &str, name: &str, data: &[u8]) -> Result<()> {
        let url = self.object_url(account, name)?;
        tracing::debug!(url = %url, bytes = data.len(), "Uploading object");

        let response = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| PilotError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PilotError::Storage(failure_message(response).await).into());
        }
        Ok(())
    }

    async fn delete_object(&self, account: &str, name: &str) -> Result<()> {
        let url = self.object_url(account, name)?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| PilotError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PilotError::Storage(failure_message(response).await).into());
        }
        Ok(())
    }
}

/// Unsigned transaction body; the signature covers its JSON encoding
#[derive(Debug, Serialize)]
struct TransactionBody<'a> {
    sender: &'a str,
    function: &'a str,
    arguments: Vec<Value>,
    expiration_timestamp_secs: i64,
}

#[derive(Debug, Serialize)]
struct SignedTransaction<'a> {
    #[serde(flatten)]
    body: TransactionBody<'a>,
    public_key: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionStatus {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
}

/// Ledger over REST
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    client: Client,
    base_url: String,
    poll_interval: Duration,
}

impl HttpLedgerClient {
    /// Create a client from the network and ledger configuration
    ///
    /// # Errors
    ///
    /// Returns `PilotError::Config` if the HTTP client cannot be built.
    pub fn new(network: &NetworkConfig, ledger: &LedgerConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(network.request_timeout_seconds)?,
            base_url: network.ledger_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(ledger.poll_interval_ms),
        })
    }

    async fn submit(
        &self,
        signer: &Identity,
        function: &str,
        arguments: Vec<Value>,
    ) -> Result<PendingTx> {
        let body = TransactionBody {
            sender: &signer.address,
            function,
            arguments,
            expiration_timestamp_secs: chrono::Utc::now().timestamp() + 600,
        };
        let message = serde_json::to_vec(&body).map_err(PilotError::from)?;
        let signature = signer.signing_key().sign(&message);

        let signed = SignedTransaction {
            body,
            public_key: signer.public_key_hex(),
            signature: format!("0x{}", hex::encode(signature.to_bytes())),
        };

        let url = format!("{}/transactions", self.base_url);
        tracing::debug!(url = %url, function = %function, "Submitting transaction");

        let response = self
            .client
            .post(&url)
            .json(&signed)
            .send()
            .await
            .map_err(|e| PilotError::Ledger(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PilotError::Ledger(failure_message(response).await).into());
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| PilotError::Ledger(format!("invalid submit response: {}", e)))?;
        Ok(PendingTx {
            hash: submitted.hash,
        })
    }

    async fn poll_once(&self, tx: &PendingTx) -> Result<Option<()>> {
        let url = format!("{}/transactions/by_hash/{}", self.base_url, tx.hash);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PilotError::Ledger(e.to_string()))?;

        // not indexed yet
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PilotError::Ledger(failure_message(response).await).into());
        }

        let status: TransactionStatus = response
            .json()
            .await
            .map_err(|e| PilotError::Ledger(format!("invalid transaction status: {}", e)))?;

        if status.kind == "pending_transaction" {
            return Ok(None);
        }
        match status.success {
            Some(true) => Ok(Some(())),
            _ => Err(PilotError::Ledger(
                status
                    .vm_status
                    .unwrap_or_else(|| "transaction failed".to_string()),
            )
            .into()),
        }
    }
}

#[async_trait::async_trait]
impl Ledger for HttpLedgerClient {
    async fn register_object(
        &self,
        signer: &Identity,
        registration: &Registration,
    ) -> Result<PendingTx> {
        self.submit(
            signer,
            REGISTER_FUNCTION,
            vec![
                json!(registration.name),
                json!(registration.root),
                json!(registration.size.to_string()),
                json!(registration.expiration_micros.to_string()),
            ],
        )
        .await
    }

    async fn delete_object(&self, signer: &Identity, name: &str) -> Result<PendingTx> {
        self.submit(signer, DELETE_FUNCTION, vec![json!(name)]).await
    }

    async fn wait_for_finalization(&self, tx: &PendingTx) -> Result<()> {
        loop {
            if self.poll_once(tx).await?.is_some() {
                tracing::debug!(hash = %tx.hash, "Transaction finalized");
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

    fn network(server: &MockServer) -> NetworkConfig {
        NetworkConfig {
            storage_url: server.uri(),
            ledger_url: server.uri(),
            request_timeout_seconds: 5,
        }
    }

    fn ledger_config() -> LedgerConfig {
        LedgerConfig {
            poll_interval_ms: 10,
            ..LedgerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_put_object_sends_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/blobs/0xabc/uploads/a.txt"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpStorageClient::new(&network(&server)).unwrap();
        client.put_object("0xabc", "uploads/a.txt", b"hi").await.unwrap();
    }

    #[tokio::test]
    async fn test_object_names_are_encoded_per_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/blobs/0xabc/docs/report%20%232.txt"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/blobs/0xabc/docs/q%3F%25.txt"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpStorageClient::new(&network(&server)).unwrap();
        client
            .delete_object("0xabc", "docs/report #2.txt")
            .await
            .unwrap();
        client.put_object("0xabc", "docs/q?%.txt", b"x").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.url.query().is_none()));
    }

    #[test]
    fn test_object_url_keeps_base_path() {
        let client = HttpStorageClient::new(&NetworkConfig {
            storage_url: "http://storage.test/api/".into(),
            ledger_url: "http://ledger.test".into(),
            request_timeout_seconds: 5,
        })
        .unwrap();
        let url = client.object_url("0xabc", "a/b c.txt").unwrap();
        assert_eq!(url.as_str(), "http://storage.test/api/v1/blobs/0xabc/a/b%20c.txt");
    }

    #[tokio::test]
    async fn test_put_object_surfaces_body_as_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_string("blob not registered"))
            .mount(&server)
            .await;

        let client = HttpStorageClient::new(&network(&server)).unwrap();
        let err = client.put_object("0xabc", "a", b"x").await.unwrap_err();
        assert!(err.to_string().contains("blob not registered"));
    }

    #[tokio::test]
    async fn test_register_then_wait_for_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .and(body_partial_json(json!({"function": REGISTER_FUNCTION})))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"hash": "0xfeed"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/transactions/by_hash/0xfeed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "user_transaction",
                "success": true,
                "vm_status": "Executed successfully"
            })))
            .mount(&server)
            .await;

        let client = HttpLedgerClient::new(&network(&server), &ledger_config()).unwrap();
        let identity = Identity::from_private_key(KEY).unwrap();
        let tx = client
            .register_object(
                &identity,
                &Registration {
                    name: "uploads/a.txt".into(),
                    root: "0x00".into(),
                    size: 2,
                    expiration_micros: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(tx.hash, "0xfeed");
        client.wait_for_finalization(&tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_rejection_carries_vm_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE"
            })))
            .mount(&server)
            .await;

        let client = HttpLedgerClient::new(&network(&server), &ledger_config()).unwrap();
        let identity = Identity::from_private_key(KEY).unwrap();
        let err = client.delete_object(&identity, "a").await.unwrap_err();
        assert!(err.to_string().contains("INSUFFICIENT_BALANCE"));
    }

    #[tokio::test]
    async fn test_failed_transaction_reports_vm_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions/by_hash/0xbad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "user_transaction",
                "success": false,
                "vm_status": "SEQUENCE_NUMBER_TOO_OLD"
            })))
            .mount(&server)
            .await;

        let client = HttpLedgerClient::new(&network(&server), &ledger_config()).unwrap();
        let err = client
            .wait_for_finalization(&PendingTx {
                hash: "0xbad".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PilotError>(),
            Some(PilotError::Ledger(msg)) if msg == "SEQUENCE_NUMBER_TOO_OLD"
        ));
    }
}
