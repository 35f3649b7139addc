//! Account identity derived from private key material
//!
//! Normalizes the accepted private-key spellings into one canonical
//! string, parses it into an Ed25519 signing key, and derives the
//! account address (SHA3-256 of the public key followed by the
//! single-signer scheme byte).

use crate::error::{PilotError, Result};
use ed25519_dalek::SigningKey;
use sha3::{Digest, Sha3_256};

/// Prefix of the canonical private-key spelling
pub const KEY_PREFIX: &str = "ed25519-priv-";

/// Scheme byte appended to the public key before hashing
const SINGLE_ED25519_SCHEME: u8 = 0x00;

/// A parsed account identity
#[derive(Clone)]
pub struct Identity {
    /// Canonical `ed25519-priv-0x<hex>` key string
    pub credentials: String,
    /// `0x`-prefixed account address
    pub address: String,
    signing_key: SigningKey,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Parse raw key material into an identity
    ///
    /// # Errors
    ///
    /// Returns `PilotError::InvalidCredentials` if the material is not a
    /// 32-byte hex-encoded Ed25519 private key in any accepted spelling.
    ///
    /// # Examples
    ///
    /// ```
    /// use blobpilot::identity::Identity;
    ///
    /// let id = Identity::from_private_key(&"11".repeat(32)).unwrap();
    /// assert!(id.credentials.starts_with("ed25519-priv-0x"));
    /// assert!(id.address.starts_with("0x"));
    /// ```
    pub fn from_private_key(raw: &str) -> Result<Self> {
        let secret = decode_secret(raw)?;
        let signing_key = SigningKey::from_bytes(&secret);
        let address = derive_address(&signing_key);

        Ok(Self {
            credentials: canonical_form(&secret),
            address,
            signing_key,
        })
    }

    /// The parsed signing key
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Hex-encoded public key, `0x`-prefixed
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.verifying_key().to_bytes()))
    }
}

/// Bring a private key into its canonical textual form
///
/// Accepts bare hex, `0x`-prefixed hex, and the `ed25519-priv-` prefixed
/// spelling (with or without `0x`), ignoring surrounding whitespace and
/// hex case. The canonical form is `ed25519-priv-0x<lowercase hex>`.
///
/// # Errors
///
/// Returns `PilotError::InvalidCredentials` if the material does not
/// decode to exactly 32 bytes.
pub fn normalize_private_key(raw: &str) -> Result<String> {
    Ok(canonical_form(&decode_secret(raw)?))
}

fn decode_secret(raw: &str) -> Result<[u8; 32]> {
    let trimmed = raw.trim();
    let without_prefix = trimmed.strip_prefix(KEY_PREFIX).unwrap_or(trimmed);
    let hex_part = without_prefix
        .strip_prefix("0x")
        .unwrap_or(without_prefix);

    let bytes = hex::decode(hex_part)
        .map_err(|e| PilotError::InvalidCredentials(format!("key is not valid hex: {}", e)))?;
    let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        PilotError::InvalidCredentials(format!("expected 32 key bytes, got {}", bytes.len()))
    })?;
    Ok(secret)
}

fn canonical_form(secret: &[u8; 32]) -> String {
    format!("{}0x{}", KEY_PREFIX, hex::encode(secret))
}

fn derive_address(signing_key: &SigningKey) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(signing_key.verifying_key().to_bytes());
    hasher.update([SINGLE_ED25519_SCHEME]);
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Abbreviate an address as `0x1234...abcd`
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
