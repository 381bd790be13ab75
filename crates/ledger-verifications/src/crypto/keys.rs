//! Ed25519 account keys.
//!
//! An account address is the last 20 bytes of SHA-256(public key). The key
//! id registered on identities is SHA-256 of the address word.

use ed25519_dalek::{SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::error::{VerificationError, Result};
use crate::ledger::{Address, Hash32};

use super::hashing::sha256;

/// An Ed25519 key pair bound to a ledger account.
///
/// The signing key is zeroized on drop to prevent private key leakage.
pub struct AccountKey {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl AccountKey {
    /// Generate a new random account key.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key from raw signing key bytes.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a verifying key from raw bytes.
    pub fn verifying_key_from_bytes(bytes: &[u8; 32]) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(bytes)
            .map_err(|e| VerificationError::InvalidKey(format!("invalid verifying key: {e}")))
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Return the signing key bytes. Caller must zeroize after use.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn address(&self) -> Address {
        address_of(&self.verifying_key)
    }

    pub fn key_id(&self) -> Hash32 {
        key_id(&self.address())
    }
}

impl Drop for AccountKey {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// Account address derived from a verifying key.
pub fn address_of(key: &VerifyingKey) -> Address {
    Address::from_hash(&sha256(key.as_bytes()))
}

/// Key id under which an account's key is registered on identities.
pub fn key_id(account: &Address) -> Hash32 {
    sha256(account.to_word().as_bytes())
}
