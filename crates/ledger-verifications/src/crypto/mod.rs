//! Cryptographic primitives for ledger-verifications.
//!
//! This module provides:
//! - SHA-256 topic, verification-data and registry-name hashing
//! - Ed25519 account keys with address derivation
//! - Recoverable signatures (signer address recovered from the signature)

pub mod hashing;
pub mod keys;
pub mod signing;

pub use hashing::{name_hash, sha256, topic_hash, verification_data_hash};
pub use keys::{address_of, key_id, AccountKey};
pub use signing::{recover_signer, sign_recoverable};
