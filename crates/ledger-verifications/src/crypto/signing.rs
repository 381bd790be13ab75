//! Ed25519 signing with signer recovery.
//!
//! Ed25519 has no public-key recovery, so a recoverable signature carries
//! the signer's public key: `public key (32) || signature (64)`. Recovery
//! verifies the signature and returns the signer's address.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{VerificationError, Result};
use crate::ledger::Address;

use super::keys::{address_of, AccountKey};

/// Length of a recoverable signature.
pub const RECOVERABLE_SIGNATURE_LEN: usize = 96;

/// Sign a message with an Ed25519 signing key.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Signature {
    signing_key.sign(message)
}

/// Verify an Ed25519 signature against a public key and message.
pub fn verify(verifying_key: &VerifyingKey, message: &[u8], signature: &Signature) -> Result<()> {
    verifying_key
        .verify(message, signature)
        .map_err(|_| VerificationError::SignatureInvalid)
}

/// Sign a message and return the recoverable signature bytes.
pub fn sign_recoverable(signing_key: &SigningKey, message: &[u8]) -> Vec<u8> {
    let sig = sign(signing_key, message);
    let mut out = Vec::with_capacity(RECOVERABLE_SIGNATURE_LEN);
    out.extend_from_slice(signing_key.verifying_key().as_bytes());
    out.extend_from_slice(&sig.to_bytes());
    out
}

/// Recover the signer address of a recoverable signature over `message`.
pub fn recover_signer(message: &[u8], signature: &[u8]) -> Result<Address> {
    if signature.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(VerificationError::InvalidKey(format!(
            "recoverable signature must be {RECOVERABLE_SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }
    let (key_part, sig_part) = signature.split_at(32);

    let key_bytes: [u8; 32] = key_part
        .try_into()
        .map_err(|_| VerificationError::InvalidKey("public key must be 32 bytes".into()))?;
    let sig_bytes: [u8; 64] = sig_part
        .try_into()
        .map_err(|_| VerificationError::InvalidKey("signature must be 64 bytes".into()))?;

    let verifying_key = AccountKey::verifying_key_from_bytes(&key_bytes)?;
    verify(&verifying_key, message, &Signature::from_bytes(&sig_bytes))?;
    Ok(address_of(&verifying_key))
}
