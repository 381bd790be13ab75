//! Error types for ledger-verifications.
//!
//! Integrity failures (identity link mismatch, a relay that produced no
//! observable outcome) are distinct variants so callers can tell them apart
//! from ordinary business rejections. Private key material is never included
//! in error messages.

use crate::ledger::{Address, ClaimId, Hash32};

/// Verification engine error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Identity not found for subject {0}")]
    IdentityNotFound(Address),

    #[error(
        "Identity integrity violation: {subject} declares identity {identity}, \
         but the registry links it to {linked}"
    )]
    IdentityIntegrity {
        subject: Address,
        identity: Hash32,
        linked: String,
    },

    #[error("Relay execution {execution_id} against {target} failed for subject {subject}")]
    RelayFailed {
        subject: Address,
        execution_id: u64,
        target: Address,
    },

    #[error("Relay for subject {subject} produced no outcome in block {block_number}: {reason}")]
    RelayIndeterminate {
        subject: Address,
        block_number: u64,
        reason: String,
    },

    #[error("Verification {claim_id} of subject {subject} is rejected and cannot be confirmed")]
    AlreadyRejected { subject: Address, claim_id: ClaimId },

    #[error("Account {account} is not allowed to {action} on topic {topic}")]
    Unauthorized {
        account: Address,
        topic: String,
        action: String,
    },

    #[error("Verification {claim_id} not found for subject {subject}")]
    ClaimNotFound { subject: Address, claim_id: ClaimId },

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerificationError {
    /// True for failures that indicate a protocol or trust violation.
    ///
    /// These must be surfaced as-is and never retried silently.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::IdentityIntegrity { .. } | Self::RelayIndeterminate { .. }
        )
    }
}

impl From<serde_json::Error> for VerificationError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<bincode::Error> for VerificationError {
    fn from(e: bincode::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<tokio::task::JoinError> for VerificationError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, VerificationError>;
