//! Relay outcomes reconstructed from block logs.

use crate::error::{VerificationError, Result};
use crate::ledger::Address;

/// What the logs of the submitting block say about a relayed call.
///
/// `Indeterminate` means the relay left no observable outcome. It is a
/// protocol violation, not a failed call, and is never folded into `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome<T> {
    /// The inner call succeeded and produced `T`.
    Success(T),
    /// The inner call reverted.
    Failed { execution_id: u64, target: Address },
    /// Neither success nor failure could be observed.
    Indeterminate {
        execution_id: Option<u64>,
        block_number: u64,
        reason: String,
    },
}

impl<T> RelayOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate { .. })
    }

    /// Convert into the engine's error model for a relay on behalf of `subject`.
    pub fn into_result(self, subject: &Address) -> Result<T> {
        match self {
            Self::Success(v) => Ok(v),
            Self::Failed {
                execution_id,
                target,
            } => Err(VerificationError::RelayFailed {
                subject: *subject,
                execution_id,
                target,
            }),
            Self::Indeterminate {
                execution_id,
                block_number,
                reason,
            } => Err(VerificationError::RelayIndeterminate {
                subject: *subject,
                block_number,
                reason: match execution_id {
                    Some(id) => format!("execution {id}: {reason}"),
                    None => reason,
                },
            }),
        }
    }
}
