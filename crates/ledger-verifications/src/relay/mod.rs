//! Meta-transaction relay.
//!
//! Calls on a subject's claim holder are relayed through the caller's own
//! identity. The relay entry point does not return the inner result, so the
//! outcome is reconstructed from the logs of the block the call landed in:
//! `Approved` in the receipt, then `Executed`/`ExecutionFailed` on the
//! executor, then the inner event on the target.

pub mod call;
pub mod executor;
pub mod outcome;

pub use call::{CallData, ClaimFunction};
pub use executor::{ExecOptions, MetaTransactionRelay, Submission};
pub use outcome::RelayOutcome;
