//! Ledger verifications — verifiable claims about accounts and contracts.
//!
//! Issues, confirms, rejects and deletes claims held by on-chain
//! identities, and computes how far a claim can be trusted by walking its
//! parent topics up to a root-level verification.
//!
//! Collaborators (ledger, content store, name registry, contract
//! descriptions, key store) are consumed through the traits in [`ledger`];
//! [`memory::MemoryLedger`] implements all of them in memory.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod memory;
pub mod relay;
pub mod storage;
pub mod time;
pub mod topic;
pub mod trust;
pub mod verification;

// Re-export primary types
pub use config::EngineConfig;
pub use engine::{Backends, VerificationsEngine};
pub use error::{Result, VerificationError};
pub use identity::{IdentityResolver, ResolvedIdentity};
pub use ledger::{Address, ClaimId, Hash32, Identity, SubjectType};
pub use memory::MemoryLedger;
pub use relay::{ClaimFunction, ExecOptions, MetaTransactionRelay, RelayOutcome};
pub use topic::Topic;
pub use trust::{
    compute_verifications, evaluate, trace_trust_path, ComputedVerification, TrustLevel,
    TrustLink, TrustPath, ValidationOptions,
};
pub use verification::{
    ComputedStatus, NestedVerification, Verification, VerificationDescription,
    VerificationRequest, VerificationStatus, VerificationWarning,
};
