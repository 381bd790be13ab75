//! Verifications — claim records, their descriptions and the claim store.
//!
//! A verification is a claim on a `/`-delimited topic, issued by one
//! account about a subject and held by the subject's identity. Issued
//! verifications can be confirmed or rejected by the subject; rejection is
//! terminal.

pub mod description;
pub mod store;
pub mod types;

pub use description::DescriptionResolver;
pub use store::{ClaimStore, VerificationRequest};
pub use types::{
    ComputedStatus, NestedVerification, Verification, VerificationDescription,
    VerificationStatus, VerificationWarning,
};
