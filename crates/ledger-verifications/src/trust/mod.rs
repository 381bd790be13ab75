//! Trust computation over verifications.
//!
//! - [`composite`] — reduce the verifications of one topic and subject to
//!   a single status
//! - [`path`] — warnings per verification and the parent chain up to a
//!   root-level topic
//! - [`status`] — map a composite onto a traffic-light trust level

pub mod composite;
pub mod path;
pub mod status;

pub use composite::{compute_verifications, ComputedVerification};
pub use path::{derive_warnings, trace_trust_path, TrustLink, TrustPath, WarningContext};
pub use status::{evaluate, TrustLevel, ValidationOptions};
