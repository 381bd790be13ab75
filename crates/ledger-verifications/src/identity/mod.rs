//! Identity resolution — which on-chain identity holds a subject's claims.
//!
//! The identity module provides the `IdentityResolver`, which classifies a
//! subject as an account or a contract and caches the result.

pub mod resolver;

pub use resolver::{IdentityResolver, ResolvedIdentity};
