//! Claim-holder calls and their wire encoding.
//!
//! Account identities are their own claim holders and receive the bare
//! function. Contract identities are served by the shared claim registry,
//! which needs the identity id alongside the function.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ledger::{Address, ClaimId, Hash32, Identity};

/// A state-changing claim-holder function with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimFunction {
    AddClaim {
        topic: Hash32,
        scheme: u64,
        /// Issuer identity contract; must be the executing identity.
        issuer: Address,
        signature: Vec<u8>,
        data: Hash32,
        uri: String,
        description: Hash32,
        expiration: u64,
        disable_subclaims: bool,
    },
    ApproveClaim {
        claim_id: ClaimId,
    },
    RejectClaim {
        claim_id: ClaimId,
        /// Content hash of the rejection reason, zero for none.
        reason: Hash32,
    },
    RemoveClaim {
        claim_id: ClaimId,
        /// Topic hash under which the caller's authority claim is held,
        /// zero for root-level topics.
        parent_topic: Hash32,
    },
}

impl ClaimFunction {
    /// Function name as it appears in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddClaim { .. } => "addClaim",
            Self::ApproveClaim { .. } => "approveClaim",
            Self::RejectClaim { .. } => "rejectClaim",
            Self::RemoveClaim { .. } => "removeClaim",
        }
    }
}

/// Call data addressed to one claim holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallData {
    /// Called on an account identity contract directly.
    Identity(ClaimFunction),
    /// Called on the claim registry on behalf of a contract identity.
    Registry {
        identity: Hash32,
        function: ClaimFunction,
    },
}

impl CallData {
    /// Address `function` to the claim holder of `identity`.
    pub fn for_identity(identity: &Identity, function: ClaimFunction) -> Self {
        match identity {
            Identity::Account(_) => Self::Identity(function),
            Identity::Contract(id) => Self::Registry {
                identity: *id,
                function,
            },
        }
    }

    pub fn function(&self) -> &ClaimFunction {
        match self {
            Self::Identity(function) | Self::Registry { function, .. } => function,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
