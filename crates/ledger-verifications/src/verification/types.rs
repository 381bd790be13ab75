//! Verification records and their statuses.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ledger::{Address, ClaimId, Hash32, Identity, SubjectType};
use crate::topic::Topic;
use crate::trust::ComputedVerification;

/// Stored status of a single verification.
///
/// Rejection is terminal: a rejected verification cannot be confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Issued,
    Confirmed,
    Rejected,
}

impl VerificationStatus {
    /// Numeric code as exposed to clients (`0`, `1`, `2`).
    pub fn code(self) -> i8 {
        match self {
            Self::Issued => 0,
            Self::Confirmed => 1,
            Self::Rejected => 2,
        }
    }

    /// Status implied by the holder's approval and rejection flags.
    pub fn from_flags(approved: bool, rejected: bool) -> Self {
        if rejected {
            Self::Rejected
        } else if approved {
            Self::Confirmed
        } else {
            Self::Issued
        }
    }
}

/// Status of a computed verification; `Missing` when nothing was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputedStatus {
    Missing,
    Issued,
    Confirmed,
    Rejected,
}

impl ComputedStatus {
    /// Numeric code as exposed to clients, `-1` for missing.
    pub fn code(self) -> i8 {
        match self {
            Self::Missing => -1,
            Self::Issued => 0,
            Self::Confirmed => 1,
            Self::Rejected => 2,
        }
    }
}

impl From<VerificationStatus> for ComputedStatus {
    fn from(status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::Issued => Self::Issued,
            VerificationStatus::Confirmed => Self::Confirmed,
            VerificationStatus::Rejected => Self::Rejected,
        }
    }
}

impl fmt::Display for ComputedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Missing => "missing",
            Self::Issued => "issued",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Why a verification is not fully trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationWarning {
    /// Issued but not yet confirmed by the subject.
    Issued,
    Rejected,
    /// Issuer and subject are the same and the topic has a parent.
    SelfIssued,
    /// The signature does not recover to a claim key of the issuer.
    Invalid,
    Expired,
    /// No verification exists for the parent topic on the issuer.
    ParentMissing,
    /// The parent verification is only issued, or rejected.
    ParentUntrusted,
    /// The parent verification forbids sub-verifications.
    DisableSubVerifications,
    /// The subject has no identity.
    NoIdentity,
    /// A root-level verification issued by an untrusted root.
    NotRootOwner,
}

impl VerificationWarning {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Rejected => "rejected",
            Self::SelfIssued => "selfIssued",
            Self::Invalid => "invalid",
            Self::Expired => "expired",
            Self::ParentMissing => "parentMissing",
            Self::ParentUntrusted => "parentUntrusted",
            Self::DisableSubVerifications => "disableSubVerifications",
            Self::NoIdentity => "noIdentity",
            Self::NotRootOwner => "notRootOwner",
        }
    }
}

impl fmt::Display for VerificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Off-chain description of a verification topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDescription {
    /// Display name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Square icon, usually a data URL.
    #[serde(default, alias = "imgSquare", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl VerificationDescription {
    /// Description used when none is registered: named after the topic.
    pub fn default_for(topic: &Topic) -> Self {
        Self {
            name: topic.path(),
            description: None,
            author: None,
            version: None,
            icon: None,
        }
    }
}

/// One verification as read from its holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    /// Claim id on the holder.
    pub id: ClaimId,
    pub topic: Topic,
    pub status: VerificationStatus,
    /// Account that issued the verification.
    pub issuer: Address,
    /// Identity contract of the issuer, as stored in the claim.
    pub issuer_identity: Address,
    pub subject: Address,
    pub subject_identity: Identity,
    pub subject_type: SubjectType,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    /// Content hash of the payload, zero when none was attached.
    pub data: Hash32,
    pub uri: String,
    /// Name-registry node of the description, zero for the default.
    pub description_node: Hash32,
    pub creation_block: u64,
    /// Creation time, epoch seconds.
    pub creation_date: u64,
    /// Expiration time, epoch seconds.
    pub expiration_date: Option<u64>,
    /// Sub-verifications below this topic are not accepted.
    pub disable_subverifications: bool,
    /// The signature recovers to a claim key of the issuer.
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<Value>,
    pub description: VerificationDescription,
}

impl Verification {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiration_date.is_some_and(|exp| exp <= now)
    }

    pub fn is_self_issued(&self) -> bool {
        self.issuer == self.subject
    }
}

/// A verification together with its trust annotations.
///
/// A `Missing` entry has no `details`; it stands for a subject or topic
/// without any verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedVerification {
    pub topic: Topic,
    pub subject: Address,
    pub status: ComputedStatus,
    pub warnings: Vec<VerificationWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Verification>,
    /// Composite of the issuer's verifications on the parent topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Arc<ComputedVerification>>,
}

impl NestedVerification {
    /// A placeholder for a subject or topic without verifications.
    pub fn missing(subject: Address, topic: Topic, warnings: Vec<VerificationWarning>) -> Self {
        Self {
            topic,
            subject,
            status: ComputedStatus::Missing,
            warnings,
            details: None,
            parent: None,
        }
    }

    pub fn issuer(&self) -> Option<Address> {
        self.details.as_ref().map(|d| d.issuer)
    }

    pub fn has_warning(&self, warning: VerificationWarning) -> bool {
        self.warnings.contains(&warning)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
