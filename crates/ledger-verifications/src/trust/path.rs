//! Per-verification warnings and the trust path up to a root-level topic.

use serde::{Deserialize, Serialize};

use crate::ledger::Address;
use crate::topic::Topic;
use crate::verification::{ComputedStatus, Verification, VerificationStatus, VerificationWarning};

use super::composite::ComputedVerification;

/// Inputs to warning derivation that do not come from the verification.
#[derive(Debug, Clone, Copy)]
pub struct WarningContext<'a> {
    /// Current time, epoch seconds.
    pub now: u64,
    /// Issuers accepted for root-level topics; empty accepts any issuer.
    pub trusted_roots: &'a [Address],
}

/// Warnings for one verification given the composite of its issuer's
/// verifications on the parent topic (`None` for root-level topics).
pub fn derive_warnings(
    verification: &Verification,
    parent: Option<&ComputedVerification>,
    ctx: WarningContext<'_>,
) -> Vec<VerificationWarning> {
    let mut warnings = Vec::new();

    match verification.status {
        VerificationStatus::Issued => warnings.push(VerificationWarning::Issued),
        VerificationStatus::Rejected => warnings.push(VerificationWarning::Rejected),
        VerificationStatus::Confirmed => {}
    }
    if verification.is_self_issued() && verification.topic.parent().is_some() {
        warnings.push(VerificationWarning::SelfIssued);
    }
    if !verification.valid {
        warnings.push(VerificationWarning::Invalid);
    }
    if verification.is_expired(ctx.now) {
        warnings.push(VerificationWarning::Expired);
    }

    match parent {
        Some(parent) => {
            match parent.status {
                ComputedStatus::Missing => warnings.push(VerificationWarning::ParentMissing),
                ComputedStatus::Issued | ComputedStatus::Rejected => {
                    warnings.push(VerificationWarning::ParentUntrusted)
                }
                ComputedStatus::Confirmed => {}
            }
            if parent.disable_subverifications {
                warnings.push(VerificationWarning::DisableSubVerifications);
            }
        }
        None => {
            if !ctx.trusted_roots.is_empty() && !ctx.trusted_roots.contains(&verification.issuer) {
                warnings.push(VerificationWarning::NotRootOwner);
            }
        }
    }

    warnings
}

/// One level of a trust path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLink {
    pub topic: Topic,
    pub subject: Option<Address>,
    /// Issuer of the verification that carried the path to the next level.
    pub issuer: Option<Address>,
    pub status: ComputedStatus,
    pub warnings: Vec<VerificationWarning>,
}

/// The chain of composites from a verification up towards its root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPath {
    pub links: Vec<TrustLink>,
}

impl TrustPath {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn last(&self) -> Option<&TrustLink> {
        self.links.last()
    }

    /// The last link is a root-level topic.
    pub fn reaches_root(&self) -> bool {
        self.links
            .last()
            .is_some_and(|link| link.topic.parent().is_none())
    }

    /// Reaches the root with every link confirmed and free of warnings.
    pub fn is_intact(&self) -> bool {
        self.reaches_root()
            && self
                .links
                .iter()
                .all(|l| l.status == ComputedStatus::Confirmed && l.warnings.is_empty())
    }
}

/// Follow the winning verification's parent composite one level at a time.
///
/// The walk stops at a root-level topic or before a `Missing` parent; the
/// last link then carries `parentMissing`. A `Missing` composite yields an
/// empty path.
pub fn trace_trust_path(composite: &ComputedVerification) -> TrustPath {
    let mut links = Vec::new();
    if composite.is_missing() {
        return TrustPath { links };
    }

    let mut current = composite;
    loop {
        let carrier = current
            .verifications
            .iter()
            .find(|v| v.status == current.status && v.parent.is_some());

        links.push(TrustLink {
            topic: current.topic.clone(),
            subject: current.subject,
            issuer: carrier
                .or_else(|| current.winning())
                .and_then(|v| v.issuer()),
            status: current.status,
            warnings: current.warnings.clone(),
        });

        match carrier.and_then(|v| v.parent.as_deref()) {
            Some(parent) if !parent.is_missing() => current = parent,
            _ => break,
        }
    }

    TrustPath { links }
}
