//! Composite status of all verifications on one topic and subject.

use serde::{Deserialize, Serialize};

use crate::ledger::Address;
use crate::topic::Topic;
use crate::verification::{ComputedStatus, NestedVerification, VerificationDescription, VerificationWarning};

/// The reduced view of a set of verifications. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedVerification {
    pub topic: Topic,
    /// Subject of the input verifications, `None` when there were none.
    pub subject: Option<Address>,
    /// Display name, from the first verification's description.
    pub name: String,
    pub icon: Option<String>,
    pub status: ComputedStatus,
    /// Warnings of all input verifications, in input order.
    pub warnings: Vec<VerificationWarning>,
    /// Earliest creation among verifications with the final status.
    pub creation_date: Option<u64>,
    /// Latest expiration among verifications with the final status.
    pub expiration_date: Option<u64>,
    pub disable_subverifications: bool,
    pub verifications: Vec<NestedVerification>,
}

impl ComputedVerification {
    pub fn is_missing(&self) -> bool {
        self.status == ComputedStatus::Missing
    }

    pub fn has_warning(&self, warning: VerificationWarning) -> bool {
        self.warnings.contains(&warning)
    }

    /// First input verification carrying the composite status.
    pub fn winning(&self) -> Option<&NestedVerification> {
        self.verifications.iter().find(|v| v.status == self.status)
    }
}

/// Reduce `verifications` of `topic` into one composite.
///
/// Statuses fold in input order starting from `Missing`:
/// - a rejected verification only wins over `Missing`;
/// - any other status replaces a `Rejected` composite outright and
///   otherwise takes the maximum, `Confirmed` above `Issued`.
///
/// So `[Confirmed, Rejected]` is confirmed, `[Rejected]` is rejected and
/// `[Rejected, Issued]` is issued.
pub fn compute_verifications(
    topic: &Topic,
    verifications: Vec<NestedVerification>,
) -> ComputedVerification {
    let mut status = ComputedStatus::Missing;
    for v in &verifications {
        status = match (status, v.status) {
            (_, ComputedStatus::Missing) => status,
            (ComputedStatus::Missing, ComputedStatus::Rejected) => ComputedStatus::Rejected,
            (_, ComputedStatus::Rejected) => status,
            (ComputedStatus::Rejected, incoming) => incoming,
            (current, incoming) => {
                if incoming.code() > current.code() {
                    incoming
                } else {
                    current
                }
            }
        };
    }

    let mut creation_date: Option<u64> = None;
    let mut expiration_date: Option<u64> = None;
    for details in verifications
        .iter()
        .filter(|v| v.status == status)
        .filter_map(|v| v.details.as_ref())
    {
        creation_date = Some(match creation_date {
            Some(current) => current.min(details.creation_date),
            None => details.creation_date,
        });
        if let Some(exp) = details.expiration_date {
            expiration_date = Some(expiration_date.map_or(exp, |current| current.max(exp)));
        }
    }

    let description = verifications
        .first()
        .and_then(|v| v.details.as_ref())
        .map(|d| d.description.clone())
        .unwrap_or_else(|| VerificationDescription::default_for(topic));

    let warnings = verifications
        .iter()
        .flat_map(|v| v.warnings.iter().copied())
        .collect();
    let disable_subverifications = verifications
        .iter()
        .filter_map(|v| v.details.as_ref())
        .any(|d| d.disable_subverifications);

    ComputedVerification {
        topic: topic.clone(),
        subject: verifications.first().map(|v| v.subject),
        name: description.name,
        icon: description.icon,
        status,
        warnings,
        creation_date,
        expiration_date,
        disable_subverifications,
        verifications,
    }
}
