//! Traffic-light evaluation of computed verifications.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::verification::{ComputedStatus, VerificationWarning};

use super::composite::ComputedVerification;

/// How far a composite can be trusted. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Green,
    Yellow,
    Red,
}

/// Severity assigned to each warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    #[serde(default)]
    severities: HashMap<VerificationWarning, TrustLevel>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        use VerificationWarning::*;
        let severities = [
            (Issued, TrustLevel::Yellow),
            (ParentUntrusted, TrustLevel::Yellow),
            (SelfIssued, TrustLevel::Yellow),
            (ParentMissing, TrustLevel::Red),
            (Invalid, TrustLevel::Red),
            (Expired, TrustLevel::Red),
            (Rejected, TrustLevel::Red),
            (NoIdentity, TrustLevel::Red),
            (NotRootOwner, TrustLevel::Red),
            (DisableSubVerifications, TrustLevel::Red),
        ]
        .into_iter()
        .collect();
        Self { severities }
    }
}

impl ValidationOptions {
    /// Override the severity of one warning.
    pub fn with(mut self, warning: VerificationWarning, level: TrustLevel) -> Self {
        self.severities.insert(warning, level);
        self
    }

    /// Severity of `warning`; warnings without an entry are red.
    pub fn severity(&self, warning: VerificationWarning) -> TrustLevel {
        self.severities
            .get(&warning)
            .copied()
            .unwrap_or(TrustLevel::Red)
    }
}

/// Worst severity among the composite's status and warnings.
pub fn evaluate(composite: &ComputedVerification, options: &ValidationOptions) -> TrustLevel {
    let status_level = match composite.status {
        ComputedStatus::Missing | ComputedStatus::Rejected => TrustLevel::Red,
        ComputedStatus::Issued | ComputedStatus::Confirmed => TrustLevel::Green,
    };
    composite
        .warnings
        .iter()
        .map(|w| options.severity(*w))
        .fold(status_level, TrustLevel::max)
}
