//! Identity resolution — subject address to identity handle.
//!
//! Accounts are looked up in the global identity registry first. Anything
//! else is treated as a contract whose description declares its identity;
//! the declaration is only accepted when the registry's reverse link points
//! back at the same contract.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::error::{VerificationError, Result};
use crate::ledger::{Address, ContractDescriptions, Hash32, Identity, LedgerClient, SubjectType};

/// JSON pointer of the declared identity inside a contract description.
const DECLARED_IDENTITY_POINTER: &str = "/public/identity";

/// A subject's identity together with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity: Identity,
    pub subject_type: SubjectType,
}

impl ResolvedIdentity {
    fn new(identity: Identity) -> Self {
        Self {
            identity,
            subject_type: identity.subject_type(),
        }
    }
}

/// Resolves and caches subject identities.
///
/// Entries live until evicted; there is no TTL.
pub struct IdentityResolver {
    ledger: Arc<dyn LedgerClient>,
    descriptions: Arc<dyn ContractDescriptions>,
    cache: Mutex<HashMap<Address, ResolvedIdentity>>,
}

impl IdentityResolver {
    pub fn new(ledger: Arc<dyn LedgerClient>, descriptions: Arc<dyn ContractDescriptions>) -> Self {
        Self {
            ledger,
            descriptions,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the identity of `subject`.
    ///
    /// # Errors
    ///
    /// `IdentityNotFound` when the subject is neither a registered account nor
    /// a contract declaring an identity; `IdentityIntegrity` when the declared
    /// identity is linked to a different contract.
    pub async fn resolve(&self, subject: &Address) -> Result<ResolvedIdentity> {
        let cached = self.lock_cache()?.get(subject).copied();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let resolved = match self.ledger.account_identity(subject).await? {
            Some(identity) if !identity.is_zero() => {
                ResolvedIdentity::new(Identity::Account(identity))
            }
            _ => ResolvedIdentity::new(Identity::Contract(
                self.resolve_contract_identity(subject).await?,
            )),
        };

        debug!("resolved {subject} to {}", resolved.identity);
        self.lock_cache()?.insert(*subject, resolved);
        Ok(resolved)
    }

    async fn resolve_contract_identity(&self, subject: &Address) -> Result<Hash32> {
        let description = self
            .descriptions
            .description(subject)
            .await?
            .ok_or(VerificationError::IdentityNotFound(*subject))?;

        let declared = description
            .pointer(DECLARED_IDENTITY_POINTER)
            .and_then(|v| v.as_str())
            .ok_or(VerificationError::IdentityNotFound(*subject))?;
        let identity = Hash32::from_hex(declared)
            .map_err(|_| VerificationError::IdentityNotFound(*subject))?;
        if identity.is_zero() {
            return Err(VerificationError::IdentityNotFound(*subject));
        }

        match self.ledger.contract_of_identity(&identity).await? {
            Some(linked) if linked == *subject => Ok(identity),
            other => Err(VerificationError::IdentityIntegrity {
                subject: *subject,
                identity,
                linked: other
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "no contract".to_string()),
            }),
        }
    }

    /// Whether `subject` resolves to an identity.
    ///
    /// Integrity failures are still errors, not `false`.
    pub async fn identity_available(&self, subject: &Address) -> Result<bool> {
        match self.resolve(subject).await {
            Ok(_) => Ok(true),
            Err(VerificationError::IdentityNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Drop the cached entry for `subject`.
    pub fn evict(&self, subject: &Address) -> Result<bool> {
        Ok(self.lock_cache()?.remove(subject).is_some())
    }

    pub fn clear(&self) -> Result<()> {
        self.lock_cache()?.clear();
        Ok(())
    }

    pub fn cached_len(&self) -> usize {
        self.lock_cache().map(|c| c.len()).unwrap_or(0)
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, HashMap<Address, ResolvedIdentity>>> {
        self.cache
            .lock()
            .map_err(|e| VerificationError::StorageError(format!("identity cache poisoned: {e}")))
    }
}
