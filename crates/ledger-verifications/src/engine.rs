//! The verifications engine.
//!
//! One long-lived value owns the collaborators, the identity cache, both
//! verification caches and the read limiter. Clones share all of it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use log::debug;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::{CacheKey, VerificationCache};
use crate::config::EngineConfig;
use crate::error::{VerificationError, Result};
use crate::identity::{IdentityResolver, ResolvedIdentity};
use crate::ledger::{
    Address, ClaimId, ContentStore, ContractDescriptions, Hash32, KeyStore, LedgerClient,
    NameRegistry,
};
use crate::memory::MemoryLedger;
use crate::relay::MetaTransactionRelay;
use crate::time::now_secs;
use crate::topic::Topic;
use crate::trust::{
    compute_verifications, derive_warnings, evaluate, trace_trust_path, ComputedVerification,
    TrustLevel, TrustPath, ValidationOptions, WarningContext,
};
use crate::verification::{
    ClaimStore, DescriptionResolver, NestedVerification, Verification, VerificationRequest,
    VerificationWarning,
};

type VerificationSet = Arc<Vec<Verification>>;
type NestedSet = Arc<Vec<NestedVerification>>;
type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Collaborators the engine talks to.
#[derive(Clone)]
pub struct Backends {
    pub ledger: Arc<dyn LedgerClient>,
    pub content: Arc<dyn ContentStore>,
    pub names: Arc<dyn NameRegistry>,
    pub descriptions: Arc<dyn ContractDescriptions>,
    pub keys: Arc<dyn KeyStore>,
}

impl Backends {
    /// Use one in-memory ledger for every collaborator.
    pub fn from_memory(ledger: Arc<MemoryLedger>) -> Self {
        Self {
            ledger: ledger.clone(),
            content: ledger.clone(),
            names: ledger.clone(),
            descriptions: ledger.clone(),
            keys: ledger,
        }
    }
}

struct EngineInner {
    config: EngineConfig,
    ledger: Arc<dyn LedgerClient>,
    descriptions: Arc<dyn ContractDescriptions>,
    resolver: Arc<IdentityResolver>,
    store: ClaimStore,
    verifications: VerificationCache<VerificationSet>,
    nested: VerificationCache<NestedSet>,
}

/// Issues, mutates and evaluates verifications.
#[derive(Clone)]
pub struct VerificationsEngine {
    inner: Arc<EngineInner>,
}

impl VerificationsEngine {
    /// Build an engine over `backends`.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::Config` if `config` is invalid.
    pub fn new(config: EngineConfig, backends: Backends) -> Result<Self> {
        config.validate()?;

        let resolver = Arc::new(IdentityResolver::new(
            backends.ledger.clone(),
            backends.descriptions.clone(),
        ));
        let relay = Arc::new(MetaTransactionRelay::new(
            backends.ledger.clone(),
            resolver.clone(),
        ));
        let descriptions = Arc::new(DescriptionResolver::new(
            backends.names.clone(),
            backends.content.clone(),
            config.description_root.clone(),
        ));
        let store = ClaimStore::new(
            backends.ledger.clone(),
            backends.content.clone(),
            backends.keys.clone(),
            resolver.clone(),
            relay,
            descriptions,
            Arc::new(Semaphore::new(config.max_concurrency)),
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                ledger: backends.ledger,
                descriptions: backends.descriptions,
                resolver,
                store,
                verifications: VerificationCache::new("verifications"),
                nested: VerificationCache::new("nested"),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ── Identities ───────────────────────────────────────────────────────

    pub async fn resolve_identity(&self, subject: &Address) -> Result<ResolvedIdentity> {
        self.inner.resolver.resolve(subject).await
    }

    pub async fn identity_available(&self, subject: &Address) -> Result<bool> {
        self.inner.resolver.identity_available(subject).await
    }

    /// Register an identity contract for `account`.
    pub async fn create_identity(&self, account: &Address) -> Result<Address> {
        let identity = self.inner.ledger.create_account_identity(account).await?;
        self.inner.resolver.evict(account)?;
        Ok(identity)
    }

    /// Link a new identity to `contract` and declare it in the contract's
    /// description.
    pub async fn create_contract_identity(&self, owner: &Address, contract: &Address) -> Result<Hash32> {
        let identity = self
            .inner
            .ledger
            .link_contract_identity(owner, contract)
            .await?;
        self.inner
            .descriptions
            .declare_identity(contract, &identity)
            .await?;
        self.inner.resolver.evict(contract)?;
        Ok(identity)
    }

    pub fn evict_identity(&self, subject: &Address) -> Result<bool> {
        self.inner.resolver.evict(subject)
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Issue a verification. Returns the new claim id.
    pub async fn set_verification(&self, request: &VerificationRequest) -> Result<ClaimId> {
        self.evict_verifications(&request.topic, &request.subject)?;
        let claim_id = self.inner.store.set_verification(request).await?;
        self.evict_verifications(&request.topic, &request.subject)?;
        Ok(claim_id)
    }

    /// Confirm a verification as its subject.
    ///
    /// # Errors
    ///
    /// `AlreadyRejected` if the verification was rejected.
    pub async fn confirm_verification(
        &self,
        from: &Address,
        subject: &Address,
        topic: &Topic,
        claim_id: &ClaimId,
    ) -> Result<()> {
        self.evict_verifications(topic, subject)?;
        self.inner.store.confirm(from, subject, topic, claim_id).await?;
        self.evict_verifications(topic, subject)
    }

    /// Reject a verification as its subject or issuer, optionally with a reason.
    pub async fn reject_verification(
        &self,
        from: &Address,
        subject: &Address,
        topic: &Topic,
        claim_id: &ClaimId,
        reason: Option<&Value>,
    ) -> Result<()> {
        self.evict_verifications(topic, subject)?;
        self.inner
            .store
            .reject(from, subject, topic, claim_id, reason)
            .await?;
        self.evict_verifications(topic, subject)
    }

    /// Delete a verification as its issuer or as a holder of the parent topic.
    pub async fn delete_verification(
        &self,
        from: &Address,
        subject: &Address,
        topic: &Topic,
        claim_id: &ClaimId,
    ) -> Result<()> {
        self.evict_verifications(topic, subject)?;
        self.inner.store.delete(from, subject, topic, claim_id).await?;
        self.evict_verifications(topic, subject)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Verifications of `subject` on `topic`, memoized until evicted.
    pub async fn get_verifications(&self, subject: &Address, topic: &Topic) -> Result<VerificationSet> {
        self.inner.clone().raw(*subject, topic.clone()).await
    }

    /// Verifications of `subject` on `topic` with trust annotations,
    /// memoized until evicted.
    ///
    /// A subject without identity yields one `Missing` entry carrying
    /// `noIdentity`; a topic without verifications yields an empty list.
    pub async fn get_nested_verifications(&self, subject: &Address, topic: &Topic) -> Result<NestedSet> {
        self.inner.clone().nested(*subject, topic.clone()).await
    }

    /// Composite of the nested verifications of `subject` on `topic`.
    pub async fn get_computed_verification(
        &self,
        subject: &Address,
        topic: &Topic,
    ) -> Result<ComputedVerification> {
        let nested = self.get_nested_verifications(subject, topic).await?;
        Ok(compute_verifications(topic, nested.as_ref().clone()))
    }

    /// Trust path from `topic` of `subject` towards its root-level topic.
    pub async fn validate_trust_path(&self, subject: &Address, topic: &Topic) -> Result<TrustPath> {
        let composite = self.get_computed_verification(subject, topic).await?;
        Ok(trace_trust_path(&composite))
    }

    /// Traffic-light level of `topic` of `subject` under `options`.
    pub async fn verification_status(
        &self,
        subject: &Address,
        topic: &Topic,
        options: &ValidationOptions,
    ) -> Result<TrustLevel> {
        let composite = self.get_computed_verification(subject, topic).await?;
        Ok(evaluate(&composite, options))
    }

    /// Payload attached to a verification, best effort.
    pub async fn get_verification_payload(&self, verification: &Verification) -> Option<Value> {
        self.inner.store.get_verification_payload(verification).await
    }

    // ── Cache control ────────────────────────────────────────────────────

    /// Drop cached reads of `(topic, subject)` and of every topic below it.
    pub fn evict_verifications(&self, topic: &Topic, subject: &Address) -> Result<()> {
        self.inner.verifications.evict(topic, subject)?;
        self.inner.nested.evict(topic, subject)?;
        Ok(())
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.inner.verifications.clear()?;
        self.inner.nested.clear()?;
        self.inner.resolver.clear()
    }
}

impl EngineInner {
    async fn raw(self: Arc<Self>, subject: Address, topic: Topic) -> Result<VerificationSet> {
        let key = CacheKey::new(topic.clone(), subject);
        let store = self.store.clone();
        self.verifications
            .get_or_load(key, || async move {
                Ok(Arc::new(store.get_verifications(&subject, &topic).await?))
            })
            .await
    }

    fn nested(self: Arc<Self>, subject: Address, topic: Topic) -> BoxFuture<Result<NestedSet>> {
        Box::pin(async move {
            let key = CacheKey::new(topic.clone(), subject);
            let loader = self.clone();
            self.nested
                .get_or_load(key, || loader.load_nested(subject, topic))
                .await
        })
    }

    async fn load_nested(self: Arc<Self>, subject: Address, topic: Topic) -> Result<NestedSet> {
        if !self.resolver.identity_available(&subject).await? {
            debug!("{subject} has no identity, reporting {topic} as missing");
            return Ok(Arc::new(vec![NestedVerification::missing(
                subject,
                topic,
                vec![VerificationWarning::NoIdentity],
            )]));
        }

        let verifications = self.clone().raw(subject, topic.clone()).await?;
        let parent_topic = topic.parent();

        let mut tasks = JoinSet::new();
        for (index, verification) in verifications.iter().cloned().enumerate() {
            let inner = self.clone();
            let parent_topic = parent_topic.clone();
            tasks.spawn(async move {
                let parent = match parent_topic {
                    Some(parent_topic) => {
                        let siblings = inner
                            .clone()
                            .nested(verification.issuer, parent_topic.clone())
                            .await?;
                        Some(Arc::new(compute_verifications(
                            &parent_topic,
                            siblings.as_ref().clone(),
                        )))
                    }
                    None => None,
                };
                let warnings = derive_warnings(
                    &verification,
                    parent.as_deref(),
                    WarningContext {
                        now: now_secs(),
                        trusted_roots: &inner.config.trusted_roots,
                    },
                );
                Ok::<_, VerificationError>((
                    index,
                    NestedVerification {
                        topic: verification.topic.clone(),
                        subject: verification.subject,
                        status: verification.status.into(),
                        warnings,
                        details: Some(verification),
                        parent,
                    },
                ))
            });
        }

        let mut slots: Vec<Option<NestedVerification>> = vec![None; verifications.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, nested) = joined??;
            slots[index] = Some(nested);
        }
        Ok(Arc::new(slots.into_iter().flatten().collect()))
    }
}
