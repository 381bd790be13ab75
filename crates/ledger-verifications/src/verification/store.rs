//! Claim store adapter — issue, confirm, reject, delete and read claims.

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::crypto::{key_id, recover_signer, verification_data_hash};
use crate::error::{VerificationError, Result};
use crate::identity::{IdentityResolver, ResolvedIdentity};
use crate::ledger::{
    Address, ClaimId, ContentStore, Hash32, Identity, KeyPurpose, KeyStore, LedgerClient,
    LedgerEvent, RawClaim,
};
use crate::relay::{ClaimFunction, ExecOptions, MetaTransactionRelay};
use crate::time::optional_secs;
use crate::topic::Topic;

use super::description::DescriptionResolver;
use super::types::{Verification, VerificationStatus};

/// Claim scheme for signatures that carry the signer's key.
const RECOVERABLE_SIGNATURE_SCHEME: u64 = 1;

/// Parameters of a new verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub issuer: Address,
    pub subject: Address,
    pub topic: Topic,
    /// Epoch seconds; `None` never expires.
    pub expiration: Option<u64>,
    pub payload: Option<Value>,
    /// Registry domain of the topic description.
    pub description_domain: Option<String>,
    pub disable_subverifications: bool,
    pub uri: String,
}

impl VerificationRequest {
    pub fn new(issuer: Address, subject: Address, topic: Topic) -> Self {
        Self {
            issuer,
            subject,
            topic,
            expiration: None,
            payload: None,
            description_domain: None,
            disable_subverifications: false,
            uri: String::new(),
        }
    }

    pub fn expires_at(mut self, secs: u64) -> Self {
        self.expiration = Some(secs);
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn description_domain(mut self, domain: impl Into<String>) -> Self {
        self.description_domain = Some(domain.into());
        self
    }

    pub fn disable_subverifications(mut self, disable: bool) -> Self {
        self.disable_subverifications = disable;
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }
}

/// Reads and writes claims on claim holders.
///
/// Cloning is cheap; clones share collaborators and the read limiter.
#[derive(Clone)]
pub struct ClaimStore {
    ledger: Arc<dyn LedgerClient>,
    content: Arc<dyn ContentStore>,
    keys: Arc<dyn KeyStore>,
    resolver: Arc<IdentityResolver>,
    relay: Arc<MetaTransactionRelay>,
    descriptions: Arc<DescriptionResolver>,
    limiter: Arc<Semaphore>,
}

impl ClaimStore {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        content: Arc<dyn ContentStore>,
        keys: Arc<dyn KeyStore>,
        resolver: Arc<IdentityResolver>,
        relay: Arc<MetaTransactionRelay>,
        descriptions: Arc<DescriptionResolver>,
        limiter: Arc<Semaphore>,
    ) -> Self {
        Self {
            ledger,
            content,
            keys,
            resolver,
            relay,
            descriptions,
            limiter,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Issue a verification and return its claim id.
    pub async fn set_verification(&self, request: &VerificationRequest) -> Result<ClaimId> {
        let subject = self.resolver.resolve(&request.subject).await?;
        let issuer_identity = self.account_identity_of(&request.issuer, &request.topic, "issue").await?;

        let payload_hash = match &request.payload {
            Some(payload) => self.content.put(serde_json::to_vec(payload)?).await?,
            None => Hash32::ZERO,
        };
        let topic_hash = request.topic.hash();
        let data_hash = verification_data_hash(&subject.identity, &topic_hash, &payload_hash);
        let signature = self.keys.sign(&request.issuer, data_hash.as_bytes()).await?;

        let description = request
            .description_domain
            .as_deref()
            .map(|domain| DescriptionResolver::node_for(&request.topic, domain))
            .unwrap_or(Hash32::ZERO);

        let function = ClaimFunction::AddClaim {
            topic: topic_hash,
            scheme: RECOVERABLE_SIGNATURE_SCHEME,
            issuer: issuer_identity,
            signature,
            data: payload_hash,
            uri: request.uri.clone(),
            description,
            expiration: request.expiration.unwrap_or(0),
            disable_subclaims: request.disable_subverifications,
        };

        let claim_id = self
            .relay
            .execute_on_identity_with(
                &request.subject,
                function,
                ExecOptions::from(request.issuer),
                |event| match event {
                    LedgerEvent::ClaimAdded {
                        claim_id, topic, ..
                    } if *topic == topic_hash => Some(*claim_id),
                    _ => None,
                },
            )
            .await?
            .into_result(&request.subject)?;

        debug!(
            "issued {claim_id} on {} for {} by {}",
            request.topic, request.subject, request.issuer
        );
        Ok(claim_id)
    }

    /// Confirm a verification as its subject.
    pub async fn confirm(
        &self,
        from: &Address,
        subject: &Address,
        topic: &Topic,
        claim_id: &ClaimId,
    ) -> Result<()> {
        let holder = self.resolver.resolve(subject).await?.identity;
        self.existing_claim(&holder, subject, topic, claim_id).await?;
        if self.ledger.is_claim_rejected(&holder, claim_id).await? {
            return Err(VerificationError::AlreadyRejected {
                subject: *subject,
                claim_id: *claim_id,
            });
        }

        let id = *claim_id;
        self.relay
            .execute_on_identity_with(
                subject,
                ClaimFunction::ApproveClaim { claim_id: id },
                ExecOptions::from(*from),
                move |event| match event {
                    LedgerEvent::ClaimApproved { claim_id, .. } if *claim_id == id => Some(()),
                    _ => None,
                },
            )
            .await?
            .into_result(subject)
    }

    /// Reject a verification as its subject or issuer, optionally with a reason.
    pub async fn reject(
        &self,
        from: &Address,
        subject: &Address,
        topic: &Topic,
        claim_id: &ClaimId,
        reason: Option<&Value>,
    ) -> Result<()> {
        let holder = self.resolver.resolve(subject).await?.identity;
        self.existing_claim(&holder, subject, topic, claim_id).await?;

        let reason = match reason {
            Some(reason) => self.content.put(serde_json::to_vec(reason)?).await?,
            None => Hash32::ZERO,
        };

        let id = *claim_id;
        self.relay
            .execute_on_identity_with(
                subject,
                ClaimFunction::RejectClaim {
                    claim_id: id,
                    reason,
                },
                ExecOptions::from(*from),
                move |event| match event {
                    LedgerEvent::ClaimRejected { claim_id, .. } if *claim_id == id => Some(()),
                    _ => None,
                },
            )
            .await?
            .into_result(subject)
    }

    /// Delete a verification.
    ///
    /// Allowed for the issuer and for holders of a non-rejected
    /// verification on the parent topic.
    pub async fn delete(
        &self,
        from: &Address,
        subject: &Address,
        topic: &Topic,
        claim_id: &ClaimId,
    ) -> Result<()> {
        let holder = self.resolver.resolve(subject).await?.identity;
        let claim = self.existing_claim(&holder, subject, topic, claim_id).await?;
        let caller_identity = self.account_identity_of(from, topic, "delete").await?;

        let parent = topic.parent();
        let authorized = caller_identity == claim.issuer
            || match &parent {
                Some(parent) => self
                    .get_verifications(from, parent)
                    .await?
                    .iter()
                    .any(|v| v.status != VerificationStatus::Rejected),
                None => false,
            };
        if !authorized {
            return Err(VerificationError::Unauthorized {
                account: *from,
                topic: topic.path(),
                action: "delete".into(),
            });
        }

        let id = *claim_id;
        self.relay
            .execute_on_identity_with(
                subject,
                ClaimFunction::RemoveClaim {
                    claim_id: id,
                    parent_topic: parent.map(|p| p.hash()).unwrap_or(Hash32::ZERO),
                },
                ExecOptions::from(*from),
                move |event| match event {
                    LedgerEvent::ClaimRemoved { claim_id, .. } if *claim_id == id => Some(()),
                    _ => None,
                },
            )
            .await?
            .into_result(subject)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// All live verifications of `subject` on `topic`, in holder order.
    pub async fn get_verifications(&self, subject: &Address, topic: &Topic) -> Result<Vec<Verification>> {
        let resolved = self.resolver.resolve(subject).await?;
        let topic_hash = topic.hash();
        let ids = self
            .limited(self.ledger.claim_ids_by_topic(&resolved.identity, &topic_hash))
            .await?;
        debug!("{} claims on {topic} for {subject}", ids.len());

        let mut tasks = JoinSet::new();
        for (index, claim_id) in ids.into_iter().enumerate() {
            let store = self.clone();
            let subject = *subject;
            let topic = topic.clone();
            tasks.spawn(async move {
                let loaded = store.load(subject, resolved, topic, claim_id).await;
                (index, loaded)
            });
        }

        let mut slots: Vec<Option<Verification>> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, loaded) = joined?;
            if slots.len() <= index {
                slots.resize(index + 1, None);
            }
            slots[index] = loaded?;
        }
        Ok(slots.into_iter().flatten().collect())
    }

    /// Payload attached to `verification`, if any and if readable.
    pub async fn get_verification_payload(&self, verification: &Verification) -> Option<Value> {
        self.fetch_json(&verification.data).await
    }

    async fn load(
        &self,
        subject: Address,
        resolved: ResolvedIdentity,
        topic: Topic,
        claim_id: ClaimId,
    ) -> Result<Option<Verification>> {
        let holder = &resolved.identity;
        let (claim, approved, rejected, creation_block, expiration, disabled, reason_hash) = tokio::try_join!(
            self.limited(self.ledger.claim(holder, &claim_id)),
            self.limited(self.ledger.is_claim_approved(holder, &claim_id)),
            self.limited(self.ledger.is_claim_rejected(holder, &claim_id)),
            self.limited(self.ledger.claim_creation_block(holder, &claim_id)),
            self.limited(self.ledger.claim_expiration(holder, &claim_id)),
            self.limited(self.ledger.is_subclaims_disabled(holder, &claim_id)),
            self.limited(self.ledger.claim_rejection_reason(holder, &claim_id)),
        )?;

        if claim.issuer.is_zero() {
            return Ok(None);
        }
        let Some(issuer) = self.limited(self.ledger.identity_owner(&claim.issuer)).await? else {
            debug!("claim {claim_id} has an issuer without owner, skipping");
            return Ok(None);
        };

        let creation_date = self
            .limited(self.ledger.block_timestamp(creation_block))
            .await?;
        let status = VerificationStatus::from_flags(approved, rejected);
        let reject_reason = match status {
            VerificationStatus::Rejected => self.fetch_json(&reason_hash).await,
            _ => None,
        };
        let valid = self.signature_valid(holder, &topic, &claim).await;
        let description = self.descriptions.resolve(&topic, &claim.description).await;

        Ok(Some(Verification {
            id: claim_id,
            topic,
            status,
            issuer,
            issuer_identity: claim.issuer,
            subject,
            subject_identity: resolved.identity,
            subject_type: resolved.subject_type,
            signature: claim.signature,
            data: claim.data,
            uri: claim.uri,
            description_node: claim.description,
            creation_block,
            creation_date,
            expiration_date: optional_secs(expiration),
            disable_subverifications: disabled,
            valid,
            reject_reason,
            description,
        }))
    }

    /// The signature recovers to a key with the claim purpose on the issuer.
    async fn signature_valid(&self, subject: &Identity, topic: &Topic, claim: &RawClaim) -> bool {
        let data_hash = verification_data_hash(subject, &topic.hash(), &claim.data);
        let signer = match recover_signer(data_hash.as_bytes(), &claim.signature) {
            Ok(signer) => signer,
            Err(e) => {
                debug!("signature of claim on {topic} does not recover: {e}");
                return false;
            }
        };
        let issuer = Identity::Account(claim.issuer);
        match self
            .limited(self.ledger.key_has_purpose(&issuer, &key_id(&signer), KeyPurpose::Claim))
            .await
        {
            Ok(has_purpose) => has_purpose,
            Err(e) => {
                warn!("key purpose lookup for {signer} failed: {e}");
                false
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    async fn existing_claim(
        &self,
        holder: &Identity,
        subject: &Address,
        topic: &Topic,
        claim_id: &ClaimId,
    ) -> Result<RawClaim> {
        let claim = self.ledger.claim(holder, claim_id).await?;
        if claim.issuer.is_zero() {
            return Err(VerificationError::ClaimNotFound {
                subject: *subject,
                claim_id: *claim_id,
            });
        }
        if claim.topic != topic.hash() {
            return Err(VerificationError::InvalidTopic(format!(
                "claim {claim_id} of {subject} is not on {topic}"
            )));
        }
        Ok(claim)
    }

    /// Identity contract of an account acting as issuer or caller.
    async fn account_identity_of(&self, account: &Address, topic: &Topic, action: &str) -> Result<Address> {
        match self.resolver.resolve(account).await?.identity {
            Identity::Account(identity) => Ok(identity),
            Identity::Contract(_) => Err(VerificationError::Unauthorized {
                account: *account,
                topic: topic.path(),
                action: format!("{action} as a contract"),
            }),
        }
    }

    async fn fetch_json(&self, hash: &Hash32) -> Option<Value> {
        if hash.is_zero() {
            return None;
        }
        let bytes = match self.limited(self.content.get(hash)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!("content {hash} not found");
                return None;
            }
            Err(e) => {
                warn!("content {hash} unavailable: {e}");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("content {hash} is not JSON: {e}");
                None
            }
        }
    }

    /// Run one leaf read under the fan-out limiter.
    async fn limited<T>(&self, read: impl Future<Output = Result<T>>) -> Result<T> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| VerificationError::Task(format!("read limiter closed: {e}")))?;
        read.await
    }
}
