//! Collaborator interfaces consumed by the engine.
//!
//! The engine never talks to a concrete chain, content store or name
//! registry. It consumes these traits:
//! - [`LedgerClient`] — identity registry, claim holders, claim registry,
//!   relay submission and block-scoped log scans
//! - [`ContentStore`] — content-addressed blobs keyed by a 32-byte hash
//! - [`NameRegistry`] — hierarchical name resolution to content hashes
//! - [`ContractDescriptions`] — off-chain contract descriptions
//! - [`KeyStore`] — local signing keys
//!
//! [`crate::memory::MemoryLedger`] implements all of them in memory.

pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use types::{
    Address, ClaimId, Hash32, Identity, KeyPurpose, LedgerEvent, LogEntry, LogFilter, RawClaim,
    SubjectType, TxReceipt,
};

/// Ledger access: registries, claim storage and relay submission.
///
/// Claim reads take the holder [`Identity`]: account identities hold their
/// own claims, contract identities are served by the shared claim registry.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Address of the shared claim registry serving contract identities.
    fn claim_registry(&self) -> Address;

    /// Identity contract registered for `account`, `None` for the null sentinel.
    async fn account_identity(&self, account: &Address) -> Result<Option<Address>>;

    /// Account owning an identity contract.
    async fn identity_owner(&self, identity: &Address) -> Result<Option<Address>>;

    /// Reverse link of a contract identity to its contract address.
    async fn contract_of_identity(&self, identity: &Hash32) -> Result<Option<Address>>;

    /// Create and register an identity contract for `account`.
    async fn create_account_identity(&self, account: &Address) -> Result<Address>;

    /// Link a new contract identity to `contract`, managed by `owner`.
    async fn link_contract_identity(&self, owner: &Address, contract: &Address) -> Result<Hash32>;

    async fn claim_ids_by_topic(&self, holder: &Identity, topic: &Hash32) -> Result<Vec<ClaimId>>;

    async fn claim(&self, holder: &Identity, claim_id: &ClaimId) -> Result<RawClaim>;

    async fn is_claim_approved(&self, holder: &Identity, claim_id: &ClaimId) -> Result<bool>;

    async fn is_claim_rejected(&self, holder: &Identity, claim_id: &ClaimId) -> Result<bool>;

    /// Content hash of the rejection reason, zero when none was given.
    async fn claim_rejection_reason(&self, holder: &Identity, claim_id: &ClaimId)
        -> Result<Hash32>;

    async fn claim_creation_block(&self, holder: &Identity, claim_id: &ClaimId) -> Result<u64>;

    /// Expiration as epoch seconds, zero when the claim never expires.
    async fn claim_expiration(&self, holder: &Identity, claim_id: &ClaimId) -> Result<u64>;

    async fn is_subclaims_disabled(&self, holder: &Identity, claim_id: &ClaimId) -> Result<bool>;

    async fn key_has_purpose(
        &self,
        identity: &Identity,
        key: &Hash32,
        purpose: KeyPurpose,
    ) -> Result<bool>;

    async fn block_timestamp(&self, block_number: u64) -> Result<u64>;

    /// Submit `data` for `target` through the `executor` identity's relay
    /// entry point, signed by `from`.
    ///
    /// The receipt only carries the executor's `Approved` event; the inner
    /// call's outcome has to be read back from the block's logs.
    async fn execute(
        &self,
        from: &Address,
        executor: &Address,
        target: &Address,
        data: Vec<u8>,
        value: u128,
    ) -> Result<TxReceipt>;

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>>;
}

/// Content-addressed blob storage.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>) -> Result<Hash32>;
    async fn get(&self, hash: &Hash32) -> Result<Option<Vec<u8>>>;
}

/// Hierarchical name registry: node → resolver → content hash.
#[async_trait]
pub trait NameRegistry: Send + Sync {
    async fn resolver(&self, node: &Hash32) -> Result<Option<Address>>;
    async fn content_hash(&self, resolver: &Address, node: &Hash32) -> Result<Option<Hash32>>;
}

/// Off-chain contract descriptions.
///
/// A contract's declared identity lives at `public.identity`.
#[async_trait]
pub trait ContractDescriptions: Send + Sync {
    async fn description(&self, contract: &Address) -> Result<Option<Value>>;
    async fn declare_identity(&self, contract: &Address, identity: &Hash32) -> Result<()>;
}

/// Local key store producing recoverable signatures for accounts.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn sign(&self, account: &Address, message: &[u8]) -> Result<Vec<u8>>;
}
