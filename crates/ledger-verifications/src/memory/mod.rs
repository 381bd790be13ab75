//! In-memory reference ledger.
//!
//! Implements every collaborator trait over one mutex-guarded
//! [`LedgerState`]: identity registry, claim holders, claim registry,
//! relay execution with its events, block clock, content store, name
//! registry, contract descriptions and key store. Used by the tests and
//! the CLI; the state can be snapshotted to disk through
//! [`crate::storage::ledger_file`].

pub mod state;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use base64::Engine as _;
use log::debug;
use serde_json::{json, Value};

use crate::crypto::{sha256, sign_recoverable, AccountKey};
use crate::error::{VerificationError, Result};
use crate::ledger::{
    Address, ClaimId, ContentStore, ContractDescriptions, Hash32, Identity, KeyPurpose, KeyStore,
    LedgerClient, LedgerEvent, LogEntry, LogFilter, NameRegistry, RawClaim, TxReceipt,
};
use crate::relay::CallData;
use crate::time::now_secs;

pub use state::{
    ClaimHolder, LedgerState, NameRecord, StoredClaim, CLAIM_REGISTRY, IDENTITY_REGISTRY,
    NAME_RESOLVER,
};

pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    suppress_outcomes: AtomicBool,
    listing_reads: AtomicUsize,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::from_state(LedgerState::default())
    }

    pub fn from_state(state: LedgerState) -> Self {
        Self {
            state: Mutex::new(state),
            suppress_outcomes: AtomicBool::new(false),
            listing_reads: AtomicUsize::new(0),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Result<LedgerState> {
        Ok(self.lock_state()?.clone())
    }

    /// Generate a key pair for a new locally managed account.
    pub fn create_account(&self) -> Result<Address> {
        let key = AccountKey::generate();
        let address = key.address();
        let secret = base64::engine::general_purpose::STANDARD.encode(key.secret_bytes());
        self.lock_state()?.accounts.insert(address, secret);
        debug!("created account {address}");
        Ok(address)
    }

    /// Accounts with a local key.
    pub fn accounts(&self) -> Vec<Address> {
        self.lock_state()
            .map(|s| s.accounts.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Deploy a contract, link a new identity to it and declare that
    /// identity in the contract's description.
    pub async fn deploy_contract_with_identity(&self, owner: &Address) -> Result<(Address, Hash32)> {
        let contract = self.lock_state()?.fresh_address("contract");
        let identity = self.link_contract_identity(owner, &contract).await?;
        self.declare_identity(&contract, &identity).await?;
        Ok((contract, identity))
    }

    pub fn set_contract_description(&self, contract: &Address, description: Value) -> Result<()> {
        self.lock_state()?.descriptions.insert(*contract, description);
        Ok(())
    }

    /// Point the registry node `node` at `content`.
    pub fn set_name_record(&self, node: Hash32, content: Hash32) -> Result<()> {
        self.lock_state()?.names.insert(
            node,
            NameRecord {
                resolver: NAME_RESOLVER,
                content,
            },
        );
        Ok(())
    }

    /// When set, relayed calls still apply but emit neither `Executed`
    /// nor `ExecutionFailed`.
    pub fn suppress_outcome_events(&self, suppress: bool) {
        self.suppress_outcomes.store(suppress, Ordering::SeqCst);
    }

    /// Number of claim listings served so far.
    pub fn claim_listing_count(&self) -> usize {
        self.listing_reads.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|e| VerificationError::StorageError(format!("ledger state poisoned: {e}")))
    }

    fn with_claim<T>(
        &self,
        holder: &Identity,
        claim_id: &ClaimId,
        read: impl FnOnce(&StoredClaim) -> T,
        absent: T,
    ) -> Result<T> {
        let state = self.lock_state()?;
        let holder_state = state
            .holder(holder)
            .ok_or_else(|| VerificationError::Ledger(format!("unknown claim holder {holder}")))?;
        Ok(holder_state.claim(claim_id).map(read).unwrap_or(absent))
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    fn claim_registry(&self) -> Address {
        CLAIM_REGISTRY
    }

    async fn account_identity(&self, account: &Address) -> Result<Option<Address>> {
        Ok(self.lock_state()?.account_identities.get(account).copied())
    }

    async fn identity_owner(&self, identity: &Address) -> Result<Option<Address>> {
        Ok(self.lock_state()?.identity_owners.get(identity).copied())
    }

    async fn contract_of_identity(&self, identity: &Hash32) -> Result<Option<Address>> {
        Ok(self.lock_state()?.contract_links.get(identity).copied())
    }

    async fn create_account_identity(&self, account: &Address) -> Result<Address> {
        let mut state = self.lock_state()?;
        let identity = state
            .register_account_identity(account)
            .map_err(VerificationError::Ledger)?;
        let block = state.open_block(now_secs());
        let tx_hash = sha256(identity.as_bytes());
        state.emit(
            IDENTITY_REGISTRY,
            block,
            tx_hash,
            LedgerEvent::IdentityCreated {
                account: *account,
                identity,
            },
        );
        debug!("created identity {identity} for {account}");
        Ok(identity)
    }

    async fn link_contract_identity(&self, owner: &Address, contract: &Address) -> Result<Hash32> {
        let mut state = self.lock_state()?;
        let identity = state
            .register_contract_identity(owner, contract)
            .map_err(VerificationError::Ledger)?;
        let block = state.open_block(now_secs());
        state.emit(
            CLAIM_REGISTRY,
            block,
            sha256(identity.as_bytes()),
            LedgerEvent::ContractIdentityLinked {
                contract: *contract,
                identity,
            },
        );
        debug!("linked identity {identity} to {contract}");
        Ok(identity)
    }

    async fn claim_ids_by_topic(&self, holder: &Identity, topic: &Hash32) -> Result<Vec<ClaimId>> {
        self.listing_reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let state = self.lock_state()?;
        let holder_state = state
            .holder(holder)
            .ok_or_else(|| VerificationError::Ledger(format!("unknown claim holder {holder}")))?;
        Ok(holder_state
            .claims
            .iter()
            .filter(|c| c.claim.topic == *topic)
            .map(|c| c.id)
            .collect())
    }

    async fn claim(&self, holder: &Identity, claim_id: &ClaimId) -> Result<RawClaim> {
        self.with_claim(holder, claim_id, |c| c.claim.clone(), RawClaim::empty())
    }

    async fn is_claim_approved(&self, holder: &Identity, claim_id: &ClaimId) -> Result<bool> {
        self.with_claim(holder, claim_id, |c| c.approved, false)
    }

    async fn is_claim_rejected(&self, holder: &Identity, claim_id: &ClaimId) -> Result<bool> {
        self.with_claim(holder, claim_id, |c| c.rejected, false)
    }

    async fn claim_rejection_reason(&self, holder: &Identity, claim_id: &ClaimId) -> Result<Hash32> {
        self.with_claim(holder, claim_id, |c| c.reject_reason, Hash32::ZERO)
    }

    async fn claim_creation_block(&self, holder: &Identity, claim_id: &ClaimId) -> Result<u64> {
        self.with_claim(holder, claim_id, |c| c.creation_block, 0)
    }

    async fn claim_expiration(&self, holder: &Identity, claim_id: &ClaimId) -> Result<u64> {
        self.with_claim(holder, claim_id, |c| c.expiration, 0)
    }

    async fn is_subclaims_disabled(&self, holder: &Identity, claim_id: &ClaimId) -> Result<bool> {
        self.with_claim(holder, claim_id, |c| c.disable_subclaims, false)
    }

    async fn key_has_purpose(&self, identity: &Identity, key: &Hash32, purpose: KeyPurpose) -> Result<bool> {
        let state = self.lock_state()?;
        Ok(state
            .holder(identity)
            .and_then(|h| h.keys.get(key))
            .is_some_and(|purposes| purposes.contains(&purpose)))
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64> {
        let state = self.lock_state()?;
        usize::try_from(block_number)
            .ok()
            .and_then(|i| state.blocks.get(i).copied())
            .ok_or_else(|| VerificationError::Ledger(format!("unknown block {block_number}")))
    }

    async fn execute(
        &self,
        from: &Address,
        executor: &Address,
        target: &Address,
        data: Vec<u8>,
        _value: u128,
    ) -> Result<TxReceipt> {
        let call = CallData::decode(&data)?;
        let mut state = self.lock_state()?;
        if state.identity_owners.get(executor) != Some(from) {
            return Err(VerificationError::Ledger(format!(
                "{from} holds no management key on {executor}"
            )));
        }

        let block = state.open_block(now_secs());
        let execution_id = state.next_execution_id;
        state.next_execution_id += 1;
        let mut seed = block.to_be_bytes().to_vec();
        seed.extend_from_slice(&execution_id.to_be_bytes());
        let tx_hash = sha256(&seed);

        let approved = state.emit(
            *executor,
            block,
            tx_hash,
            LedgerEvent::Approved {
                execution_id,
                approved: true,
            },
        );

        let outcome = match state.apply_call(executor, target, call, block) {
            Ok(event) => {
                state.emit(*target, block, tx_hash, event);
                LedgerEvent::Executed {
                    execution_id,
                    to: *target,
                }
            }
            Err(reason) => {
                debug!("execution {execution_id} on {target} reverted: {reason}");
                LedgerEvent::ExecutionFailed {
                    execution_id,
                    to: *target,
                }
            }
        };
        if !self.suppress_outcomes.load(Ordering::SeqCst) {
            state.emit(*executor, block, tx_hash, outcome);
        }

        Ok(TxReceipt {
            tx_hash,
            block_number: block,
            logs: vec![approved],
        })
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let state = self.lock_state()?;
        Ok(state
            .logs
            .iter()
            .filter(|l| {
                l.address == filter.address
                    && l.block_number >= filter.from_block
                    && l.block_number <= filter.to_block
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ContentStore for MemoryLedger {
    async fn put(&self, bytes: Vec<u8>) -> Result<Hash32> {
        Ok(self.lock_state()?.put_content(&bytes))
    }

    async fn get(&self, hash: &Hash32) -> Result<Option<Vec<u8>>> {
        self.lock_state()?
            .get_content(hash)
            .map_err(VerificationError::StorageError)
    }
}

#[async_trait]
impl NameRegistry for MemoryLedger {
    async fn resolver(&self, node: &Hash32) -> Result<Option<Address>> {
        Ok(self.lock_state()?.names.get(node).map(|r| r.resolver))
    }

    async fn content_hash(&self, resolver: &Address, node: &Hash32) -> Result<Option<Hash32>> {
        Ok(self
            .lock_state()?
            .names
            .get(node)
            .filter(|r| r.resolver == *resolver)
            .map(|r| r.content))
    }
}

#[async_trait]
impl ContractDescriptions for MemoryLedger {
    async fn description(&self, contract: &Address) -> Result<Option<Value>> {
        Ok(self.lock_state()?.descriptions.get(contract).cloned())
    }

    async fn declare_identity(&self, contract: &Address, identity: &Hash32) -> Result<()> {
        let mut state = self.lock_state()?;
        let description = state
            .descriptions
            .entry(*contract)
            .or_insert_with(|| json!({ "public": {} }));
        match description.get_mut("public").and_then(Value::as_object_mut) {
            Some(public) => {
                public.insert("identity".into(), Value::String(identity.to_hex()));
            }
            None => {
                *description = json!({ "public": { "identity": identity.to_hex() } });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl KeyStore for MemoryLedger {
    async fn sign(&self, account: &Address, message: &[u8]) -> Result<Vec<u8>> {
        let secret = self
            .lock_state()?
            .accounts
            .get(account)
            .cloned()
            .ok_or_else(|| VerificationError::InvalidKey(format!("no local key for {account}")))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(secret)
            .map_err(|e| VerificationError::InvalidKey(format!("corrupt key for {account}: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VerificationError::InvalidKey(format!("key for {account} must be 32 bytes")))?;
        let key = AccountKey::from_secret_bytes(&bytes);
        Ok(sign_recoverable(key.signing_key(), message))
    }
}
