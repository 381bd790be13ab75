//! Serializable state of the in-memory ledger and its call semantics.

use std::collections::BTreeMap;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{key_id, sha256};
use crate::ledger::{Address, ClaimId, Hash32, Identity, KeyPurpose, LedgerEvent, LogEntry, RawClaim};
use crate::relay::{CallData, ClaimFunction};

/// A claim as kept by its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredClaim {
    pub id: ClaimId,
    pub claim: RawClaim,
    pub approved: bool,
    pub rejected: bool,
    pub reject_reason: Hash32,
    pub creation_block: u64,
    /// Epoch seconds, zero for never.
    pub expiration: u64,
    pub disable_subclaims: bool,
}

/// Keys and claims of one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimHolder {
    /// Account managing the identity.
    pub owner: Address,
    pub keys: BTreeMap<Hash32, Vec<KeyPurpose>>,
    /// Claims in insertion order.
    pub claims: Vec<StoredClaim>,
    /// Counter mixed into claim ids.
    pub nonce: u64,
}

impl ClaimHolder {
    fn new(owner: Address) -> Self {
        let mut keys = BTreeMap::new();
        keys.insert(
            key_id(&owner),
            vec![KeyPurpose::Management, KeyPurpose::Action, KeyPurpose::Claim],
        );
        Self {
            owner,
            keys,
            claims: Vec::new(),
            nonce: 0,
        }
    }

    pub fn claim(&self, claim_id: &ClaimId) -> Option<&StoredClaim> {
        self.claims.iter().find(|c| c.id == *claim_id)
    }

    fn claim_mut(&mut self, claim_id: &ClaimId) -> Option<&mut StoredClaim> {
        self.claims.iter_mut().find(|c| c.id == *claim_id)
    }

    fn holds_live_claim_on(&self, topic: &Hash32) -> bool {
        self.claims.iter().any(|c| c.claim.topic == *topic && !c.rejected)
    }
}

/// A name-registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub resolver: Address,
    pub content: Hash32,
}

/// Everything the in-memory ledger knows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Base64 Ed25519 secrets of locally managed accounts.
    pub accounts: BTreeMap<Address, String>,
    /// Account → identity contract.
    pub account_identities: BTreeMap<Address, Address>,
    /// Identity contract → owning account.
    pub identity_owners: BTreeMap<Address, Address>,
    /// Claim holders of account identities, keyed by identity contract.
    pub account_holders: BTreeMap<Address, ClaimHolder>,
    /// Claim holders of contract identities, keyed by identity id.
    pub contract_holders: BTreeMap<Hash32, ClaimHolder>,
    /// Contract identity → linked contract.
    pub contract_links: BTreeMap<Hash32, Address>,
    pub descriptions: BTreeMap<Address, Value>,
    /// Block timestamps; the block number is the index.
    pub blocks: Vec<u64>,
    pub logs: Vec<LogEntry>,
    /// Base64 content keyed by its hash.
    pub content: BTreeMap<Hash32, String>,
    pub names: BTreeMap<Hash32, NameRecord>,
    pub next_execution_id: u64,
    /// Counter mixed into generated addresses.
    pub nonce: u64,
}

/// Well-known contract addresses of the in-memory ledger.
pub const IDENTITY_REGISTRY: Address = Address([0x11; 20]);
pub const CLAIM_REGISTRY: Address = Address([0x22; 20]);
pub const NAME_RESOLVER: Address = Address([0x33; 20]);

impl LedgerState {
    /// Derive a fresh address from a label and the state nonce.
    pub fn fresh_address(&mut self, label: &str) -> Address {
        Address::from_hash(&self.fresh_hash(label))
    }

    pub fn fresh_hash(&mut self, label: &str) -> Hash32 {
        self.nonce += 1;
        let mut buf = label.as_bytes().to_vec();
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        sha256(&buf)
    }

    /// Open a new block at `timestamp` (kept strictly increasing).
    pub fn open_block(&mut self, timestamp: u64) -> u64 {
        let ts = match self.blocks.last() {
            Some(last) if *last >= timestamp => last + 1,
            _ => timestamp,
        };
        self.blocks.push(ts);
        (self.blocks.len() - 1) as u64
    }

    pub fn emit(&mut self, address: Address, block_number: u64, tx_hash: Hash32, event: LedgerEvent) -> LogEntry {
        let entry = LogEntry {
            address,
            block_number,
            tx_hash,
            event,
        };
        self.logs.push(entry.clone());
        entry
    }

    pub fn holder(&self, identity: &Identity) -> Option<&ClaimHolder> {
        match identity {
            Identity::Account(address) => self.account_holders.get(address),
            Identity::Contract(id) => self.contract_holders.get(id),
        }
    }

    pub fn register_account_identity(&mut self, account: &Address) -> Result<Address, String> {
        if self.account_identities.contains_key(account) {
            return Err(format!("account {account} already has an identity"));
        }
        let identity = self.fresh_address("identity");
        self.account_identities.insert(*account, identity);
        self.identity_owners.insert(identity, *account);
        self.account_holders.insert(identity, ClaimHolder::new(*account));
        Ok(identity)
    }

    pub fn register_contract_identity(&mut self, owner: &Address, contract: &Address) -> Result<Hash32, String> {
        if self.contract_links.values().any(|c| c == contract) {
            return Err(format!("contract {contract} is already linked"));
        }
        let identity = self.fresh_hash("contract-identity");
        self.contract_links.insert(identity, *contract);
        self.contract_holders.insert(identity, ClaimHolder::new(*owner));
        Ok(identity)
    }

    pub fn put_content(&mut self, bytes: &[u8]) -> Hash32 {
        let hash = sha256(bytes);
        self.content
            .insert(hash, base64::engine::general_purpose::STANDARD.encode(bytes));
        hash
    }

    pub fn get_content(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, String> {
        self.content
            .get(hash)
            .map(|encoded| {
                base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| format!("content {hash} is corrupt: {e}"))
            })
            .transpose()
    }

    /// Apply a relayed call from `executor` to `target`.
    ///
    /// Returns the event the target emits, or the revert reason.
    pub fn apply_call(
        &mut self,
        executor: &Address,
        target: &Address,
        call: CallData,
        block_number: u64,
    ) -> Result<LedgerEvent, String> {
        let (holder_identity, function) = match call {
            CallData::Registry { identity, function } if *target == CLAIM_REGISTRY => {
                (Identity::Contract(identity), function)
            }
            CallData::Identity(function) if self.account_holders.contains_key(target) => {
                (Identity::Account(*target), function)
            }
            _ => return Err(format!("{target} cannot serve this call")),
        };

        let manager = self.manager_of(&holder_identity);
        let caller_holds_parent = |parent: &Hash32, state: &LedgerState| {
            !parent.is_zero()
                && state
                    .account_holders
                    .get(executor)
                    .is_some_and(|h| h.holds_live_claim_on(parent))
        };

        match function {
            ClaimFunction::AddClaim {
                topic,
                scheme,
                issuer,
                signature,
                data,
                uri,
                description,
                expiration,
                disable_subclaims,
            } => {
                if issuer != *executor {
                    return Err(format!("issuer {issuer} is not the caller {executor}"));
                }
                let holder = self.holder_mut(&holder_identity)?;
                holder.nonce += 1;
                let mut seed = issuer.as_bytes().to_vec();
                seed.extend_from_slice(topic.as_bytes());
                seed.extend_from_slice(&holder.nonce.to_be_bytes());
                let claim_id = sha256(&seed);
                holder.claims.push(StoredClaim {
                    id: claim_id,
                    claim: RawClaim {
                        topic,
                        scheme,
                        issuer,
                        signature,
                        data,
                        uri,
                        description,
                    },
                    approved: false,
                    rejected: false,
                    reject_reason: Hash32::ZERO,
                    creation_block: block_number,
                    expiration,
                    disable_subclaims,
                });
                Ok(LedgerEvent::ClaimAdded {
                    claim_id,
                    topic,
                    issuer,
                })
            }
            ClaimFunction::ApproveClaim { claim_id } => {
                if manager? != *executor {
                    return Err(format!("{executor} does not manage {holder_identity}"));
                }
                let stored = self.stored_claim_mut(&holder_identity, &claim_id)?;
                if stored.rejected {
                    return Err(format!("claim {claim_id} is rejected"));
                }
                stored.approved = true;
                Ok(LedgerEvent::ClaimApproved {
                    claim_id,
                    topic: stored.claim.topic,
                })
            }
            ClaimFunction::RejectClaim { claim_id, reason } => {
                let manages = manager.is_ok_and(|m| m == *executor);
                let stored = self.stored_claim_mut(&holder_identity, &claim_id)?;
                if !manages && stored.claim.issuer != *executor {
                    return Err(format!(
                        "{executor} neither manages {holder_identity} nor issued {claim_id}"
                    ));
                }
                if stored.rejected {
                    return Err(format!("claim {claim_id} is already rejected"));
                }
                stored.rejected = true;
                stored.reject_reason = reason;
                Ok(LedgerEvent::ClaimRejected {
                    claim_id,
                    topic: stored.claim.topic,
                })
            }
            ClaimFunction::RemoveClaim {
                claim_id,
                parent_topic,
            } => {
                let allowed = caller_holds_parent(&parent_topic, self);
                let holder = self.holder_mut(&holder_identity)?;
                let position = holder
                    .claims
                    .iter()
                    .position(|c| c.id == claim_id)
                    .ok_or_else(|| format!("claim {claim_id} not found"))?;
                let stored = &holder.claims[position];
                if stored.claim.issuer != *executor && !allowed {
                    return Err(format!("{executor} may not remove claim {claim_id}"));
                }
                let removed = holder.claims.remove(position);
                Ok(LedgerEvent::ClaimRemoved {
                    claim_id,
                    topic: removed.claim.topic,
                })
            }
        }
    }

    /// Identity contract allowed to manage a holder's claims.
    fn manager_of(&self, identity: &Identity) -> Result<Address, String> {
        match identity {
            Identity::Account(address) => {
                if self.account_holders.contains_key(address) {
                    Ok(*address)
                } else {
                    Err(format!("unknown identity {address}"))
                }
            }
            Identity::Contract(id) => {
                let holder = self
                    .contract_holders
                    .get(id)
                    .ok_or_else(|| format!("unknown contract identity {id}"))?;
                self.account_identities
                    .get(&holder.owner)
                    .copied()
                    .ok_or_else(|| format!("owner {} of {id} has no identity", holder.owner))
            }
        }
    }

    fn holder_mut(&mut self, identity: &Identity) -> Result<&mut ClaimHolder, String> {
        let holder = match identity {
            Identity::Account(address) => self.account_holders.get_mut(address),
            Identity::Contract(id) => self.contract_holders.get_mut(id),
        };
        holder.ok_or_else(|| format!("unknown claim holder {identity}"))
    }

    fn stored_claim_mut(&mut self, identity: &Identity, claim_id: &ClaimId) -> Result<&mut StoredClaim, String> {
        self.holder_mut(identity)?
            .claim_mut(claim_id)
            .ok_or_else(|| format!("claim {claim_id} not found"))
    }
}
