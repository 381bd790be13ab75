//! Ledger value types — addresses, hashes, identities, events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{VerificationError, Result};

macro_rules! hex_newtype {
    ($name:ident, $len:expr, $what:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// The all-zero value, used on the ledger as the "absent" sentinel.
            pub const ZERO: Self = Self([0u8; $len]);

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parse a `0x`-prefixed (or bare) hex string.
            pub fn from_hex(s: &str) -> Result<Self> {
                let raw = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(raw).map_err(|e| {
                    VerificationError::SerializationError(format!("invalid {} hex {s:?}: {e}", $what))
                })?;
                let arr: [u8; $len] = bytes.try_into().map_err(|_| {
                    VerificationError::SerializationError(format!(
                        "{} must be {} bytes: {s:?}",
                        $what, $len
                    ))
                })?;
                Ok(Self(arr))
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = VerificationError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_newtype!(Address, 20, "address");
hex_newtype!(Hash32, 32, "hash");

/// Claim identifiers are ledger-assigned 32-byte values.
pub type ClaimId = Hash32;

impl Address {
    /// Build an address from the last 20 bytes of a 32-byte hash.
    pub fn from_hash(hash: &Hash32) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&hash.0[12..]);
        Self(out)
    }

    /// Left-pad the address into a 32-byte word.
    pub fn to_word(&self) -> Hash32 {
        let mut out = [0u8; 32];
        out[12..].copy_from_slice(&self.0);
        Hash32(out)
    }
}

/// The on-chain handle that holds and relays claims for a subject.
///
/// Resolved once per subject and cached; everything downstream branches on
/// the tag instead of re-probing the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "handle", rename_all = "snake_case")]
pub enum Identity {
    /// A standalone identity contract registered for an account.
    Account(Address),
    /// A 32-byte identity linked to a contract through the claim registry.
    Contract(Hash32),
}

impl Identity {
    /// The 32-byte form used inside signed verification data.
    pub fn as_word(&self) -> Hash32 {
        match self {
            Self::Account(address) => address.to_word(),
            Self::Contract(id) => *id,
        }
    }

    pub fn subject_type(&self) -> SubjectType {
        match self {
            Self::Account(_) => SubjectType::Account,
            Self::Contract(_) => SubjectType::Contract,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(address) => write!(f, "account:{address}"),
            Self::Contract(id) => write!(f, "contract:{id}"),
        }
    }
}

/// What kind of subject an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Account,
    Contract,
}

/// Key purposes on an identity, following the ERC-725 numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPurpose {
    Management,
    Action,
    Claim,
    Encryption,
}

/// Raw claim fields as stored by a claim holder.
///
/// A removed or unknown claim comes back with a zero issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawClaim {
    pub topic: Hash32,
    pub scheme: u64,
    /// Issuer identity contract.
    pub issuer: Address,
    pub signature: Vec<u8>,
    /// Content hash of the payload, zero when absent.
    pub data: Hash32,
    pub uri: String,
    /// Name-registry node of the claim description, zero for the default.
    pub description: Hash32,
}

impl RawClaim {
    pub fn empty() -> Self {
        Self {
            topic: Hash32::ZERO,
            scheme: 0,
            issuer: Address::ZERO,
            signature: Vec::new(),
            data: Hash32::ZERO,
            uri: String::new(),
            description: Hash32::ZERO,
        }
    }
}

/// Events emitted by identities, the claim registry and claim holders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    IdentityCreated {
        account: Address,
        identity: Address,
    },
    ContractIdentityLinked {
        contract: Address,
        identity: Hash32,
    },
    /// Emitted by the executing identity when a relayed call is accepted.
    Approved { execution_id: u64, approved: bool },
    /// The relayed inner call succeeded.
    Executed { execution_id: u64, to: Address },
    /// The relayed inner call reverted.
    ExecutionFailed { execution_id: u64, to: Address },
    ClaimAdded {
        claim_id: ClaimId,
        topic: Hash32,
        issuer: Address,
    },
    ClaimApproved { claim_id: ClaimId, topic: Hash32 },
    ClaimRejected { claim_id: ClaimId, topic: Hash32 },
    ClaimRemoved { claim_id: ClaimId, topic: Hash32 },
}

/// A log entry: an event plus the contract and block that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub block_number: u64,
    pub tx_hash: Hash32,
    pub event: LedgerEvent,
}

/// Block-scoped log query for one emitting contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    /// Logs of `address` in exactly one block.
    pub fn in_block(address: Address, block_number: u64) -> Self {
        Self {
            address,
            from_block: block_number,
            to_block: block_number,
        }
    }
}

/// Receipt of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: Hash32,
    pub block_number: u64,
    pub logs: Vec<LogEntry>,
}
