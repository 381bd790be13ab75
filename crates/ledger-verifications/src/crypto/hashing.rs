//! SHA-256 hashing for topics, verification data and registry names.

use sha2::{Digest, Sha256};

use crate::ledger::{Hash32, Identity};

/// SHA-256 of arbitrary bytes.
pub fn sha256(bytes: &[u8]) -> Hash32 {
    Hash32(Sha256::digest(bytes).into())
}

/// Hash of a topic path as stored on the ledger.
pub fn topic_hash(topic: &str) -> Hash32 {
    sha256(topic.as_bytes())
}

/// The data an issuer signs: `(subject identity, topic hash, payload hash)`
/// packed as three 32-byte words.
pub fn verification_data_hash(subject: &Identity, topic: &Hash32, payload: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_word().as_bytes());
    hasher.update(topic.as_bytes());
    hasher.update(payload.as_bytes());
    Hash32(hasher.finalize().into())
}

/// Recursive name hash of a dotted name, rightmost label first.
///
/// The empty name hashes to the zero node.
pub fn name_hash(name: &str) -> Hash32 {
    let mut node = Hash32::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = sha256(label.as_bytes());
        let mut hasher = Sha256::new();
        hasher.update(node.as_bytes());
        hasher.update(label_hash.as_bytes());
        node = Hash32(hasher.finalize().into());
    }
    node
}
