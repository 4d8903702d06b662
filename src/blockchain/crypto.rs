use serde_json::Value;
use sha2::{Digest, Sha256};

use super::block::Block;

/// Computes the SHA-256 digest of `data` as a lowercase hexadecimal string
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Renders a JSON value in canonical form
///
/// Object keys come out sorted at every nesting level (serde_json's default
/// map is ordered by key) and no whitespace is emitted, so two structurally
/// equal values always produce the same text.
pub fn canonical_json(value: &Value) -> String {
    value.to_string()
}

/// Calculates the hash of a block
///
/// The block is converted to a JSON object, rendered canonically and hashed
/// with SHA-256. Any node given the same block content computes the same
/// hash, which is what lets peers check each other's chains.
pub fn hash_block(block: &Block) -> String {
    let block_data = serde_json::json!({
        "index": block.index,
        "timestamp": block.timestamp,
        "transactions": block.transactions,
        "proof": block.proof,
        "previous_hash": block.previous_hash,
    });

    sha256_hex(canonical_json(&block_data))
}
