use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::crypto::hash_block;
use super::transaction::Transaction;

/// Proof stored in the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// Stand-in `previous_hash` for the genesis block, which has no predecessor
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Position of the block in the chain, starting at 1
    pub index: u64,

    /// Creation time in seconds since the Unix epoch
    pub timestamp: f64,

    /// Transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Proof of work linking this block to its predecessor
    pub proof: u64,

    /// Hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The transactions to include in the block
    /// * `proof` - The proof of work
    /// * `previous_hash` - The hash of the previous block
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: now_secs(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Creates the genesis block
    pub fn genesis() -> Self {
        Block::new(1, Vec::new(), GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Calculates the hash of the block
    pub fn hash(&self) -> String {
        hash_block(self)
    }
}

/// Current time as fractional seconds since the Unix epoch
fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
