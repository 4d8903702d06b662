// Blockchain module
//
// This module contains the ledger core:
// - Block and transaction structures
// - Block hashing
// - Proof of work algorithm
// - The ledger and its validation rules
// - Peer registry and longest-chain consensus
// - The node that ties them together

pub mod block;
pub mod chain;
pub mod consensus;
pub mod crypto;
pub mod node;
pub mod peers;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use consensus::{HttpChainFetcher, PeerChain};
pub use node::{Node, NodeError};
pub use transaction::Transaction;
