use log::{debug, info};

use super::block::Block;
use super::pow::valid_proof;
use super::transaction::Transaction;

/// Represents the ledger: the chain of blocks and the pool of pending transactions
///
/// The ledger itself does no locking. The owning [`Node`](super::Node) keeps it
/// behind a mutex so that every mutation happens under a single lock.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks
    chain: Vec<Block>,

    /// Transactions waiting to be included in the next block
    pending_transactions: Vec<Transaction>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Creates a new blockchain holding only the genesis block
    pub fn new() -> Self {
        Blockchain {
            chain: vec![Block::genesis()],
            pending_transactions: Vec::new(),
        }
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> &Block {
        // the chain is created with a genesis block and only ever replaced
        // by a longer one, so it is never empty
        &self.chain[self.chain.len() - 1]
    }

    /// Adds a new transaction to the pending transactions
    ///
    /// # Returns
    ///
    /// The index of the next block to be mined. If the pool keeps growing or
    /// the chain is replaced before mining, the transaction may end up in a
    /// different block, so treat the value as an estimate.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> u64 {
        let transaction = Transaction::new(sender, recipient, amount);
        debug!(
            "Queued transaction {} -> {} ({})",
            transaction.sender, transaction.recipient, transaction.amount
        );
        self.pending_transactions.push(transaction);

        self.last_block().index + 1
    }

    /// Creates a new block from all pending transactions and appends it
    ///
    /// The proof is not checked here. Callers are expected to have run the
    /// proof-of-work search; chains coming from peers are checked separately
    /// by [`Blockchain::valid_chain`] before they are adopted.
    ///
    /// # Arguments
    ///
    /// * `proof` - The proof found for the last block
    /// * `previous_hash` - Overrides the hash of the last block when given
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> Block {
        let previous_hash = previous_hash.unwrap_or_else(|| self.last_block().hash());
        let transactions = std::mem::take(&mut self.pending_transactions);

        let block = Block::new(self.chain.len() as u64 + 1, transactions, proof, previous_hash);
        self.chain.push(block.clone());

        info!(
            "Appended block {} with {} transactions",
            block.index,
            block.transactions.len()
        );

        block
    }

    /// Checks that every block links to its predecessor
    ///
    /// For each block after the first, the stored `previous_hash` must equal
    /// the hash of the block before it and its proof must solve the puzzle
    /// set by the previous proof. The first block is taken as is.
    pub fn valid_chain(chain: &[Block]) -> bool {
        for pair in chain.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            if current.previous_hash != previous.hash() {
                debug!("Block {} does not link to its predecessor", current.index);
                return false;
            }

            if !valid_proof(previous.proof, current.proof) {
                debug!("Block {} carries an invalid proof", current.index);
                return false;
            }
        }

        true
    }

    /// Validates the local chain
    pub fn is_valid(&self) -> bool {
        Self::valid_chain(&self.chain)
    }

    /// Replaces the chain with one already checked by [`Blockchain::valid_chain`]
    ///
    /// The pending transactions are kept.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        if chain.is_empty() {
            return;
        }
        self.chain = chain;
    }

    /// Gets the blocks of the chain
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Gets the number of blocks in the chain
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Gets all pending transactions
    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::pow::proof_of_work;

    fn mine(blockchain: &mut Blockchain) -> Block {
        let proof = proof_of_work(blockchain.last_block().proof);
        blockchain.new_block(proof, None)
    }

    #[test]
    fn test_new_blockchain() {
        let blockchain = Blockchain::new();

        assert_eq!(blockchain.len(), 1);
        assert_eq!(blockchain.last_block().index, 1);
        assert_eq!(blockchain.last_block().proof, 100);
        assert_eq!(blockchain.last_block().previous_hash, "1");
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_new_transaction_targets_next_block() {
        let mut blockchain = Blockchain::new();

        assert_eq!(blockchain.new_transaction("A", "B", 5.0), 2);
        assert_eq!(blockchain.new_transaction("B", "C", 1.0), 2);

        assert_eq!(blockchain.len(), 1);
        assert_eq!(blockchain.pending_transactions().len(), 2);
    }

    #[test]
    fn test_mine_first_block() {
        let mut blockchain = Blockchain::new();
        assert_eq!(blockchain.new_transaction("A", "B", 5.0), 2);

        let proof = proof_of_work(100);
        let genesis_hash = blockchain.last_block().hash();
        let block = blockchain.new_block(proof, None);

        assert_eq!(blockchain.len(), 2);
        assert!(blockchain.pending_transactions().is_empty());
        assert_eq!(block.index, 2);
        assert_eq!(block.proof, proof);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(block.transactions, vec![Transaction::new("A", "B", 5.0)]);
        assert_eq!(blockchain.last_block(), &block);
    }

    #[test]
    fn test_new_block_with_explicit_previous_hash() {
        let mut blockchain = Blockchain::new();
        let block = blockchain.new_block(7, Some("custom".to_string()));

        assert_eq!(block.previous_hash, "custom");
        assert!(!blockchain.is_valid());
    }

    #[test]
    fn test_mined_chain_links_and_proves() {
        let mut blockchain = Blockchain::new();
        blockchain.new_transaction("A", "B", 1.0);
        mine(&mut blockchain);
        blockchain.new_transaction("B", "C", 2.0);
        mine(&mut blockchain);

        for pair in blockchain.chain().windows(2) {
            assert_eq!(pair[1].index, pair[0].index + 1);
            assert_eq!(pair[1].previous_hash, pair[0].hash());
            assert!(valid_proof(pair[0].proof, pair[1].proof));
        }
        assert!(blockchain.is_valid());
        assert!(Blockchain::valid_chain(blockchain.chain()));
    }

    #[test]
    fn test_reversed_chain_is_invalid() {
        let mut blockchain = Blockchain::new();
        mine(&mut blockchain);
        mine(&mut blockchain);

        let mut reversed = blockchain.chain().to_vec();
        reversed.reverse();

        assert!(!Blockchain::valid_chain(&reversed));
    }

    #[test]
    fn test_tampered_chain_is_invalid() {
        let mut blockchain = Blockchain::new();
        blockchain.new_transaction("A", "B", 5.0);
        mine(&mut blockchain);
        mine(&mut blockchain);

        let mut tampered = blockchain.chain().to_vec();
        tampered[1].transactions[0].amount = 500.0;
        assert!(!Blockchain::valid_chain(&tampered));

        let mut bad_proof = blockchain.chain().to_vec();
        bad_proof[1].proof += 1;
        // recompute the link so that only the proof check can fail
        bad_proof[2].previous_hash = bad_proof[1].hash();
        assert!(!valid_proof(bad_proof[0].proof, bad_proof[1].proof));
        assert!(!Blockchain::valid_chain(&bad_proof));
    }

    #[test]
    fn test_valid_chain_gives_the_same_answer_twice() {
        let mut blockchain = Blockchain::new();
        blockchain.new_transaction("A", "B", 5.0);
        mine(&mut blockchain);
        mine(&mut blockchain);

        let valid = blockchain.chain().to_vec();
        assert!(Blockchain::valid_chain(&valid));
        assert!(Blockchain::valid_chain(&valid));

        let mut tampered = valid.clone();
        tampered[2].previous_hash = "0".repeat(64);
        assert!(!Blockchain::valid_chain(&tampered));
        assert!(!Blockchain::valid_chain(&tampered));

        // validating must not touch the blocks it inspects
        assert_eq!(blockchain.chain(), valid.as_slice());
    }

    #[test]
    fn test_trivial_chains_are_valid() {
        assert!(Blockchain::valid_chain(&[]));
        assert!(Blockchain::valid_chain(&[Block::genesis()]));
    }

    #[test]
    fn test_replace_chain_keeps_pending_transactions() {
        let mut other = Blockchain::new();
        mine(&mut other);
        mine(&mut other);

        let mut blockchain = Blockchain::new();
        blockchain.new_transaction("A", "B", 5.0);
        blockchain.replace_chain(other.chain().to_vec());

        assert_eq!(blockchain.len(), 3);
        assert_eq!(blockchain.pending_transactions().len(), 1);

        blockchain.replace_chain(Vec::new());
        assert_eq!(blockchain.len(), 3);
    }
}
