use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;
use tokio::task::JoinError;
use uuid::Uuid;

use super::block::Block;
use super::chain::Blockchain;
use super::consensus::{resolve_conflicts, ChainFetcher, Resolution};
use super::peers::{parse_address, PeerError, PeerRegistry};
use super::pow::{proof_of_work, proof_of_work_until, Deadline};
use super::transaction::{Transaction, REWARD_SENDER};

/// Reward a node pays itself for every block it mines
pub const DEFAULT_MINING_REWARD: f64 = 1.0;

/// Errors that can occur while operating the node
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Mining was cancelled after {0:?}")]
    MiningCancelled(Duration),

    #[error("Mining task failed: {0}")]
    MiningTask(#[from] JoinError),

    #[error(transparent)]
    Peer(#[from] PeerError),
}

/// A single blockchain node
///
/// Owns the ledger, the peer registry and the node identity. The ledger is
/// guarded by one mutex and every read-modify-write on it happens under a
/// single acquisition.
pub struct Node {
    /// Identifier credited with mining rewards
    id: String,

    ledger: Mutex<Blockchain>,

    peers: PeerRegistry,

    fetcher: Arc<dyn ChainFetcher>,

    mining_reward: f64,

    /// Upper bound for a whole mining request, unbounded if unset
    mine_timeout: Option<Duration>,
}

impl Node {
    /// Creates a node with a fresh identity and a genesis-only chain
    pub fn new(fetcher: Arc<dyn ChainFetcher>) -> Self {
        Node {
            id: Uuid::new_v4().simple().to_string(),
            ledger: Mutex::new(Blockchain::new()),
            peers: PeerRegistry::new(),
            fetcher,
            mining_reward: DEFAULT_MINING_REWARD,
            mine_timeout: None,
        }
    }

    pub fn with_mining_reward(mut self, reward: f64) -> Self {
        self.mining_reward = reward;
        self
    }

    pub fn with_mine_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.mine_timeout = timeout;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    fn ledger(&self) -> MutexGuard<'_, Blockchain> {
        // every mutation completes inside one call, so a panicking holder
        // cannot leave the ledger half updated
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a transaction for the next block
    ///
    /// # Returns
    ///
    /// The index of the block expected to include the transaction
    pub fn submit_transaction(&self, sender: &str, recipient: &str, amount: f64) -> u64 {
        self.ledger().new_transaction(sender, recipient, amount)
    }

    /// Mines a new block holding every pending transaction plus the reward
    ///
    /// The proof-of-work search runs on the blocking thread pool so request
    /// handlers keep running. If the chain moves on while searching (another
    /// block was mined or the chain was replaced) the proof no longer fits
    /// and the search starts over against the new last block. The mining
    /// timeout is one deadline for the whole call, retries included.
    pub async fn mine(&self) -> Result<Block, NodeError> {
        let deadline = self.mine_timeout.and_then(Deadline::after);

        loop {
            let (last_proof, last_hash) = {
                let ledger = self.ledger();
                let last_block = ledger.last_block();
                (last_block.proof, last_block.hash())
            };

            let found = tokio::task::spawn_blocking(move || match deadline {
                Some(deadline) => proof_of_work_until(last_proof, deadline),
                None => Some(proof_of_work(last_proof)),
            })
            .await?;

            let proof = match found {
                Some(proof) => proof,
                None => {
                    let timeout = self.mine_timeout.unwrap_or_default();
                    warn!("Gave up mining after {:?}", timeout);
                    return Err(NodeError::MiningCancelled(timeout));
                }
            };

            let mut ledger = self.ledger();
            if ledger.last_block().hash() != last_hash {
                info!("Chain moved on while mining, searching again");
                continue;
            }

            ledger.new_transaction(REWARD_SENDER, self.id.as_str(), self.mining_reward);
            return Ok(ledger.new_block(proof, None));
        }
    }

    /// Gets a copy of the chain
    pub fn chain(&self) -> Vec<Block> {
        self.ledger().chain().to_vec()
    }

    /// Gets a copy of the pending transactions
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.ledger().pending_transactions().to_vec()
    }

    /// Validates the local chain
    pub fn is_valid(&self) -> bool {
        self.ledger().is_valid()
    }

    /// Registers a batch of peers
    ///
    /// Every address is checked before any is registered, so a batch with
    /// one bad address leaves the registry untouched.
    ///
    /// # Returns
    ///
    /// All known peers after registration
    pub fn register_peers<S: AsRef<str>>(&self, addresses: &[S]) -> Result<Vec<String>, NodeError> {
        for address in addresses {
            parse_address(address.as_ref())?;
        }
        for address in addresses {
            self.peers.register(address.as_ref())?;
        }
        Ok(self.peers.peers())
    }

    /// Runs the consensus algorithm against all known peers
    ///
    /// # Returns
    ///
    /// The outcome of the round, carrying the chain the node ended up with
    pub async fn resolve_conflicts(&self) -> Resolution {
        resolve_conflicts(&self.ledger, &self.peers, self.fetcher.as_ref()).await
    }
}
