use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::block::Block;
use super::chain::Blockchain;
use super::peers::PeerRegistry;

/// Errors that can occur while fetching a peer's chain
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {peer} failed: {reason}")]
    Request { peer: String, reason: String },

    #[error("Peer {peer} answered with status {status}")]
    Status { peer: String, status: u16 },

    #[error("Peer {peer} sent an unreadable chain: {reason}")]
    Decode { peer: String, reason: String },

    #[error("Peer {peer} reported length {reported} but sent {actual} blocks")]
    LengthMismatch {
        peer: String,
        reported: usize,
        actual: usize,
    },
}

/// A peer's view of the chain, as served by its `/chain` endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PeerChain {
    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// The length of the chain as reported by the peer
    pub length: usize,
}

impl PeerChain {
    pub fn new(chain: Vec<Block>) -> Self {
        PeerChain {
            length: chain.len(),
            chain,
        }
    }
}

/// Source of peer chains used during conflict resolution
///
/// Failures are returned as values so that a single bad peer never aborts
/// a resolution round.
#[async_trait(?Send)]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<PeerChain, FetchError>;
}

/// Fetches chains over HTTP from `http://{peer}/chain`
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    timeout: Duration,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Self {
        HttpChainFetcher { timeout }
    }
}

#[async_trait(?Send)]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<PeerChain, FetchError> {
        let client = awc::Client::builder().timeout(self.timeout).finish();

        let mut response = client
            .get(format!("http://{peer}/chain"))
            .send()
            .await
            .map_err(|e| FetchError::Request {
                peer: peer.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                peer: peer.to_string(),
                status: response.status().as_u16(),
            });
        }

        // a long chain easily exceeds awc's default 2 MiB body limit
        let peer_chain: PeerChain = response
            .json()
            .limit(64 * 1024 * 1024)
            .await
            .map_err(|e| FetchError::Decode {
                peer: peer.to_string(),
                reason: e.to_string(),
            })?;

        if peer_chain.length != peer_chain.chain.len() {
            return Err(FetchError::LengthMismatch {
                peer: peer.to_string(),
                reported: peer_chain.length,
                actual: peer_chain.chain.len(),
            });
        }

        Ok(peer_chain)
    }
}

/// Outcome of a conflict resolution round
///
/// Both variants carry the chain as it stood when the round released the
/// ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The local chain was replaced by a longer peer chain
    Replaced(Vec<Block>),

    /// The local chain stays authoritative
    Kept(Vec<Block>),
}

/// Replaces the local chain with the longest valid chain among the peers
///
/// Every registered peer is asked for its chain concurrently. Unreachable
/// peers and chains failing [`Blockchain::valid_chain`] are skipped. A peer's
/// chain wins only if it is strictly longer than the local chain and than
/// every other surviving candidate, so equal-length forks keep the local
/// chain. Chains are compared by length alone, not by accumulated work.
///
/// # Returns
///
/// Whether the local chain was replaced, together with a copy of the chain
/// taken before the ledger is unlocked
pub async fn resolve_conflicts(
    ledger: &Mutex<Blockchain>,
    peers: &PeerRegistry,
    fetcher: &dyn ChainFetcher,
) -> Resolution {
    let neighbours = peers.peers();
    let responses = join_all(neighbours.iter().map(|peer| fetcher.fetch_chain(peer))).await;

    let candidates: Vec<(&String, PeerChain)> = neighbours
        .iter()
        .zip(responses)
        .filter_map(|(peer, response)| match response {
            Ok(peer_chain) if Blockchain::valid_chain(&peer_chain.chain) => Some((peer, peer_chain)),
            Ok(_) => {
                warn!("Discarding invalid chain from peer {}", peer);
                None
            }
            Err(err) => {
                warn!("Skipping peer {}: {}", peer, err);
                None
            }
        })
        .collect();

    let mut ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);

    let mut max_length = ledger.len();
    let mut new_chain = None;
    for (peer, peer_chain) in candidates {
        if peer_chain.length > max_length {
            max_length = peer_chain.length;
            new_chain = Some((peer, peer_chain.chain));
        }
    }

    match new_chain {
        Some((peer, chain)) => {
            info!(
                "Replacing local chain of {} blocks with {} blocks from {}",
                ledger.len(),
                chain.len(),
                peer
            );
            ledger.replace_chain(chain);
            Resolution::Replaced(ledger.chain().to_vec())
        }
        None => Resolution::Kept(ledger.chain().to_vec()),
    }
}
