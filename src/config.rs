use std::time::Duration;

use clap::Parser;

use crate::blockchain::node::DEFAULT_MINING_REWARD;

/// Runtime configuration for a node
///
/// Every option can also be given through the environment, including a
/// `.env` file in the working directory.
#[derive(Debug, Clone, Parser)]
#[command(name = "pow-ledger-node", version, about = "Toy proof-of-work blockchain node")]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Peers to register at startup (repeat or comma separate)
    #[arg(long = "peer", env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Amount credited to this node for each mined block
    #[arg(long, env = "MINING_REWARD", default_value_t = DEFAULT_MINING_REWARD)]
    pub mining_reward: f64,

    /// Give up a mining request after this many seconds, retries included
    #[arg(long, env = "MINE_TIMEOUT_SECS")]
    pub mine_timeout_secs: Option<u64>,

    /// Timeout for fetching a peer's chain during conflict resolution
    #[arg(long, env = "PEER_TIMEOUT_SECS", default_value_t = 5)]
    pub peer_timeout_secs: u64,
}

impl Config {
    pub fn mine_timeout(&self) -> Option<Duration> {
        self.mine_timeout_secs.map(Duration::from_secs)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}
