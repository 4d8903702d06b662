use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sender used for the reward a node pays itself for mining a block
pub const REWARD_SENDER: &str = "0";

/// Represents a transfer recorded on the ledger
///
/// No signature or balance checks are performed; a transaction is accepted
/// as submitted and becomes immutable once it is placed in a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address
    pub sender: String,

    /// Recipient's address
    pub recipient: String,

    /// Amount being transferred
    pub amount: f64,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }
}
