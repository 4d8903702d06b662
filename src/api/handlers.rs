use actix_web::{web, HttpResponse, Responder};
use log::{error, info};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::consensus::Resolution;
use crate::blockchain::{Block, Node, NodeError, PeerChain, Transaction};

/// Data structure for the node state
pub type NodeData = web::Data<Node>;

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender: Option<String>,

    /// The recipient's address
    pub recipient: Option<String>,

    /// The amount to transfer
    pub amount: Option<f64>,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The index of the block expected to include this transaction
    pub block_index: u64,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The index of the new block
    pub index: u64,

    /// The transactions included in the new block
    pub transactions: Vec<Transaction>,

    /// The proof of work of the new block
    pub proof: u64,

    /// The hash of the block before it
    pub previous_hash: String,
}

/// Request for the node registration endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesRequest {
    /// Peer addresses, either URLs or `host:port`
    pub nodes: Option<Vec<String>>,
}

/// Response for the node registration endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesResponse {
    /// The message
    pub message: String,

    /// Every peer known after registration
    pub total_nodes: Vec<String>,
}

/// Response for the node listing endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NodesResponse {
    /// The known peers
    pub nodes: Vec<String>,

    /// The number of known peers
    pub total: usize,
}

/// Response for the conflict resolution endpoint
///
/// Carries `new_chain` when the local chain was replaced and `chain`
/// when it stayed authoritative.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    /// The message
    pub message: String,

    /// The adopted chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_chain: Option<Vec<Block>>,

    /// The unchanged local chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Vec<Block>>,
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": message.into()
    }))
}

/// Create a new transaction
///
/// Adds a new transaction to the pending transactions
#[utoipa::path(
    post,
    path = "/transaction/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction queued", body = TransactionResponse),
        (status = 400, description = "Missing values")
    )
)]
pub async fn new_transaction(
    node: NodeData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let TransactionRequest {
        sender,
        recipient,
        amount,
    } = transaction_req.into_inner();

    let (Some(sender), Some(recipient), Some(amount)) = (sender, recipient, amount) else {
        return bad_request("Missing values: sender, recipient and amount are required");
    };

    let block_index = node.submit_transaction(&sender, &recipient, amount);

    HttpResponse::Created().json(TransactionResponse {
        message: format!("Transaction will be added to Block {}", block_index),
        block_index,
    })
}

/// Mine a new block
///
/// Runs the proof of work and forges a block from all pending transactions
/// plus the mining reward
#[utoipa::path(
    get,
    path = "/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 503, description = "Mining timed out"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine(node: NodeData) -> impl Responder {
    match node.mine().await {
        Ok(block) => {
            info!("Forged block {} with proof {}", block.index, block.proof);

            HttpResponse::Ok().json(MineResponse {
                message: "New Block Forged".to_string(),
                index: block.index,
                transactions: block.transactions,
                proof: block.proof,
                previous_hash: block.previous_hash,
            })
        }
        Err(err @ NodeError::MiningCancelled(_)) => {
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": err.to_string()
            }))
        }
        Err(err) => {
            error!("Failed to mine block: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to mine block: {}", err)
            }))
        }
    }
}

/// Get the full blockchain
///
/// Peers read this endpoint during conflict resolution
#[utoipa::path(
    get,
    path = "/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = PeerChain)
    )
)]
pub async fn get_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(PeerChain::new(node.chain()))
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.pending_transactions())
}

/// Check if the blockchain is valid
#[utoipa::path(
    get,
    path = "/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool)
    )
)]
pub async fn validate_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.is_valid())
}

/// Register peers
///
/// Adds peers to reconcile the chain with. Addresses are reduced to
/// `host:port`, so the same peer given twice is stored once.
#[utoipa::path(
    post,
    path = "/nodes/register",
    request_body = RegisterNodesRequest,
    responses(
        (status = 201, description = "Peers registered", body = RegisterNodesResponse),
        (status = 400, description = "Missing or invalid list of nodes")
    )
)]
pub async fn register_nodes(
    node: NodeData,
    register_req: web::Json<RegisterNodesRequest>,
) -> impl Responder {
    let nodes = match register_req.into_inner().nodes {
        Some(nodes) if !nodes.is_empty() => nodes,
        _ => return bad_request("Please supply a valid list of nodes"),
    };

    match node.register_peers(nodes.as_slice()) {
        Ok(total_nodes) => HttpResponse::Created().json(RegisterNodesResponse {
            message: "New nodes have been added".to_string(),
            total_nodes,
        }),
        Err(err) => bad_request(err.to_string()),
    }
}

/// List known peers
#[utoipa::path(
    get,
    path = "/nodes",
    responses(
        (status = 200, description = "Known peers", body = NodesResponse)
    )
)]
pub async fn get_nodes(node: NodeData) -> impl Responder {
    let nodes = node.peers().peers();

    HttpResponse::Ok().json(NodesResponse {
        total: nodes.len(),
        nodes,
    })
}

/// Resolve conflicts
///
/// Replaces the local chain with the longest valid chain held by a peer
#[utoipa::path(
    get,
    path = "/nodes/resolve",
    responses(
        (status = 200, description = "Consensus round finished", body = ResolveResponse)
    )
)]
pub async fn resolve_nodes(node: NodeData) -> impl Responder {
    let response = match node.resolve_conflicts().await {
        Resolution::Replaced(chain) => ResolveResponse {
            message: "Our chain was replaced".to_string(),
            new_chain: Some(chain),
            chain: None,
        },
        Resolution::Kept(chain) => ResolveResponse {
            message: "Our chain is authoritative".to_string(),
            new_chain: None,
            chain: Some(chain),
        },
    };

    HttpResponse::Ok().json(response)
}
