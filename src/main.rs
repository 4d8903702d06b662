use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;

use blockchain::{HttpChainFetcher, Node};
use config::Config;

// Create the node and register the bootstrap peers from the configuration
fn initialize_node(config: &Config) -> Node {
    let fetcher = Arc::new(HttpChainFetcher::new(config.peer_timeout()));
    let node = Node::new(fetcher)
        .with_mining_reward(config.mining_reward)
        .with_mine_timeout(config.mine_timeout());

    info!("Node identifier: {}", node.id());

    for peer in &config.peers {
        if let Err(err) = node.peers().register(peer) {
            warn!("Ignoring bootstrap peer: {}", err);
        }
    }

    if !node.peers().is_empty() {
        info!("Registered {} bootstrap peer(s)", node.peers().len());
    }

    node
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::new_transaction,
        api::handlers::mine,
        api::handlers::get_chain,
        api::handlers::get_pending_transactions,
        api::handlers::validate_chain,
        api::handlers::register_nodes,
        api::handlers::get_nodes,
        api::handlers::resolve_nodes
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::PeerChain,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineResponse,
            api::handlers::RegisterNodesRequest,
            api::handlers::RegisterNodesResponse,
            api::handlers::NodesResponse,
            api::handlers::ResolveResponse
        )
    ),
    tags(
        (name = "blockchain", description = "Proof-of-work ledger node endpoints")
    ),
    info(
        title = "Blockchain Node API",
        version = "1.0.0",
        description = "A toy proof-of-work blockchain node with longest-chain consensus",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing so it can feed the environment fallbacks
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::parse();
    let node = web::Data::new(initialize_node(&config));

    info!("Starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(node.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi())
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("HTTP server terminated with an error")
}
