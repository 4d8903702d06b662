// API module
//
// HTTP adapter over the node: handlers translate requests into ledger and
// consensus calls and serialize the results

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
