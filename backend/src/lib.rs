//! Inventory Ledger & Allocation Engine
//!
//! An append-only movement ledger with derived balances, FIFO batch
//! allocation and replenishment analytics, served over HTTP.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use services::InventoryEngine;

use store::LedgerStore;

/// Application state shared across handlers
pub struct AppState<S> {
    pub engine: Arc<InventoryEngine<S>>,
}

impl<S> AppState<S> {
    pub fn new(engine: InventoryEngine<S>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app<S: LedgerStore>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check::<S>))
        .nest("/api/v1", routes::api_routes::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> &'static str {
    "Inventory Ledger API v1"
}
