//! Route definitions for the inventory ledger API

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, store::LedgerStore, AppState};

/// Create API routes
pub fn api_routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(handlers::health_check::<S>))
        .nest("/inventory", inventory_routes::<S>())
}

/// Inventory ledger routes; every mutation requires the actor header
fn inventory_routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        // Workflows
        .route("/receipts", post(handlers::receive_inventory::<S>))
        .route("/issues", post(handlers::issue_inventory::<S>))
        .route("/transfers", post(handlers::transfer_inventory::<S>))
        .route("/cycle-counts", post(handlers::perform_cycle_count::<S>))
        // Reservations
        .route("/reservations", post(handlers::reserve_inventory::<S>))
        .route(
            "/reservations/:reservation_id",
            delete(handlers::release_reservation::<S>),
        )
        // Reads
        .route(
            "/status/:product_id/:location_id",
            get(handlers::get_inventory_status::<S>),
        )
        .route(
            "/availability/:product_id/:location_id",
            get(handlers::check_availability::<S>),
        )
        // Replenishment
        .route(
            "/locations/:location_id/reorder-recommendations",
            get(handlers::get_reorder_recommendations::<S>),
        )
        .route(
            "/locations/:location_id/abc-analysis",
            post(handlers::perform_abc_analysis::<S>),
        )
        .route("/reorder-checks", post(handlers::check_reorder_points::<S>))
}
