//! HTTP handlers for inventory ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{
    AbcAnalysis, Availability, CycleCountOutcome, CycleCountRequest, InventoryStatus,
    IssueOutcome, IssueRequest, ReceiptOutcome, ReceiptRequest, ReorderAlert,
    ReorderRecommendationReport, Reservation, ReservationRequest, TransferOutcome,
    TransferRequest,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::Actor;
use crate::store::LedgerStore;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct AbcQuery {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderCheckRequest {
    pub product_ids: Vec<Uuid>,
}

// ============================================================================
// Workflows
// ============================================================================

/// Record a goods receipt
pub async fn receive_inventory<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Actor(actor_id): Actor,
    Json(request): Json<ReceiptRequest>,
) -> AppResult<(StatusCode, Json<ReceiptOutcome>)> {
    let outcome = state.engine.receive_inventory(request, actor_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Record a goods issue
pub async fn issue_inventory<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Actor(actor_id): Actor,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<IssueOutcome>)> {
    let outcome = state.engine.issue_inventory(request, actor_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Record a transfer between two locations
pub async fn transfer_inventory<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Actor(actor_id): Actor,
    Json(request): Json<TransferRequest>,
) -> AppResult<(StatusCode, Json<TransferOutcome>)> {
    let outcome = state.engine.transfer_inventory(request, actor_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Record a cycle count and book its variances
pub async fn perform_cycle_count<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Actor(actor_id): Actor,
    Json(request): Json<CycleCountRequest>,
) -> AppResult<(StatusCode, Json<CycleCountOutcome>)> {
    let outcome = state.engine.perform_cycle_count(request, actor_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn reserve_inventory<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Actor(actor_id): Actor,
    Json(request): Json<ReservationRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state.engine.reserve_inventory(request, actor_id).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn release_reservation<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Actor(actor_id): Actor,
    Path(reservation_id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    let reservation = state
        .engine
        .release_reservation(reservation_id, actor_id)
        .await?;
    Ok(Json(reservation))
}

// ============================================================================
// Reads
// ============================================================================

pub async fn get_inventory_status<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((product_id, location_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<InventoryStatus>> {
    let status = state
        .engine
        .get_inventory_status(product_id, location_id)
        .await?;
    Ok(Json(status))
}

pub async fn check_availability<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((product_id, location_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Availability>> {
    let availability = state
        .engine
        .check_availability(product_id, location_id, query.quantity)
        .await?;
    Ok(Json(availability))
}

// ============================================================================
// Replenishment
// ============================================================================

pub async fn get_reorder_recommendations<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(location_id): Path<Uuid>,
) -> AppResult<Json<ReorderRecommendationReport>> {
    let report = state
        .engine
        .generate_reorder_recommendations(location_id)
        .await?;
    Ok(Json(report))
}

/// Run ABC classification; `as_of` defaults to today
pub async fn perform_abc_analysis<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(location_id): Path<Uuid>,
    Query(query): Query<AbcQuery>,
) -> AppResult<Json<AbcAnalysis>> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let analysis = state.engine.perform_abc_analysis(location_id, as_of).await?;
    Ok(Json(analysis))
}

/// Run reorder checks on demand; returns the alerts created by this call
pub async fn check_reorder_points<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<ReorderCheckRequest>,
) -> AppResult<Json<Vec<ReorderAlert>>> {
    let alerts = state
        .engine
        .check_reorder_points(&request.product_ids)
        .await?;
    Ok(Json(alerts))
}
