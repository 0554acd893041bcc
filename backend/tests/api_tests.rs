//! HTTP adapter tests
//!
//! Requests go through the full router over the in-memory store.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::*;
use inventory_ledger_backend::{create_app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn app(fx: Fixture) -> Router {
    create_app(AppState::new(fx.engine))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post(uri: &str, actor: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn receipt_body(product_id: Uuid, location_id: Uuid, quantity: i64) -> Value {
    json!({
        "received_by": Uuid::new_v4(),
        "total_value": "100",
        "items": [{
            "product_id": product_id,
            "location_id": location_id,
            "quantity": quantity,
            "unit_cost": "10",
            "batch_number": "B1"
        }]
    })
}

#[tokio::test]
async fn test_health() {
    let app = app(Fixture::new());
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_receipt_issue_and_status_over_http() {
    let fx = Fixture::new();
    let (p, l, actor) = (fx.product(), fx.location(), fx.actor);
    let app = app(fx);

    let (status, body) = send(
        &app,
        post("/api/v1/inventory/receipts", Some(actor), receipt_body(p, l, 50)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["receipt_number"].as_str().unwrap().starts_with("GR"));

    let issue_body = json!({
        "issued_to": Uuid::new_v4(),
        "total_value": "0",
        "items": [{ "product_id": p, "location_id": l, "quantity": 30 }]
    });
    let (status, _) = send(&app, post("/api/v1/inventory/issues", Some(actor), issue_body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, get(&format!("/api/v1/inventory/status/{p}/{l}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity_on_hand"], 20);
    assert_eq!(body["recent_movements"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        get(&format!("/api/v1/inventory/availability/{p}/{l}?quantity=25")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], false);
    assert_eq!(body["shortage"], 5);
}

#[tokio::test]
async fn test_insufficient_inventory_lists_shortages() {
    let fx = Fixture::new();
    let (p, l, actor) = (fx.product(), fx.location(), fx.actor);
    let app = app(fx);

    let issue_body = json!({
        "issued_to": Uuid::new_v4(),
        "total_value": "0",
        "items": [{ "product_id": p, "location_id": l, "quantity": 3 }]
    });
    let (status, body) = send(&app, post("/api/v1/inventory/issues", Some(actor), issue_body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_INVENTORY");
    assert_eq!(body["error"]["details"][0]["shortage"], 3);
    assert_eq!(body["error"]["details"][0]["available"], 0);
}

#[tokio::test]
async fn test_missing_actor_header_is_rejected() {
    let fx = Fixture::new();
    let (p, l) = (fx.product(), fx.location());
    let app = app(fx);

    let (status, body) = send(&app, post("/api/v1/inventory/receipts", None, receipt_body(p, l, 5))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let mut request = post("/api/v1/inventory/receipts", None, receipt_body(p, l, 5));
    request
        .headers_mut()
        .insert("x-actor-id", "not-a-uuid".parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_errors_are_listed() {
    let fx = Fixture::new();
    let (p, l, actor) = (fx.product(), fx.location(), fx.actor);
    let app = app(fx);

    let (status, body) = send(
        &app,
        post("/api/v1/inventory/receipts", Some(actor), receipt_body(p, l, 0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["error"]["details"].as_array().unwrap();
    assert!(errors.iter().any(|e| e["field"] == "items[0].quantity"));
}

#[tokio::test]
async fn test_oversized_quantity_is_a_bad_request() {
    let fx = Fixture::new();
    let (p, l, actor) = (fx.product(), fx.location(), fx.actor);
    let app = app(fx);

    let (status, body) = send(
        &app,
        post(
            "/api/v1/inventory/receipts",
            Some(actor),
            receipt_body(p, l, i64::MAX / 2 + 1),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"][0]["field"], "items[0].quantity");

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_location_report_is_not_found() {
    let app = app(Fixture::new());
    let (status, body) = send(
        &app,
        get(&format!(
            "/api/v1/inventory/locations/{}/reorder-recommendations",
            Uuid::new_v4()
        )),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
