//! Catalog entities owned by external services and read here

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked SKU with its replenishment parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    /// Available quantity at or below which a reorder alert is raised
    pub reorder_point: i64,
    pub reorder_quantity: i64,
    pub min_stock_level: i64,
    pub max_stock_level: i64,
    pub lead_time_days: i32,
    pub is_active: bool,
}

/// A warehouse or bin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}
