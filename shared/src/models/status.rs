//! Read models returned to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AbcClass, InventoryMovement};

/// Coarse stock health of a product at a location
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Reorder,
    Low,
    Overstock,
    Normal,
}

/// Balance snapshot plus the latest ledger activity for one pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryStatus {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub quantity_available: i64,
    pub abc_classification: Option<AbcClass>,
    pub last_movement_at: Option<DateTime<Utc>>,
    pub stock_status: StockStatus,
    pub recent_movements: Vec<InventoryMovement>,
}

/// Answer to "can this pair cover the quantity right now"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    pub available_quantity: i64,
    pub required_quantity: i64,
    pub shortage: i64,
    pub on_hand: i64,
    pub reserved: i64,
}
