//! Ledger entries and the balance projection derived from them

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::AbcClass;
use crate::types::{StockKey, UnknownVariant};

/// Kind of stock movement recorded in the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Receipt,
    Issue,
    Transfer,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Receipt => "RECEIPT",
            MovementType::Issue => "ISSUE",
            MovementType::Transfer => "TRANSFER",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Outbound movements of these kinds consume available stock and may
    /// not eat into reserved quantity.
    pub fn respects_reservations(&self) -> bool {
        matches!(self, MovementType::Issue | MovementType::Transfer)
    }
}

impl FromStr for MovementType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIPT" => Ok(MovementType::Receipt),
            "ISSUE" => Ok(MovementType::Issue),
            "TRANSFER" => Ok(MovementType::Transfer),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            other => Err(UnknownVariant::new("movement type", other)),
        }
    }
}

/// Why a movement was posted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    GoodsReceipt,
    GoodsIssue,
    TransferOut,
    TransferIn,
    CycleCountAdjustment,
    Adjustment,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::GoodsReceipt => "GOODS_RECEIPT",
            ReasonCode::GoodsIssue => "GOODS_ISSUE",
            ReasonCode::TransferOut => "TRANSFER_OUT",
            ReasonCode::TransferIn => "TRANSFER_IN",
            ReasonCode::CycleCountAdjustment => "CYCLE_COUNT_ADJUSTMENT",
            ReasonCode::Adjustment => "ADJUSTMENT",
        }
    }
}

impl FromStr for ReasonCode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GOODS_RECEIPT" => Ok(ReasonCode::GoodsReceipt),
            "GOODS_ISSUE" => Ok(ReasonCode::GoodsIssue),
            "TRANSFER_OUT" => Ok(ReasonCode::TransferOut),
            "TRANSFER_IN" => Ok(ReasonCode::TransferIn),
            "CYCLE_COUNT_ADJUSTMENT" => Ok(ReasonCode::CycleCountAdjustment),
            "ADJUSTMENT" => Ok(ReasonCode::Adjustment),
            other => Err(UnknownVariant::new("reason code", other)),
        }
    }
}

/// Document a movement belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    GoodsReceipt,
    GoodsIssue,
    InventoryTransfer,
    CycleCount,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::GoodsReceipt => "goods_receipt",
            ReferenceType::GoodsIssue => "goods_issue",
            ReferenceType::InventoryTransfer => "inventory_transfer",
            ReferenceType::CycleCount => "cycle_count",
        }
    }
}

impl FromStr for ReferenceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goods_receipt" => Ok(ReferenceType::GoodsReceipt),
            "goods_issue" => Ok(ReferenceType::GoodsIssue),
            "inventory_transfer" => Ok(ReferenceType::InventoryTransfer),
            "cycle_count" => Ok(ReferenceType::CycleCount),
            other => Err(UnknownVariant::new("reference type", other)),
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub movement_type: MovementType,
    /// Signed change: positive adds stock, negative removes it
    pub quantity_change: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub unit_cost: Decimal,
    pub total_value: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub batch_number: Option<String>,
    pub serial_numbers: Vec<String>,
    pub expiry_date: Option<NaiveDate>,
    pub performed_by: Uuid,
    pub reason_code: ReasonCode,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id, self.location_id)
    }
}

/// Current aggregate for one product at one location.
///
/// This is a projection of the movement ledger: `quantity_on_hand` always
/// equals the signed sum of the pair's movements and `quantity_reserved` the
/// sum of its active reservations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryBalance {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub abc_classification: Option<AbcClass>,
    pub last_movement_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryBalance {
    /// Zero balance for a pair that has never moved
    pub fn empty(product_id: Uuid, location_id: Uuid) -> Self {
        Self {
            product_id,
            location_id,
            quantity_on_hand: 0,
            quantity_reserved: 0,
            abc_classification: None,
            last_movement_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id, self.location_id)
    }

    /// On-hand quantity not promised to a reservation
    pub fn quantity_available(&self) -> i64 {
        self.quantity_on_hand - self.quantity_reserved
    }
}

/// Lifecycle of a stock reservation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    Released,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "active",
            ReservationStatus::Released => "released",
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ReservationStatus::Active),
            "released" => Ok(ReservationStatus::Released),
            other => Err(UnknownVariant::new("reservation status", other)),
        }
    }
}

/// Quantity held back from availability for a downstream order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub status: ReservationStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

/// One product/location that cannot cover a requested quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shortage {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub available: i64,
    pub required: i64,
    pub shortage: i64,
}

impl Shortage {
    pub fn new(product_id: Uuid, location_id: Uuid, available: i64, required: i64) -> Self {
        Self {
            product_id,
            location_id,
            available,
            required,
            shortage: required - available.max(0),
        }
    }
}
