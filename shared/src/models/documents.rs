//! Workflow documents: receipts, issues, transfers and cycle counts
//!
//! Each document is written once inside the transaction that posts its
//! movements and is never edited afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::UnknownVariant;

/// Condition of received goods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    #[default]
    Good,
    Damaged,
    Expired,
}

impl QualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityStatus::Good => "good",
            QualityStatus::Damaged => "damaged",
            QualityStatus::Expired => "expired",
        }
    }
}

impl FromStr for QualityStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(QualityStatus::Good),
            "damaged" => Ok(QualityStatus::Damaged),
            "expired" => Ok(QualityStatus::Expired),
            other => Err(UnknownVariant::new("quality status", other)),
        }
    }
}

/// Incoming stock event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoodsReceipt {
    pub id: Uuid,
    pub receipt_number: String,
    pub supplier_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    pub receipt_date: NaiveDate,
    pub received_by: Uuid,
    pub total_value: Decimal,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<GoodsReceiptItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoodsReceiptItem {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity_received: i64,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub batch_number: Option<String>,
    pub serial_numbers: Vec<String>,
    pub expiry_date: Option<NaiveDate>,
    pub bin_location: Option<String>,
    pub quality_status: QualityStatus,
    pub notes: Option<String>,
}

/// Outgoing stock event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoodsIssue {
    pub id: Uuid,
    pub issue_number: String,
    pub order_id: Option<Uuid>,
    pub department: Option<String>,
    pub issued_to: Uuid,
    pub issue_date: NaiveDate,
    pub total_value: Decimal,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<GoodsIssueItem>,
}

/// One batch allocation of an issued line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoodsIssueItem {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity_issued: i64,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub batch_number: Option<String>,
    pub notes: Option<String>,
}

/// Move of stock between two locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryTransfer {
    pub id: Uuid,
    pub transfer_number: String,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub transfer_date: NaiveDate,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<InventoryTransferItem>,
}

/// One batch allocation of a transferred line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryTransferItem {
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub batch_number: Option<String>,
    pub to_bin_location: Option<String>,
    pub notes: Option<String>,
}

/// Physical count of a location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleCount {
    pub id: Uuid,
    pub cycle_count_number: String,
    pub location_id: Uuid,
    pub count_date: NaiveDate,
    pub counted_by: Uuid,
    /// Sum of absolute item variances
    pub total_variances: i64,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CycleCountItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleCountItem {
    pub id: Uuid,
    pub cycle_count_id: Uuid,
    pub product_id: Uuid,
    pub system_quantity: i64,
    pub counted_quantity: i64,
    pub variance: i64,
    pub unit_cost: Decimal,
    pub variance_value: Decimal,
    pub bin_location: Option<String>,
    pub notes: Option<String>,
}

/// Result of a committed receipt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptOutcome {
    pub receipt_id: Uuid,
    pub receipt_number: String,
}

/// Result of a committed issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueOutcome {
    pub issue_id: Uuid,
    pub issue_number: String,
    /// Cost of the allocated batches
    pub allocated_value: Decimal,
}

/// Result of a committed transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferOutcome {
    pub transfer_id: Uuid,
    pub transfer_number: String,
}

/// Result of a committed cycle count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleCountOutcome {
    pub cycle_count_id: Uuid,
    pub cycle_count_number: String,
    pub total_variances: i64,
}
