//! Replenishment signals and value classification

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::UnknownVariant;

/// Value tier of a product at a location
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbcClass::A => "A",
            AbcClass::B => "B",
            AbcClass::C => "C",
        }
    }
}

impl FromStr for AbcClass {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AbcClass::A),
            "B" => Ok(AbcClass::B),
            "C" => Ok(AbcClass::C),
            other => Err(UnknownVariant::new("ABC class", other)),
        }
    }
}

/// Signal that available stock fell to or below the reorder point.
/// At most one exists per product, location and day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorderAlert {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub current_quantity: i64,
    pub reorder_point: i64,
    pub alert_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// How urgently a recommendation should be acted on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ReplenishmentPriority {
    /// Nothing left to allocate
    OutOfStock,
    /// At or below the minimum stock level
    BelowMinimum,
    /// At or below the reorder point only
    Reorder,
}

/// One line of a reorder recommendation report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorderRecommendation {
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub location_id: Uuid,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub quantity_available: i64,
    pub reorder_point: i64,
    pub reorder_quantity: i64,
    pub lead_time_days: i32,
    pub min_stock_level: i64,
    pub max_stock_level: i64,
    pub avg_daily_consumption: Decimal,
    pub suggested_order_quantity: i64,
    pub priority: ReplenishmentPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorderRecommendationReport {
    pub location_id: Uuid,
    pub recommendations: Vec<ReorderRecommendation>,
    pub total_items: usize,
    pub generated_at: DateTime<Utc>,
}

/// Issued quantity and value of one product over a window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductConsumption {
    pub product_id: Uuid,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

/// Classification of one product in an ABC pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbcClassification {
    pub product_id: Uuid,
    pub total_consumption: i64,
    pub avg_unit_cost: Decimal,
    pub total_value: Decimal,
    /// Share of total value held by the products ranked above this one
    pub preceding_share: Decimal,
    pub classification: AbcClass,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbcSummary {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbcAnalysis {
    pub location_id: Uuid,
    pub analysis_date: NaiveDate,
    pub products: Vec<AbcClassification>,
    pub summary: AbcSummary,
    pub generated_at: DateTime<Utc>,
}
