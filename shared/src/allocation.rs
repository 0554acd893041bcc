//! FIFO batch allocation
//!
//! A batch is every movement of a product at a location that carries the same
//! batch number; its remaining quantity is the signed sum of those movements,
//! so returns and corrections replenish the batch they name. Movements without
//! a batch number form a single unbatched pool. Stock counted short is taken
//! from the batches oldest first, so only count surpluses land in that pool
//! and a batch never keeps units that are no longer on the shelf.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Remaining stock of one batch at one location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub batch_number: Option<String>,
    pub remaining_quantity: i64,
    /// Quantity-weighted cost of the batch's inbound movements
    pub unit_cost: Decimal,
    /// Earliest inbound movement of the batch
    pub batch_date: DateTime<Utc>,
    pub expiry_date: Option<NaiveDate>,
}

/// Quantity taken from one batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchAllocation {
    pub batch_number: Option<String>,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub batch_date: DateTime<Utc>,
    pub expiry_date: Option<NaiveDate>,
}

impl BatchAllocation {
    /// Cost of the allocated units, `None` past the decimal range
    pub fn total_cost(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_cost)
    }
}

/// Batches ran out before the requested quantity was covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("short by {shortage} units (required {required}, allocatable {allocatable})")]
pub struct AllocationShortfall {
    pub required: i64,
    pub allocatable: i64,
    pub shortage: i64,
}

/// Cover `required` units from the oldest batches first.
///
/// Batches are consumed in ascending `batch_date`; equal dates keep the input
/// order. Batches with nothing remaining are skipped. Either the returned
/// allocations sum to exactly `required` or nothing is allocated.
pub fn allocate_fifo(
    batches: &[BatchSummary],
    required: i64,
) -> Result<Vec<BatchAllocation>, AllocationShortfall> {
    let mut ordered: Vec<&BatchSummary> = batches
        .iter()
        .filter(|b| b.remaining_quantity > 0)
        .collect();
    ordered.sort_by_key(|b| b.batch_date);

    let mut allocations = Vec::new();
    let mut remaining = required;

    for batch in ordered {
        if remaining <= 0 {
            break;
        }
        let take = remaining.min(batch.remaining_quantity);
        allocations.push(BatchAllocation {
            batch_number: batch.batch_number.clone(),
            quantity: take,
            unit_cost: batch.unit_cost,
            batch_date: batch.batch_date,
            expiry_date: batch.expiry_date,
        });
        remaining -= take;
    }

    if remaining > 0 {
        return Err(AllocationShortfall {
            required,
            allocatable: required - remaining,
            shortage: remaining,
        });
    }

    Ok(allocations)
}
