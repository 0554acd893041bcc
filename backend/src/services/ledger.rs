//! Movement log primitives
//!
//! Movements are only ever appended. The balance row of a pair is a
//! projection of its movements and active reservations and is rewritten in
//! the same transaction as every movement that changes it.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    InventoryBalance, InventoryMovement, MovementType, ReasonCode, ReferenceType, Shortage,
    StockKey,
};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::InventoryEngine;
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

/// Movement to append for one pair
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub quantity_change: i64,
    pub unit_cost: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub batch_number: Option<String>,
    pub serial_numbers: Vec<String>,
    pub expiry_date: Option<NaiveDate>,
    pub performed_by: Uuid,
    pub reason_code: ReasonCode,
    pub notes: Option<String>,
}

/// Value of `quantity` units at `unit_cost`
pub(crate) fn line_value(field: &str, quantity: i64, unit_cost: Decimal) -> AppResult<Decimal> {
    Decimal::from(quantity)
        .checked_mul(unit_cost)
        .ok_or_else(|| AppError::out_of_range(field))
}

/// Sum of line values
pub(crate) fn sum_values<I>(field: &str, values: I) -> AppResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, value| {
        acc.checked_add(value).ok_or_else(|| AppError::out_of_range(field))
    })
}

/// Total required units per pair; repeated lines for one pair add up
pub(crate) fn required_per_key<I>(lines: I) -> AppResult<BTreeMap<StockKey, i64>>
where
    I: IntoIterator<Item = (StockKey, i64)>,
{
    let mut required: BTreeMap<StockKey, i64> = BTreeMap::new();
    for (index, (key, quantity)) in lines.into_iter().enumerate() {
        let total = required.entry(key).or_default();
        *total = total
            .checked_add(quantity)
            .ok_or_else(|| AppError::out_of_range(&format!("items[{index}].quantity")))?;
    }
    Ok(required)
}

/// Append a movement against a balance row locked by `tx` and write the new
/// aggregate back.
///
/// No movement may take on-hand below zero, and no decrease may take it
/// below the reserved quantity. Issues and outbound transfers report that as
/// a shortage; adjustments as a conflict with the reservations.
pub async fn append_movement<T: LedgerTx>(
    tx: &mut T,
    balance: &mut InventoryBalance,
    entry: NewMovement,
) -> AppResult<InventoryMovement> {
    let before = balance.quantity_on_hand;
    let after = before
        .checked_add(entry.quantity_change)
        .ok_or_else(|| AppError::out_of_range("quantity"))?;
    let required = -entry.quantity_change;

    if after < 0 {
        return Err(AppError::insufficient(Shortage::new(
            balance.product_id,
            balance.location_id,
            before,
            required,
        )));
    }
    if entry.quantity_change < 0 && after < balance.quantity_reserved {
        if !entry.movement_type.respects_reservations() {
            return Err(AppError::reserved_stock(balance.key(), balance.quantity_reserved));
        }
        return Err(AppError::insufficient(Shortage::new(
            balance.product_id,
            balance.location_id,
            balance.quantity_available(),
            required,
        )));
    }
    let total_value = line_value("quantity", entry.quantity_change.abs(), entry.unit_cost)?;

    let now = Utc::now();
    let movement = InventoryMovement {
        id: Uuid::new_v4(),
        product_id: balance.product_id,
        location_id: balance.location_id,
        movement_type: entry.movement_type,
        quantity_change: entry.quantity_change,
        quantity_before: before,
        quantity_after: after,
        unit_cost: entry.unit_cost,
        total_value,
        reference_type: entry.reference_type,
        reference_id: entry.reference_id,
        batch_number: entry.batch_number,
        serial_numbers: entry.serial_numbers,
        expiry_date: entry.expiry_date,
        performed_by: entry.performed_by,
        reason_code: entry.reason_code,
        notes: entry.notes,
        created_at: now,
    };

    tx.insert_movement(&movement).await?;

    balance.quantity_on_hand = after;
    balance.last_movement_at = Some(now);
    balance.updated_at = now;
    tx.save_balance(balance).await?;

    Ok(movement)
}

/// Rebuild a locked balance row from the ledger and overwrite it
pub async fn recompute_locked<T: LedgerTx>(
    tx: &mut T,
    balance: &mut InventoryBalance,
) -> AppResult<()> {
    let totals = tx.ledger_totals(balance.key()).await?;

    if totals.quantity_on_hand != balance.quantity_on_hand
        || totals.quantity_reserved != balance.quantity_reserved
    {
        tracing::warn!(
            product_id = %balance.product_id,
            location_id = %balance.location_id,
            stored_on_hand = balance.quantity_on_hand,
            ledger_on_hand = totals.quantity_on_hand,
            stored_reserved = balance.quantity_reserved,
            ledger_reserved = totals.quantity_reserved,
            "Balance drift repaired from ledger"
        );
    }

    balance.quantity_on_hand = totals.quantity_on_hand;
    balance.quantity_reserved = totals.quantity_reserved;
    balance.last_movement_at = totals.last_movement_at;
    balance.updated_at = Utc::now();
    tx.save_balance(balance).await
}

impl<S: LedgerStore> InventoryEngine<S> {
    /// Current balance of a pair; a pair that never moved reads as zero
    pub async fn get_balance(&self, product_id: Uuid, location_id: Uuid) -> AppResult<InventoryBalance> {
        let key = StockKey::new(product_id, location_id);
        Ok(self
            .store
            .get_balance(key)
            .await?
            .unwrap_or_else(|| InventoryBalance::empty(product_id, location_id)))
    }

    /// Replay the movement log (and active reservations) of a pair into its
    /// balance row
    pub async fn recompute_balance(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<InventoryBalance> {
        let key = StockKey::new(product_id, location_id);

        let mut tx = self.store.begin().await?;
        let mut balance = tx.lock_balance(key).await?;
        recompute_locked(&mut tx, &mut balance).await?;
        tx.commit().await?;

        self.cache.invalidate_all([&key]).await;

        tracing::info!(
            product_id = %product_id,
            location_id = %location_id,
            quantity_on_hand = balance.quantity_on_hand,
            "Balance recomputed"
        );

        Ok(balance)
    }
}
