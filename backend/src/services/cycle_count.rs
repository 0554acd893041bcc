//! Cycle count reconciliation

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    CycleCount, CycleCountItem, CycleCountOutcome, CycleCountRequest, DocumentPrefix,
    MovementType, ReasonCode, ReferenceType, StockKey,
};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::allocation::allocate;
use super::ledger::{append_movement, line_value, recompute_locked, NewMovement};
use super::{
    document_date, lock_balances, locked, require_location, require_product, rolled_back,
    validate, InventoryEngine,
};
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

impl<S: LedgerStore> InventoryEngine<S> {
    /// Reconcile counted stock at one location against the ledger.
    ///
    /// The system quantity of each item is replayed from the movement log
    /// under lock, and any variance is booked as `ADJUSTMENT` movements. A
    /// count below the reserved quantity is rejected until the reservations
    /// are released.
    pub async fn perform_cycle_count(
        &self,
        request: CycleCountRequest,
        actor_id: Uuid,
    ) -> AppResult<CycleCountOutcome> {
        validate(&request).map_err(|e| rolled_back("cycle_count", e))?;

        let keys: BTreeSet<StockKey> = request
            .items
            .iter()
            .map(|item| StockKey::new(item.product_id, request.location_id))
            .collect();

        let outcome = self
            .post_cycle_count(&request, &keys, actor_id)
            .await
            .map_err(|e| rolled_back("cycle_count", e))?;

        tracing::info!(
            cycle_count_number = %outcome.cycle_count_number,
            location_id = %request.location_id,
            total_variances = outcome.total_variances,
            performed_by = %actor_id,
            "Cycle count recorded"
        );

        self.after_commit(&keys).await;
        Ok(outcome)
    }

    async fn post_cycle_count(
        &self,
        request: &CycleCountRequest,
        keys: &BTreeSet<StockKey>,
        actor_id: Uuid,
    ) -> AppResult<CycleCountOutcome> {
        let mut tx = self.store.begin().await?;

        require_location(&mut tx, request.location_id).await?;
        for key in keys {
            require_product(&mut tx, key.product_id).await?;
        }
        let mut balances = lock_balances(&mut tx, keys).await?;

        let cycle_count_number = self.next_document_number(DocumentPrefix::CycleCount).await?;
        let cycle_count_id = Uuid::new_v4();
        let mut items = Vec::with_capacity(request.items.len());

        for (index, item) in request.items.iter().enumerate() {
            let balance = locked(
                &mut balances,
                &StockKey::new(item.product_id, request.location_id),
            )?;
            recompute_locked(&mut tx, balance).await?;

            if item.counted_quantity < balance.quantity_reserved {
                return Err(AppError::reserved_stock(balance.key(), balance.quantity_reserved));
            }

            let system_quantity = balance.quantity_on_hand;
            let variance = item.counted_quantity - system_quantity;

            // Shrinkage leaves the oldest batches first; a surplus has no
            // known batch and joins the unbatched pool at the counted cost.
            let legs: Vec<(i64, Decimal, Option<String>, Option<NaiveDate>)> = if variance < 0 {
                allocate(&mut tx, balance.key(), -variance)
                    .await?
                    .into_iter()
                    .map(|a| (-a.quantity, a.unit_cost, a.batch_number, a.expiry_date))
                    .collect()
            } else if variance > 0 {
                vec![(variance, item.unit_cost, None, None)]
            } else {
                Vec::new()
            };

            for (quantity_change, unit_cost, batch_number, expiry_date) in legs {
                append_movement(
                    &mut tx,
                    balance,
                    NewMovement {
                        movement_type: MovementType::Adjustment,
                        quantity_change,
                        unit_cost,
                        reference_type: ReferenceType::CycleCount,
                        reference_id: cycle_count_id,
                        batch_number,
                        serial_numbers: Vec::new(),
                        expiry_date,
                        performed_by: actor_id,
                        reason_code: ReasonCode::CycleCountAdjustment,
                        notes: item.notes.clone(),
                    },
                )
                .await?;
            }

            let variance_value = line_value(
                &format!("items[{index}].unit_cost"),
                variance,
                item.unit_cost,
            )?;
            items.push(CycleCountItem {
                id: Uuid::new_v4(),
                cycle_count_id,
                product_id: item.product_id,
                system_quantity,
                counted_quantity: item.counted_quantity,
                variance,
                unit_cost: item.unit_cost,
                variance_value,
                bin_location: item.bin_location.clone(),
                notes: item.notes.clone(),
            });
        }

        let total_variances = items.iter().try_fold(0i64, |acc, i| {
            acc.checked_add(i.variance.abs())
                .ok_or_else(|| AppError::out_of_range("items"))
        })?;

        let count = CycleCount {
            id: cycle_count_id,
            cycle_count_number: cycle_count_number.clone(),
            location_id: request.location_id,
            count_date: document_date(request.count_date),
            counted_by: request.counted_by,
            total_variances,
            notes: request.notes.clone(),
            created_by: actor_id,
            created_at: Utc::now(),
            items,
        };
        tx.insert_cycle_count(&count).await?;

        tx.commit().await?;

        Ok(CycleCountOutcome {
            cycle_count_id,
            cycle_count_number,
            total_variances,
        })
    }
}
