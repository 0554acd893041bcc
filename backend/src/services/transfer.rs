//! Inter-location transfer workflow

use chrono::Utc;
use shared::{
    DocumentPrefix, InventoryTransfer, InventoryTransferItem, MovementType, ReasonCode,
    ReferenceType, StockKey, TransferOutcome, TransferRequest,
};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::allocation::{allocate, preflight};
use super::ledger::{append_movement, recompute_locked, required_per_key, NewMovement};
use super::{
    document_date, lock_balances, locked, require_location, require_product, rolled_back,
    validate, InventoryEngine,
};
use crate::error::AppResult;
use crate::store::{LedgerStore, LedgerTx};

impl<S: LedgerStore> InventoryEngine<S> {
    /// Move stock between two locations.
    ///
    /// Every allocated batch produces a `TRANSFER_OUT` movement at the source
    /// and a matching `TRANSFER_IN` at the destination carrying the same
    /// quantity, cost, batch and expiry.
    pub async fn transfer_inventory(
        &self,
        request: TransferRequest,
        actor_id: Uuid,
    ) -> AppResult<TransferOutcome> {
        validate(&request).map_err(|e| rolled_back("inventory_transfer", e))?;

        let required = required_per_key(request.items.iter().map(|item| {
            (StockKey::new(item.product_id, request.from_location_id), item.quantity)
        }))
        .map_err(|e| rolled_back("inventory_transfer", e))?;
        let keys: BTreeSet<StockKey> = request
            .items
            .iter()
            .flat_map(|item| {
                [
                    StockKey::new(item.product_id, request.from_location_id),
                    StockKey::new(item.product_id, request.to_location_id),
                ]
            })
            .collect();

        let outcome = self
            .post_transfer(&request, &required, &keys, actor_id)
            .await
            .map_err(|e| rolled_back("inventory_transfer", e))?;

        tracing::info!(
            transfer_number = %outcome.transfer_number,
            from_location_id = %request.from_location_id,
            to_location_id = %request.to_location_id,
            item_count = request.items.len(),
            performed_by = %actor_id,
            "Inventory transfer recorded"
        );

        self.after_commit(&keys).await;
        Ok(outcome)
    }

    async fn post_transfer(
        &self,
        request: &TransferRequest,
        required: &BTreeMap<StockKey, i64>,
        keys: &BTreeSet<StockKey>,
        actor_id: Uuid,
    ) -> AppResult<TransferOutcome> {
        let mut tx = self.store.begin().await?;

        require_location(&mut tx, request.from_location_id).await?;
        require_location(&mut tx, request.to_location_id).await?;
        for product_id in required.keys().map(|k| k.product_id) {
            require_product(&mut tx, product_id).await?;
        }

        let mut balances = lock_balances(&mut tx, keys).await?;
        preflight(required, &balances)?;

        let transfer_number = self.next_document_number(DocumentPrefix::Transfer).await?;
        let transfer_id = Uuid::new_v4();
        let mut items = Vec::new();

        for item in &request.items {
            let from = StockKey::new(item.product_id, request.from_location_id);
            let to = StockKey::new(item.product_id, request.to_location_id);
            let allocations = allocate(&mut tx, from, item.quantity).await?;

            for allocation in allocations {
                let leg = |quantity_change: i64, reason_code: ReasonCode| NewMovement {
                    movement_type: MovementType::Transfer,
                    quantity_change,
                    unit_cost: allocation.unit_cost,
                    reference_type: ReferenceType::InventoryTransfer,
                    reference_id: transfer_id,
                    batch_number: allocation.batch_number.clone(),
                    serial_numbers: Vec::new(),
                    expiry_date: allocation.expiry_date,
                    performed_by: actor_id,
                    reason_code,
                    notes: item.notes.clone(),
                };

                append_movement(
                    &mut tx,
                    locked(&mut balances, &from)?,
                    leg(-allocation.quantity, ReasonCode::TransferOut),
                )
                .await?;
                append_movement(
                    &mut tx,
                    locked(&mut balances, &to)?,
                    leg(allocation.quantity, ReasonCode::TransferIn),
                )
                .await?;

                items.push(InventoryTransferItem {
                    id: Uuid::new_v4(),
                    transfer_id,
                    product_id: item.product_id,
                    quantity: allocation.quantity,
                    unit_cost: allocation.unit_cost,
                    batch_number: allocation.batch_number,
                    to_bin_location: item.to_bin_location.clone(),
                    notes: item.notes.clone(),
                });
            }
        }

        // Both sides are rebuilt from the ledger before the transfer commits
        for balance in balances.values_mut() {
            recompute_locked(&mut tx, balance).await?;
        }

        let transfer = InventoryTransfer {
            id: transfer_id,
            transfer_number: transfer_number.clone(),
            from_location_id: request.from_location_id,
            to_location_id: request.to_location_id,
            transfer_date: document_date(request.transfer_date),
            requested_by: request.requested_by,
            approved_by: request.approved_by,
            notes: request.notes.clone(),
            created_by: actor_id,
            created_at: Utc::now(),
            items,
        };
        tx.insert_transfer(&transfer).await?;

        tx.commit().await?;

        Ok(TransferOutcome {
            transfer_id,
            transfer_number,
        })
    }
}
