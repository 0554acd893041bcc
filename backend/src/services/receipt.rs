//! Goods receipt workflow

use chrono::Utc;
use shared::{
    DocumentPrefix, GoodsReceipt, GoodsReceiptItem, MovementType, ReasonCode, ReceiptOutcome,
    ReceiptRequest, ReferenceType, StockKey,
};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::ledger::{append_movement, line_value, NewMovement};
use super::{
    document_date, lock_balances, locked, require_location, require_product, rolled_back,
    validate, InventoryEngine,
};
use crate::error::AppResult;
use crate::store::{LedgerStore, LedgerTx};

impl<S: LedgerStore> InventoryEngine<S> {
    /// Record incoming stock: one receipt document and one `RECEIPT` movement
    /// per item, all in one transaction.
    pub async fn receive_inventory(
        &self,
        request: ReceiptRequest,
        actor_id: Uuid,
    ) -> AppResult<ReceiptOutcome> {
        validate(&request).map_err(|e| rolled_back("goods_receipt", e))?;

        let keys: BTreeSet<StockKey> = request
            .items
            .iter()
            .map(|item| StockKey::new(item.product_id, item.location_id))
            .collect();

        let outcome = self
            .post_receipt(&request, &keys, actor_id)
            .await
            .map_err(|e| rolled_back("goods_receipt", e))?;

        tracing::info!(
            receipt_number = %outcome.receipt_number,
            item_count = request.items.len(),
            performed_by = %actor_id,
            "Goods receipt recorded"
        );

        self.after_commit(&keys).await;
        Ok(outcome)
    }

    async fn post_receipt(
        &self,
        request: &ReceiptRequest,
        keys: &BTreeSet<StockKey>,
        actor_id: Uuid,
    ) -> AppResult<ReceiptOutcome> {
        let mut tx = self.store.begin().await?;

        for key in keys {
            require_product(&mut tx, key.product_id).await?;
            require_location(&mut tx, key.location_id).await?;
        }
        let mut balances = lock_balances(&mut tx, keys).await?;

        let receipt_number = self.next_document_number(DocumentPrefix::GoodsReceipt).await?;
        let receipt_id = Uuid::new_v4();

        let items = request
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let total_cost = line_value(
                    &format!("items[{index}].unit_cost"),
                    item.quantity,
                    item.unit_cost,
                )?;
                Ok(GoodsReceiptItem {
                    id: Uuid::new_v4(),
                    receipt_id,
                    product_id: item.product_id,
                    location_id: item.location_id,
                    quantity_received: item.quantity,
                    unit_cost: item.unit_cost,
                    total_cost,
                    batch_number: item.batch_number.clone(),
                    serial_numbers: item.serial_numbers.clone(),
                    expiry_date: item.expiry_date,
                    bin_location: item.bin_location.clone(),
                    quality_status: item.quality_status,
                    notes: item.notes.clone(),
                })
            })
            .collect::<AppResult<Vec<GoodsReceiptItem>>>()?;

        let receipt = GoodsReceipt {
            id: receipt_id,
            receipt_number: receipt_number.clone(),
            supplier_id: request.supplier_id,
            purchase_order_id: request.purchase_order_id,
            receipt_date: document_date(request.receipt_date),
            received_by: request.received_by,
            total_value: request.total_value,
            notes: request.notes.clone(),
            created_by: actor_id,
            created_at: Utc::now(),
            items,
        };
        tx.insert_receipt(&receipt).await?;

        for item in &receipt.items {
            let balance = locked(&mut balances, &StockKey::new(item.product_id, item.location_id))?;
            append_movement(
                &mut tx,
                balance,
                NewMovement {
                    movement_type: MovementType::Receipt,
                    quantity_change: item.quantity_received,
                    unit_cost: item.unit_cost,
                    reference_type: ReferenceType::GoodsReceipt,
                    reference_id: receipt_id,
                    batch_number: item.batch_number.clone(),
                    serial_numbers: item.serial_numbers.clone(),
                    expiry_date: item.expiry_date,
                    performed_by: actor_id,
                    reason_code: ReasonCode::GoodsReceipt,
                    notes: item.notes.clone(),
                },
            )
            .await?;
        }

        tx.commit().await?;

        Ok(ReceiptOutcome {
            receipt_id,
            receipt_number,
        })
    }
}
