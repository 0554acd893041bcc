//! Goods issue workflow

use chrono::Utc;
use shared::{
    DocumentPrefix, GoodsIssue, GoodsIssueItem, IssueOutcome, IssueRequest, MovementType,
    ReasonCode, ReferenceType, StockKey,
};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::allocation::{allocate, preflight};
use super::ledger::{append_movement, required_per_key, sum_values, NewMovement};
use super::{
    document_date, lock_balances, locked, require_location, require_product, rolled_back,
    validate, InventoryEngine,
};
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

impl<S: LedgerStore> InventoryEngine<S> {
    /// Issue stock oldest batch first.
    ///
    /// Balances are locked before availability is checked, and either every
    /// item is allocated or nothing is written.
    pub async fn issue_inventory(
        &self,
        request: IssueRequest,
        actor_id: Uuid,
    ) -> AppResult<IssueOutcome> {
        validate(&request).map_err(|e| rolled_back("goods_issue", e))?;

        let required = required_per_key(
            request
                .items
                .iter()
                .map(|item| (StockKey::new(item.product_id, item.location_id), item.quantity)),
        )
        .map_err(|e| rolled_back("goods_issue", e))?;
        let keys: BTreeSet<StockKey> = required.keys().copied().collect();

        let outcome = self
            .post_issue(&request, &required, &keys, actor_id)
            .await
            .map_err(|e| rolled_back("goods_issue", e))?;

        tracing::info!(
            issue_number = %outcome.issue_number,
            item_count = request.items.len(),
            allocated_value = %outcome.allocated_value,
            performed_by = %actor_id,
            "Goods issue recorded"
        );

        self.after_commit(&keys).await;
        Ok(outcome)
    }

    async fn post_issue(
        &self,
        request: &IssueRequest,
        required: &BTreeMap<StockKey, i64>,
        keys: &BTreeSet<StockKey>,
        actor_id: Uuid,
    ) -> AppResult<IssueOutcome> {
        let mut tx = self.store.begin().await?;

        for key in keys {
            require_product(&mut tx, key.product_id).await?;
            require_location(&mut tx, key.location_id).await?;
        }
        let mut balances = lock_balances(&mut tx, keys).await?;
        preflight(required, &balances)?;

        let issue_number = self.next_document_number(DocumentPrefix::GoodsIssue).await?;
        let issue_id = Uuid::new_v4();
        let mut items = Vec::new();

        for item in &request.items {
            let key = StockKey::new(item.product_id, item.location_id);
            let allocations = allocate(&mut tx, key, item.quantity).await?;
            let balance = locked(&mut balances, &key)?;

            for allocation in allocations {
                append_movement(
                    &mut tx,
                    balance,
                    NewMovement {
                        movement_type: MovementType::Issue,
                        quantity_change: -allocation.quantity,
                        unit_cost: allocation.unit_cost,
                        reference_type: ReferenceType::GoodsIssue,
                        reference_id: issue_id,
                        batch_number: allocation.batch_number.clone(),
                        serial_numbers: Vec::new(),
                        expiry_date: allocation.expiry_date,
                        performed_by: actor_id,
                        reason_code: ReasonCode::GoodsIssue,
                        notes: item.notes.clone(),
                    },
                )
                .await?;

                items.push(GoodsIssueItem {
                    id: Uuid::new_v4(),
                    issue_id,
                    product_id: item.product_id,
                    location_id: item.location_id,
                    quantity_issued: allocation.quantity,
                    unit_cost: allocation.unit_cost,
                    total_cost: allocation
                        .total_cost()
                        .ok_or_else(|| AppError::out_of_range("quantity"))?,
                    batch_number: allocation.batch_number,
                    notes: item.notes.clone(),
                });
            }
        }

        let allocated_value = sum_values("total_value", items.iter().map(|i| i.total_cost))?;

        let issue = GoodsIssue {
            id: issue_id,
            issue_number: issue_number.clone(),
            order_id: request.order_id,
            department: request.department.clone(),
            issued_to: request.issued_to,
            issue_date: document_date(request.issue_date),
            total_value: request.total_value,
            notes: request.notes.clone(),
            created_by: actor_id,
            created_at: Utc::now(),
            items,
        };
        tx.insert_issue(&issue).await?;

        tx.commit().await?;

        Ok(IssueOutcome {
            issue_id,
            issue_number,
            allocated_value,
        })
    }
}
