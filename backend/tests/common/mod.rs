//! Fixtures shared by the engine integration tests

#![allow(dead_code)]

use rust_decimal::Decimal;
use shared::{
    CycleCountItemRequest, CycleCountRequest, IssueItemRequest, IssueRequest, Location, Product,
    QualityStatus, ReceiptItemRequest, ReceiptRequest, TransferItemRequest, TransferRequest,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use inventory_ledger_backend::cache::{BalanceCache, InMemoryCache};
use inventory_ledger_backend::config::LedgerSettings;
use inventory_ledger_backend::store::MemoryStore;
use inventory_ledger_backend::InventoryEngine;

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub engine: InventoryEngine<MemoryStore>,
    pub actor: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_cache(BalanceCache::new(
            Arc::new(InMemoryCache::new()),
            Duration::from_secs(300),
        ))
    }

    pub fn with_cache(cache: BalanceCache) -> Self {
        let store = Arc::new(MemoryStore::default());
        let engine = InventoryEngine::new(store.clone(), cache, LedgerSettings::default());
        Self {
            store,
            engine,
            actor: Uuid::new_v4(),
        }
    }

    /// Active product with reorder point 10, reorder quantity 50, min 5
    pub fn product(&self) -> Uuid {
        self.product_with(10, 50, 5, 7)
    }

    pub fn product_with(
        &self,
        reorder_point: i64,
        reorder_quantity: i64,
        min_stock_level: i64,
        lead_time_days: i32,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_product(Product {
            id,
            sku: format!("SKU-{}", &id.simple().to_string()[..8]),
            name: "Widget".to_string(),
            reorder_point,
            reorder_quantity,
            min_stock_level,
            max_stock_level: 1000,
            lead_time_days,
            is_active: true,
        });
        id
    }

    pub fn location(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_location(Location {
            id,
            code: format!("WH-{}", &id.simple().to_string()[..6]),
            name: "Warehouse".to_string(),
        });
        id
    }

    pub async fn receive(&self, product_id: Uuid, location_id: Uuid, quantity: i64, cost: i64, batch: &str) {
        self.engine
            .receive_inventory(
                receipt(product_id, location_id, quantity, cost, Some(batch)),
                self.actor,
            )
            .await
            .expect("receipt should succeed");
    }

    pub async fn on_hand(&self, product_id: Uuid, location_id: Uuid) -> i64 {
        self.engine
            .get_balance(product_id, location_id)
            .await
            .expect("balance read")
            .quantity_on_hand
    }
}

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

pub fn receipt_item(
    product_id: Uuid,
    location_id: Uuid,
    quantity: i64,
    cost: i64,
    batch: Option<&str>,
) -> ReceiptItemRequest {
    ReceiptItemRequest {
        product_id,
        location_id,
        quantity,
        unit_cost: dec(cost),
        batch_number: batch.map(str::to_string),
        serial_numbers: vec![],
        expiry_date: None,
        bin_location: None,
        quality_status: QualityStatus::Good,
        notes: None,
    }
}

pub fn receipt(
    product_id: Uuid,
    location_id: Uuid,
    quantity: i64,
    cost: i64,
    batch: Option<&str>,
) -> ReceiptRequest {
    ReceiptRequest {
        supplier_id: None,
        purchase_order_id: None,
        receipt_date: None,
        received_by: Uuid::new_v4(),
        total_value: dec(quantity * cost),
        notes: None,
        items: vec![receipt_item(product_id, location_id, quantity, cost, batch)],
    }
}

pub fn issue(lines: &[(Uuid, Uuid, i64)]) -> IssueRequest {
    IssueRequest {
        order_id: None,
        department: Some("Assembly".to_string()),
        issued_to: Uuid::new_v4(),
        issue_date: None,
        total_value: Decimal::ZERO,
        notes: None,
        items: lines
            .iter()
            .map(|&(product_id, location_id, quantity)| IssueItemRequest {
                product_id,
                location_id,
                quantity,
                notes: None,
            })
            .collect(),
    }
}

pub fn transfer(from: Uuid, to: Uuid, product_id: Uuid, quantity: i64) -> TransferRequest {
    TransferRequest {
        from_location_id: from,
        to_location_id: to,
        transfer_date: None,
        requested_by: Uuid::new_v4(),
        approved_by: None,
        notes: None,
        items: vec![TransferItemRequest {
            product_id,
            quantity,
            to_bin_location: Some("B-01".to_string()),
            notes: None,
        }],
    }
}

pub fn cycle_count(location_id: Uuid, product_id: Uuid, counted: i64, cost: i64) -> CycleCountRequest {
    CycleCountRequest {
        location_id,
        counted_by: Uuid::new_v4(),
        count_date: None,
        notes: None,
        items: vec![CycleCountItemRequest {
            product_id,
            counted_quantity: counted,
            unit_cost: dec(cost),
            bin_location: None,
            notes: None,
        }],
    }
}
