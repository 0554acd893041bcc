//! Ledger persistence seam
//!
//! [`LedgerStore`] is the durable state: movements, balances, documents,
//! reservations, alerts and document counters. Mutating workflows run inside
//! a [`LedgerTx`]; dropping a transaction without committing discards every
//! write made through it.
//!
//! Locking contract: [`LedgerTx::lock_balance`] materialises the balance row
//! if it does not exist and holds an exclusive lock on it until the
//! transaction ends. Callers lock pairs in ascending [`StockKey`] order.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    AbcClass, BatchSummary, CycleCount, DocumentPrefix, GoodsIssue, GoodsReceipt,
    InventoryBalance, InventoryMovement, InventoryTransfer, Location, Product, ProductConsumption,
    ReorderAlert, Reservation, StockKey,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Aggregates recomputed from the movement log and reservations of one pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerTotals {
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub last_movement_at: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Cheap round-trip used by the health endpoint
    async fn ping(&self) -> AppResult<()>;

    /// Open a read-committed transaction with a bounded lock wait
    async fn begin(&self) -> AppResult<Self::Tx>;

    /// Atomically take the next counter value for `prefix` on `date`.
    ///
    /// Runs outside any workflow transaction; a value is never handed out
    /// twice even if the workflow that took it rolls back.
    async fn next_document_sequence(&self, prefix: DocumentPrefix, date: NaiveDate)
        -> AppResult<u32>;

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>>;

    async fn find_products(&self, product_ids: &[Uuid]) -> AppResult<Vec<Product>>;

    async fn find_location(&self, location_id: Uuid) -> AppResult<Option<Location>>;

    async fn get_balance(&self, key: StockKey) -> AppResult<Option<InventoryBalance>>;

    /// Every balance row of the given products, across all locations
    async fn balances_for_products(&self, product_ids: &[Uuid])
        -> AppResult<Vec<InventoryBalance>>;

    async fn balances_at_location(&self, location_id: Uuid) -> AppResult<Vec<InventoryBalance>>;

    /// Newest first
    async fn recent_movements(&self, key: StockKey, limit: u32)
        -> AppResult<Vec<InventoryMovement>>;

    /// Whole history of a pair, oldest first
    async fn movements_for(&self, key: StockKey) -> AppResult<Vec<InventoryMovement>>;

    /// Units and value issued per product at a location in `[since, until)`
    async fn issued_quantities(
        &self,
        location_id: Uuid,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<ProductConsumption>>;

    /// Returns false when an alert for the same product, location and day
    /// already exists
    async fn insert_reorder_alert(&self, alert: &ReorderAlert) -> AppResult<bool>;

    async fn reorder_alerts(&self, alert_date: NaiveDate) -> AppResult<Vec<ReorderAlert>>;

    async fn save_abc_classifications(
        &self,
        location_id: Uuid,
        classes: &[(Uuid, AbcClass)],
    ) -> AppResult<()>;
}

#[async_trait::async_trait]
pub trait LedgerTx: Send {
    async fn find_product(&mut self, product_id: Uuid) -> AppResult<Option<Product>>;

    async fn find_location(&mut self, location_id: Uuid) -> AppResult<Option<Location>>;

    /// Materialise and exclusively lock the balance row of `key`
    async fn lock_balance(&mut self, key: StockKey) -> AppResult<InventoryBalance>;

    async fn save_balance(&mut self, balance: &InventoryBalance) -> AppResult<()>;

    /// Batches of the pair with positive remaining quantity, oldest first
    async fn batches(&mut self, key: StockKey) -> AppResult<Vec<BatchSummary>>;

    async fn ledger_totals(&mut self, key: StockKey) -> AppResult<LedgerTotals>;

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> AppResult<()>;

    async fn insert_receipt(&mut self, receipt: &GoodsReceipt) -> AppResult<()>;

    async fn insert_issue(&mut self, issue: &GoodsIssue) -> AppResult<()>;

    async fn insert_transfer(&mut self, transfer: &InventoryTransfer) -> AppResult<()>;

    async fn insert_cycle_count(&mut self, count: &CycleCount) -> AppResult<()>;

    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()>;

    async fn find_reservation_for_update(&mut self, reservation_id: Uuid)
        -> AppResult<Option<Reservation>>;

    async fn update_reservation(&mut self, reservation: &Reservation) -> AppResult<()>;

    async fn commit(self) -> AppResult<()>;
}
