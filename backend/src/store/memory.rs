//! In-process ledger store
//!
//! Holds committed state behind a read/write lock. Writers are serialised by
//! a single async mutex acquired with a bounded wait; each transaction works
//! on a private copy of the state that replaces the committed one on commit.
//! Readers always see the last committed snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    AbcClass, BatchSummary, CycleCount, DocumentPrefix, GoodsIssue, GoodsReceipt,
    InventoryBalance, InventoryMovement, InventoryTransfer, Location, MovementType, Product,
    ProductConsumption, ReorderAlert, Reservation, ReservationStatus, StockKey,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::{LedgerStore, LedgerTotals, LedgerTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct State {
    products: HashMap<Uuid, Product>,
    locations: HashMap<Uuid, Location>,
    balances: HashMap<StockKey, InventoryBalance>,
    movements: Vec<InventoryMovement>,
    receipts: Vec<GoodsReceipt>,
    issues: Vec<GoodsIssue>,
    transfers: Vec<InventoryTransfer>,
    cycle_counts: Vec<CycleCount>,
    reservations: HashMap<Uuid, Reservation>,
    alerts: Vec<ReorderAlert>,
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    writer: Arc<tokio::sync::Mutex<()>>,
    sequences: Arc<Mutex<HashMap<(DocumentPrefix, NaiveDate), u32>>>,
    lock_wait: Duration,
}

pub struct MemoryTx {
    working: State,
    committed: Arc<RwLock<State>>,
    _writer: OwnedMutexGuard<()>,
}

impl MemoryStore {
    pub fn new(lock_wait: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            writer: Arc::new(tokio::sync::Mutex::new(())),
            sequences: Arc::new(Mutex::new(HashMap::new())),
            lock_wait,
        }
    }

    // Catalog rows are owned by another service; these seed them.

    pub fn insert_product(&self, product: Product) {
        self.write().products.insert(product.id, product);
    }

    pub fn insert_location(&self, location: Location) {
        self.write().locations.insert(location.id, location);
    }

    pub fn receipts(&self) -> Vec<GoodsReceipt> {
        self.read().receipts.clone()
    }

    pub fn issues(&self) -> Vec<GoodsIssue> {
        self.read().issues.clone()
    }

    pub fn transfers(&self) -> Vec<InventoryTransfer> {
        self.read().transfers.clone()
    }

    pub fn cycle_counts(&self) -> Vec<CycleCount> {
        self.read().cycle_counts.clone()
    }

    pub fn movement_count(&self) -> usize {
        self.read().movements.len()
    }

    /// Overwrite a balance row directly, bypassing the ledger
    pub fn corrupt_balance(&self, balance: InventoryBalance) {
        self.write().balances.insert(balance.key(), balance);
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    async fn acquire_writer(&self) -> AppResult<OwnedMutexGuard<()>> {
        tokio::time::timeout(self.lock_wait, self.writer.clone().lock_owned())
            .await
            .map_err(|_| AppError::busy("inventory_balances"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Group a pair's movements into batches with positive remaining quantity.
///
/// Named batches date from their earliest inbound movement of the product at
/// any location, so stock moved by a transfer keeps its age. The unbatched
/// pool only looks at the pair's own movements.
fn summarize_batches(movements: &[InventoryMovement], key: StockKey) -> Vec<BatchSummary> {
    struct Group {
        first_index: usize,
        first_at: DateTime<Utc>,
        remaining: i64,
    }

    let mut groups: Vec<(Option<String>, Group)> = Vec::new();
    for (index, m) in movements.iter().enumerate() {
        if m.key() != key {
            continue;
        }
        match groups.iter_mut().find(|(batch, _)| *batch == m.batch_number) {
            Some((_, group)) => group.remaining += m.quantity_change,
            None => groups.push((
                m.batch_number.clone(),
                Group {
                    first_index: index,
                    first_at: m.created_at,
                    remaining: m.quantity_change,
                },
            )),
        }
    }

    let mut batches: Vec<(usize, BatchSummary)> = groups
        .into_iter()
        .filter(|(_, group)| group.remaining > 0)
        .map(|(batch_number, group)| {
            let inbound: Vec<&InventoryMovement> = movements
                .iter()
                .filter(|m| {
                    m.product_id == key.product_id
                        && m.quantity_change > 0
                        && m.batch_number == batch_number
                        && (batch_number.is_some() || m.location_id == key.location_id)
                })
                .collect();

            let inbound_qty: i64 = inbound.iter().map(|m| m.quantity_change).sum();
            let inbound_cost: Decimal = inbound
                .iter()
                .map(|m| Decimal::from(m.quantity_change) * m.unit_cost)
                .sum();
            let unit_cost = if inbound_qty > 0 {
                (inbound_cost / Decimal::from(inbound_qty)).round_dp(6)
            } else {
                Decimal::ZERO
            };

            let summary = BatchSummary {
                batch_number,
                remaining_quantity: group.remaining,
                unit_cost,
                batch_date: inbound
                    .iter()
                    .map(|m| m.created_at)
                    .min()
                    .unwrap_or(group.first_at),
                expiry_date: inbound.iter().filter_map(|m| m.expiry_date).min(),
            };
            (group.first_index, summary)
        })
        .collect();

    batches.sort_by(|(ia, a), (ib, b)| a.batch_date.cmp(&b.batch_date).then(ia.cmp(ib)));
    batches.into_iter().map(|(_, b)| b).collect()
}

#[async_trait::async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn begin(&self) -> AppResult<MemoryTx> {
        let guard = self.acquire_writer().await?;
        let working = self.read().clone();
        Ok(MemoryTx {
            working,
            committed: self.state.clone(),
            _writer: guard,
        })
    }

    async fn next_document_sequence(
        &self,
        prefix: DocumentPrefix,
        date: NaiveDate,
    ) -> AppResult<u32> {
        let mut sequences = self.sequences.lock().unwrap_or_else(|e| e.into_inner());
        let counter = sequences.entry((prefix, date)).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.read().products.get(&product_id).cloned())
    }

    async fn find_products(&self, product_ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let state = self.read();
        Ok(product_ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn find_location(&self, location_id: Uuid) -> AppResult<Option<Location>> {
        Ok(self.read().locations.get(&location_id).cloned())
    }

    async fn get_balance(&self, key: StockKey) -> AppResult<Option<InventoryBalance>> {
        Ok(self.read().balances.get(&key).cloned())
    }

    async fn balances_for_products(
        &self,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<InventoryBalance>> {
        let state = self.read();
        let mut balances: Vec<InventoryBalance> = state
            .balances
            .values()
            .filter(|b| product_ids.contains(&b.product_id))
            .cloned()
            .collect();
        balances.sort_by_key(|b| b.key());
        Ok(balances)
    }

    async fn balances_at_location(&self, location_id: Uuid) -> AppResult<Vec<InventoryBalance>> {
        let state = self.read();
        let mut balances: Vec<InventoryBalance> = state
            .balances
            .values()
            .filter(|b| b.location_id == location_id)
            .cloned()
            .collect();
        balances.sort_by_key(|b| b.key());
        Ok(balances)
    }

    async fn recent_movements(
        &self,
        key: StockKey,
        limit: u32,
    ) -> AppResult<Vec<InventoryMovement>> {
        let state = self.read();
        Ok(state
            .movements
            .iter()
            .rev()
            .filter(|m| m.key() == key)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn movements_for(&self, key: StockKey) -> AppResult<Vec<InventoryMovement>> {
        let state = self.read();
        Ok(state
            .movements
            .iter()
            .filter(|m| m.key() == key)
            .cloned()
            .collect())
    }

    async fn issued_quantities(
        &self,
        location_id: Uuid,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<ProductConsumption>> {
        let state = self.read();
        let mut totals: HashMap<Uuid, ProductConsumption> = HashMap::new();
        for m in state.movements.iter().filter(|m| {
            m.location_id == location_id
                && m.movement_type == MovementType::Issue
                && m.created_at >= since
                && m.created_at < until
        }) {
            let entry = totals.entry(m.product_id).or_insert(ProductConsumption {
                product_id: m.product_id,
                total_quantity: 0,
                total_value: Decimal::ZERO,
            });
            let quantity = m.quantity_change.abs();
            entry.total_quantity += quantity;
            entry.total_value += Decimal::from(quantity) * m.unit_cost;
        }
        let mut consumption: Vec<ProductConsumption> = totals.into_values().collect();
        consumption.sort_by_key(|c| c.product_id);
        Ok(consumption)
    }

    async fn insert_reorder_alert(&self, alert: &ReorderAlert) -> AppResult<bool> {
        let _writer = self.acquire_writer().await?;
        let mut state = self.write();
        let exists = state.alerts.iter().any(|a| {
            a.product_id == alert.product_id
                && a.location_id == alert.location_id
                && a.alert_date == alert.alert_date
        });
        if exists {
            return Ok(false);
        }
        state.alerts.push(alert.clone());
        Ok(true)
    }

    async fn reorder_alerts(&self, alert_date: NaiveDate) -> AppResult<Vec<ReorderAlert>> {
        Ok(self
            .read()
            .alerts
            .iter()
            .filter(|a| a.alert_date == alert_date)
            .cloned()
            .collect())
    }

    async fn save_abc_classifications(
        &self,
        location_id: Uuid,
        classes: &[(Uuid, AbcClass)],
    ) -> AppResult<()> {
        let _writer = self.acquire_writer().await?;
        let mut state = self.write();
        let now = Utc::now();
        for (product_id, class) in classes {
            let key = StockKey::new(*product_id, location_id);
            let balance = state
                .balances
                .entry(key)
                .or_insert_with(|| InventoryBalance::empty(*product_id, location_id));
            balance.abc_classification = Some(*class);
            balance.updated_at = now;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LedgerTx for MemoryTx {
    async fn find_product(&mut self, product_id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.working.products.get(&product_id).cloned())
    }

    async fn find_location(&mut self, location_id: Uuid) -> AppResult<Option<Location>> {
        Ok(self.working.locations.get(&location_id).cloned())
    }

    async fn lock_balance(&mut self, key: StockKey) -> AppResult<InventoryBalance> {
        // The whole store is already held by this transaction
        Ok(self
            .working
            .balances
            .entry(key)
            .or_insert_with(|| InventoryBalance::empty(key.product_id, key.location_id))
            .clone())
    }

    async fn save_balance(&mut self, balance: &InventoryBalance) -> AppResult<()> {
        self.working.balances.insert(balance.key(), balance.clone());
        Ok(())
    }

    async fn batches(&mut self, key: StockKey) -> AppResult<Vec<BatchSummary>> {
        Ok(summarize_batches(&self.working.movements, key))
    }

    async fn ledger_totals(&mut self, key: StockKey) -> AppResult<LedgerTotals> {
        let mut totals = LedgerTotals {
            quantity_on_hand: 0,
            quantity_reserved: 0,
            last_movement_at: None,
        };
        for m in self.working.movements.iter().filter(|m| m.key() == key) {
            totals.quantity_on_hand += m.quantity_change;
            totals.last_movement_at = totals.last_movement_at.max(Some(m.created_at));
        }
        totals.quantity_reserved = self
            .working
            .reservations
            .values()
            .filter(|r| {
                r.product_id == key.product_id
                    && r.location_id == key.location_id
                    && r.status == ReservationStatus::Active
            })
            .map(|r| r.quantity)
            .sum();
        Ok(totals)
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> AppResult<()> {
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn insert_receipt(&mut self, receipt: &GoodsReceipt) -> AppResult<()> {
        self.working.receipts.push(receipt.clone());
        Ok(())
    }

    async fn insert_issue(&mut self, issue: &GoodsIssue) -> AppResult<()> {
        self.working.issues.push(issue.clone());
        Ok(())
    }

    async fn insert_transfer(&mut self, transfer: &InventoryTransfer) -> AppResult<()> {
        self.working.transfers.push(transfer.clone());
        Ok(())
    }

    async fn insert_cycle_count(&mut self, count: &CycleCount) -> AppResult<()> {
        self.working.cycle_counts.push(count.clone());
        Ok(())
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        self.working
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn find_reservation_for_update(
        &mut self,
        reservation_id: Uuid,
    ) -> AppResult<Option<Reservation>> {
        Ok(self.working.reservations.get(&reservation_id).cloned())
    }

    async fn update_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        self.working
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        let mut committed = self.committed.write().unwrap_or_else(|e| e.into_inner());
        *committed = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use shared::{ReasonCode, ReferenceType};

    fn movement(
        key: StockKey,
        change: i64,
        cost: i64,
        batch: Option<&str>,
        at: DateTime<Utc>,
    ) -> InventoryMovement {
        InventoryMovement {
            id: Uuid::new_v4(),
            product_id: key.product_id,
            location_id: key.location_id,
            movement_type: if change > 0 {
                MovementType::Receipt
            } else {
                MovementType::Issue
            },
            quantity_change: change,
            quantity_before: 0,
            quantity_after: 0,
            unit_cost: Decimal::from(cost),
            total_value: Decimal::from(change.abs() * cost),
            reference_type: ReferenceType::GoodsReceipt,
            reference_id: Uuid::new_v4(),
            batch_number: batch.map(str::to_string),
            serial_numbers: vec![],
            expiry_date: None,
            performed_by: Uuid::nil(),
            reason_code: ReasonCode::GoodsReceipt,
            notes: None,
            created_at: at,
        }
    }

    #[test]
    fn test_batches_net_out_and_order_by_age() {
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4());
        let t0 = Utc::now();
        let movements = vec![
            movement(key, 5, 12, Some("LATE"), t0 + ChronoDuration::days(2)),
            movement(key, 5, 10, Some("EARLY"), t0),
            movement(key, -5, 10, Some("EARLY"), t0 + ChronoDuration::days(3)),
            movement(key, 4, 8, Some("MID"), t0 + ChronoDuration::days(1)),
        ];

        let batches = summarize_batches(&movements, key);
        let names: Vec<_> = batches.iter().map(|b| b.batch_number.as_deref()).collect();
        assert_eq!(names, vec![Some("MID"), Some("LATE")]);
        assert_eq!(batches[0].remaining_quantity, 4);
        assert_eq!(batches[0].unit_cost, Decimal::from(8));
    }

    #[test]
    fn test_batch_cost_is_weighted_over_inbound() {
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4());
        let t0 = Utc::now();
        let movements = vec![
            movement(key, 10, 10, Some("B1"), t0),
            movement(key, 30, 14, Some("B1"), t0 + ChronoDuration::hours(1)),
        ];
        let batches = summarize_batches(&movements, key);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].remaining_quantity, 40);
        assert_eq!(batches[0].unit_cost, Decimal::from(13));
        assert_eq!(batches[0].batch_date, t0);
    }

    #[test]
    fn test_transferred_batch_keeps_its_age() {
        let product = Uuid::new_v4();
        let origin = StockKey::new(product, Uuid::new_v4());
        let dest = StockKey::new(product, Uuid::new_v4());
        let t0 = Utc::now();
        let movements = vec![
            movement(origin, 10, 10, Some("OLD"), t0),
            movement(dest, 5, 11, Some("NEW"), t0 + ChronoDuration::days(1)),
            movement(origin, -10, 10, Some("OLD"), t0 + ChronoDuration::days(2)),
            movement(dest, 10, 10, Some("OLD"), t0 + ChronoDuration::days(2)),
        ];
        let batches = summarize_batches(&movements, dest);
        assert_eq!(batches[0].batch_number.as_deref(), Some("OLD"));
        assert_eq!(batches[0].batch_date, t0);
        assert!(summarize_batches(&movements, origin).is_empty());
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let store = MemoryStore::default();
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4());
        {
            let mut tx = store.begin().await.unwrap();
            let mut balance = tx.lock_balance(key).await.unwrap();
            balance.quantity_on_hand = 7;
            tx.save_balance(&balance).await.unwrap();
        }
        assert!(store.get_balance(key).await.unwrap().is_none());

        let mut tx = store.begin().await.unwrap();
        let mut balance = tx.lock_balance(key).await.unwrap();
        balance.quantity_on_hand = 7;
        tx.save_balance(&balance).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.get_balance(key).await.unwrap().unwrap().quantity_on_hand, 7);
    }

    #[tokio::test]
    async fn test_writer_wait_is_bounded() {
        let store = MemoryStore::new(Duration::from_millis(20));
        let _held = store.begin().await.unwrap();
        let err = store.begin().await.err().unwrap();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_sequences_are_per_prefix_and_day() {
        let store = MemoryStore::default();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let next_day = day.succ_opt().unwrap();
        assert_eq!(store.next_document_sequence(DocumentPrefix::GoodsReceipt, day).await.unwrap(), 1);
        assert_eq!(store.next_document_sequence(DocumentPrefix::GoodsReceipt, day).await.unwrap(), 2);
        assert_eq!(store.next_document_sequence(DocumentPrefix::GoodsIssue, day).await.unwrap(), 1);
        assert_eq!(store.next_document_sequence(DocumentPrefix::GoodsReceipt, next_day).await.unwrap(), 1);
    }
}
