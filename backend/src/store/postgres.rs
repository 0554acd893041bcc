//! PostgreSQL ledger store
//!
//! Every workflow transaction runs at READ COMMITTED with explicit row locks
//! on `inventory_balances` and a per-transaction `lock_timeout`; a lock that
//! cannot be taken in time surfaces as a conflict.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    AbcClass, BatchSummary, CycleCount, DocumentPrefix, GoodsIssue, GoodsReceipt,
    InventoryBalance, InventoryMovement, InventoryTransfer, Location, Product, ProductConsumption,
    ReorderAlert, Reservation, StockKey,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use super::{LedgerStore, LedgerTotals, LedgerTx};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
    lock_timeout: Duration,
}

pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

impl PgStore {
    pub fn new(db: PgPool, lock_timeout: Duration) -> Self {
        Self { db, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

fn parse<T: FromStr>(value: &str) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| AppError::Internal(format!("corrupt stored value: {e}")))
}

// ============================================================================
// Rows
// ============================================================================

const PRODUCT_COLUMNS: &str = "id, sku, name, reorder_point, reorder_quantity, min_stock_level, \
     max_stock_level, lead_time_days, is_active";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    reorder_point: i64,
    reorder_quantity: i64,
    min_stock_level: i64,
    max_stock_level: i64,
    lead_time_days: i32,
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            reorder_point: row.reorder_point,
            reorder_quantity: row.reorder_quantity,
            min_stock_level: row.min_stock_level,
            max_stock_level: row.max_stock_level,
            lead_time_days: row.lead_time_days,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct LocationRow {
    id: Uuid,
    code: String,
    name: String,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location {
            id: row.id,
            code: row.code,
            name: row.name,
        }
    }
}

const BALANCE_COLUMNS: &str = "product_id, location_id, quantity_on_hand, quantity_reserved, \
     abc_classification, last_movement_at, updated_at";

#[derive(Debug, FromRow)]
struct BalanceRow {
    product_id: Uuid,
    location_id: Uuid,
    quantity_on_hand: i64,
    quantity_reserved: i64,
    abc_classification: Option<String>,
    last_movement_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BalanceRow> for InventoryBalance {
    type Error = AppError;

    fn try_from(row: BalanceRow) -> AppResult<Self> {
        Ok(InventoryBalance {
            product_id: row.product_id,
            location_id: row.location_id,
            quantity_on_hand: row.quantity_on_hand,
            quantity_reserved: row.quantity_reserved,
            abc_classification: row.abc_classification.as_deref().map(parse).transpose()?,
            last_movement_at: row.last_movement_at,
            updated_at: row.updated_at,
        })
    }
}

const MOVEMENT_COLUMNS: &str = "id, product_id, location_id, movement_type, quantity_change, \
     quantity_before, quantity_after, unit_cost, total_value, reference_type, reference_id, \
     batch_number, serial_numbers, expiry_date, performed_by, reason_code, notes, created_at";

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    location_id: Uuid,
    movement_type: String,
    quantity_change: i64,
    quantity_before: i64,
    quantity_after: i64,
    unit_cost: Decimal,
    total_value: Decimal,
    reference_type: String,
    reference_id: Uuid,
    batch_number: Option<String>,
    serial_numbers: Vec<String>,
    expiry_date: Option<NaiveDate>,
    performed_by: Uuid,
    reason_code: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        Ok(InventoryMovement {
            id: row.id,
            product_id: row.product_id,
            location_id: row.location_id,
            movement_type: parse(&row.movement_type)?,
            quantity_change: row.quantity_change,
            quantity_before: row.quantity_before,
            quantity_after: row.quantity_after,
            unit_cost: row.unit_cost,
            total_value: row.total_value,
            reference_type: parse(&row.reference_type)?,
            reference_id: row.reference_id,
            batch_number: row.batch_number,
            serial_numbers: row.serial_numbers,
            expiry_date: row.expiry_date,
            performed_by: row.performed_by,
            reason_code: parse(&row.reason_code)?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    batch_number: Option<String>,
    remaining_quantity: i64,
    unit_cost: Decimal,
    batch_date: DateTime<Utc>,
    expiry_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct ReservationRow {
    id: Uuid,
    product_id: Uuid,
    location_id: Uuid,
    quantity: i64,
    reference_type: Option<String>,
    reference_id: Option<Uuid>,
    status: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(row: ReservationRow) -> AppResult<Self> {
        Ok(Reservation {
            id: row.id,
            product_id: row.product_id,
            location_id: row.location_id,
            quantity: row.quantity,
            reference_type: row.reference_type,
            reference_id: row.reference_id,
            status: parse(&row.status)?,
            created_by: row.created_by,
            created_at: row.created_at,
            released_at: row.released_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    product_id: Uuid,
    location_id: Uuid,
    current_quantity: i64,
    reorder_point: i64,
    alert_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<AlertRow> for ReorderAlert {
    fn from(row: AlertRow) -> Self {
        ReorderAlert {
            id: row.id,
            product_id: row.product_id,
            location_id: row.location_id,
            current_quantity: row.current_quantity,
            reorder_point: row.reorder_point,
            alert_date: row.alert_date,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[async_trait::async_trait]
impl LedgerStore for PgStore {
    type Tx = PgLedgerTx;

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn begin(&self) -> AppResult<PgLedgerTx> {
        let mut tx = self.db.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;

        // SET does not take bind parameters
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        Ok(PgLedgerTx { tx })
    }

    async fn next_document_sequence(
        &self,
        prefix: DocumentPrefix,
        date: NaiveDate,
    ) -> AppResult<u32> {
        let value = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO document_sequences (prefix, sequence_date, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (prefix, sequence_date)
            DO UPDATE SET last_value = document_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(prefix.code())
        .bind(date)
        .fetch_one(&self.db)
        .await?;

        u32::try_from(value)
            .map_err(|_| AppError::Internal(format!("document sequence out of range: {value}")))
    }

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn find_products(&self, product_ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn find_location(&self, location_id: Uuid) -> AppResult<Option<Location>> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT id, code, name FROM locations WHERE id = $1",
        )
        .bind(location_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Location::from))
    }

    async fn get_balance(&self, key: StockKey) -> AppResult<Option<InventoryBalance>> {
        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM inventory_balances \
             WHERE product_id = $1 AND location_id = $2"
        ))
        .bind(key.product_id)
        .bind(key.location_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(InventoryBalance::try_from).transpose()
    }

    async fn balances_for_products(
        &self,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<InventoryBalance>> {
        let rows = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM inventory_balances \
             WHERE product_id = ANY($1) ORDER BY product_id, location_id"
        ))
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(InventoryBalance::try_from).collect()
    }

    async fn balances_at_location(&self, location_id: Uuid) -> AppResult<Vec<InventoryBalance>> {
        let rows = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM inventory_balances \
             WHERE location_id = $1 ORDER BY product_id"
        ))
        .bind(location_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(InventoryBalance::try_from).collect()
    }

    async fn recent_movements(
        &self,
        key: StockKey,
        limit: u32,
    ) -> AppResult<Vec<InventoryMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements \
             WHERE product_id = $1 AND location_id = $2 \
             ORDER BY seq DESC LIMIT $3"
        ))
        .bind(key.product_id)
        .bind(key.location_id)
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(InventoryMovement::try_from).collect()
    }

    async fn movements_for(&self, key: StockKey) -> AppResult<Vec<InventoryMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements \
             WHERE product_id = $1 AND location_id = $2 ORDER BY seq"
        ))
        .bind(key.product_id)
        .bind(key.location_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(InventoryMovement::try_from).collect()
    }

    async fn issued_quantities(
        &self,
        location_id: Uuid,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<ProductConsumption>> {
        let rows = sqlx::query_as::<_, (Uuid, i64, Decimal)>(
            r#"
            SELECT product_id,
                   COALESCE(SUM(ABS(quantity_change)), 0)::BIGINT AS total_quantity,
                   COALESCE(SUM(ABS(quantity_change) * unit_cost), 0) AS total_value
            FROM inventory_movements
            WHERE location_id = $1
              AND movement_type = 'ISSUE'
              AND created_at >= $2
              AND created_at < $3
            GROUP BY product_id
            ORDER BY product_id
            "#,
        )
        .bind(location_id)
        .bind(since)
        .bind(until)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, total_quantity, total_value)| ProductConsumption {
                product_id,
                total_quantity,
                total_value,
            })
            .collect())
    }

    async fn insert_reorder_alert(&self, alert: &ReorderAlert) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO reorder_alerts (
                id, product_id, location_id, current_quantity, reorder_point,
                alert_date, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (product_id, location_id, alert_date) DO NOTHING
            "#,
        )
        .bind(alert.id)
        .bind(alert.product_id)
        .bind(alert.location_id)
        .bind(alert.current_quantity)
        .bind(alert.reorder_point)
        .bind(alert.alert_date)
        .bind(&alert.status)
        .bind(alert.created_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reorder_alerts(&self, alert_date: NaiveDate) -> AppResult<Vec<ReorderAlert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, product_id, location_id, current_quantity, reorder_point,
                   alert_date, status, created_at
            FROM reorder_alerts
            WHERE alert_date = $1
            ORDER BY created_at
            "#,
        )
        .bind(alert_date)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(ReorderAlert::from).collect())
    }

    async fn save_abc_classifications(
        &self,
        location_id: Uuid,
        classes: &[(Uuid, AbcClass)],
    ) -> AppResult<()> {
        let product_ids: Vec<Uuid> = classes.iter().map(|(id, _)| *id).collect();
        let labels: Vec<&str> = classes.iter().map(|(_, class)| class.as_str()).collect();

        // Advisory column only; no balance lock is taken
        sqlx::query(
            r#"
            INSERT INTO inventory_balances (product_id, location_id, abc_classification)
            SELECT p.product_id, $1, p.class
            FROM UNNEST($2::UUID[], $3::TEXT[]) AS p(product_id, class)
            ON CONFLICT (product_id, location_id)
            DO UPDATE SET abc_classification = EXCLUDED.abc_classification,
                          updated_at = NOW()
            "#,
        )
        .bind(location_id)
        .bind(&product_ids)
        .bind(&labels)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Transaction
// ============================================================================

#[async_trait::async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_product(&mut self, product_id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn find_location(&mut self, location_id: Uuid) -> AppResult<Option<Location>> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT id, code, name FROM locations WHERE id = $1",
        )
        .bind(location_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Location::from))
    }

    async fn lock_balance(&mut self, key: StockKey) -> AppResult<InventoryBalance> {
        sqlx::query(
            r#"
            INSERT INTO inventory_balances (product_id, location_id)
            VALUES ($1, $2)
            ON CONFLICT (product_id, location_id) DO NOTHING
            "#,
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .execute(&mut *self.tx)
        .await?;

        let row = sqlx::query_as::<_, BalanceRow>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM inventory_balances \
             WHERE product_id = $1 AND location_id = $2 FOR UPDATE"
        ))
        .bind(key.product_id)
        .bind(key.location_id)
        .fetch_one(&mut *self.tx)
        .await?;

        InventoryBalance::try_from(row)
    }

    async fn save_balance(&mut self, balance: &InventoryBalance) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_balances
            SET quantity_on_hand = $3,
                quantity_reserved = $4,
                last_movement_at = $5,
                updated_at = NOW()
            WHERE product_id = $1 AND location_id = $2
            "#,
        )
        .bind(balance.product_id)
        .bind(balance.location_id)
        .bind(balance.quantity_on_hand)
        .bind(balance.quantity_reserved)
        .bind(balance.last_movement_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn batches(&mut self, key: StockKey) -> AppResult<Vec<BatchSummary>> {
        // Named batches date from their first inbound movement at any
        // location; the unbatched pool is local to the pair.
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT l.batch_number,
                   l.remaining_quantity,
                   COALESCE(i.unit_cost, 0) AS unit_cost,
                   COALESCE(i.batch_date, l.first_at) AS batch_date,
                   i.expiry_date
            FROM (
                SELECT batch_number,
                       SUM(quantity_change)::BIGINT AS remaining_quantity,
                       MIN(created_at) AS first_at,
                       MIN(seq) AS first_seq
                FROM inventory_movements
                WHERE product_id = $1 AND location_id = $2
                GROUP BY batch_number
                HAVING SUM(quantity_change) > 0
            ) l
            LEFT JOIN LATERAL (
                SELECT MIN(m.created_at) AS batch_date,
                       ROUND(SUM(m.quantity_change * m.unit_cost)
                           / NULLIF(SUM(m.quantity_change), 0), 6) AS unit_cost,
                       MIN(m.expiry_date) AS expiry_date
                FROM inventory_movements m
                WHERE m.product_id = $1
                  AND m.quantity_change > 0
                  AND m.batch_number IS NOT DISTINCT FROM l.batch_number
                  AND (l.batch_number IS NOT NULL OR m.location_id = $2)
            ) i ON TRUE
            ORDER BY batch_date ASC, l.first_seq ASC
            "#,
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BatchSummary {
                batch_number: row.batch_number,
                remaining_quantity: row.remaining_quantity,
                unit_cost: row.unit_cost,
                batch_date: row.batch_date,
                expiry_date: row.expiry_date,
            })
            .collect())
    }

    async fn ledger_totals(&mut self, key: StockKey) -> AppResult<LedgerTotals> {
        let (quantity_on_hand, last_movement_at) =
            sqlx::query_as::<_, (i64, Option<DateTime<Utc>>)>(
                r#"
                SELECT COALESCE(SUM(quantity_change), 0)::BIGINT, MAX(created_at)
                FROM inventory_movements
                WHERE product_id = $1 AND location_id = $2
                "#,
            )
            .bind(key.product_id)
            .bind(key.location_id)
            .fetch_one(&mut *self.tx)
            .await?;

        let quantity_reserved = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM inventory_reservations
            WHERE product_id = $1 AND location_id = $2 AND status = 'active'
            "#,
        )
        .bind(key.product_id)
        .bind(key.location_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(LedgerTotals {
            quantity_on_hand,
            quantity_reserved,
            last_movement_at,
        })
    }

    async fn insert_movement(&mut self, m: &InventoryMovement) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                id, product_id, location_id, movement_type, quantity_change,
                quantity_before, quantity_after, unit_cost, total_value,
                reference_type, reference_id, batch_number, serial_numbers,
                expiry_date, performed_by, reason_code, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(m.id)
        .bind(m.product_id)
        .bind(m.location_id)
        .bind(m.movement_type.as_str())
        .bind(m.quantity_change)
        .bind(m.quantity_before)
        .bind(m.quantity_after)
        .bind(m.unit_cost)
        .bind(m.total_value)
        .bind(m.reference_type.as_str())
        .bind(m.reference_id)
        .bind(&m.batch_number)
        .bind(&m.serial_numbers)
        .bind(m.expiry_date)
        .bind(m.performed_by)
        .bind(m.reason_code.as_str())
        .bind(&m.notes)
        .bind(m.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_receipt(&mut self, receipt: &GoodsReceipt) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO goods_receipts (
                id, receipt_number, supplier_id, purchase_order_id, receipt_date,
                received_by, total_value, notes, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(receipt.id)
        .bind(&receipt.receipt_number)
        .bind(receipt.supplier_id)
        .bind(receipt.purchase_order_id)
        .bind(receipt.receipt_date)
        .bind(receipt.received_by)
        .bind(receipt.total_value)
        .bind(&receipt.notes)
        .bind(receipt.created_by)
        .bind(receipt.created_at)
        .execute(&mut *self.tx)
        .await?;

        for item in &receipt.items {
            sqlx::query(
                r#"
                INSERT INTO goods_receipt_items (
                    id, receipt_id, product_id, location_id, quantity_received,
                    unit_cost, total_cost, batch_number, serial_numbers, expiry_date,
                    bin_location, quality_status, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(item.id)
            .bind(item.receipt_id)
            .bind(item.product_id)
            .bind(item.location_id)
            .bind(item.quantity_received)
            .bind(item.unit_cost)
            .bind(item.total_cost)
            .bind(&item.batch_number)
            .bind(&item.serial_numbers)
            .bind(item.expiry_date)
            .bind(&item.bin_location)
            .bind(item.quality_status.as_str())
            .bind(&item.notes)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn insert_issue(&mut self, issue: &GoodsIssue) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO goods_issues (
                id, issue_number, order_id, department, issued_to, issue_date,
                total_value, notes, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(issue.id)
        .bind(&issue.issue_number)
        .bind(issue.order_id)
        .bind(&issue.department)
        .bind(issue.issued_to)
        .bind(issue.issue_date)
        .bind(issue.total_value)
        .bind(&issue.notes)
        .bind(issue.created_by)
        .bind(issue.created_at)
        .execute(&mut *self.tx)
        .await?;

        for item in &issue.items {
            sqlx::query(
                r#"
                INSERT INTO goods_issue_items (
                    id, issue_id, product_id, location_id, quantity_issued,
                    unit_cost, total_cost, batch_number, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.id)
            .bind(item.issue_id)
            .bind(item.product_id)
            .bind(item.location_id)
            .bind(item.quantity_issued)
            .bind(item.unit_cost)
            .bind(item.total_cost)
            .bind(&item.batch_number)
            .bind(&item.notes)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn insert_transfer(&mut self, transfer: &InventoryTransfer) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_transfers (
                id, transfer_number, from_location_id, to_location_id, transfer_date,
                requested_by, approved_by, notes, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(transfer.id)
        .bind(&transfer.transfer_number)
        .bind(transfer.from_location_id)
        .bind(transfer.to_location_id)
        .bind(transfer.transfer_date)
        .bind(transfer.requested_by)
        .bind(transfer.approved_by)
        .bind(&transfer.notes)
        .bind(transfer.created_by)
        .bind(transfer.created_at)
        .execute(&mut *self.tx)
        .await?;

        for item in &transfer.items {
            sqlx::query(
                r#"
                INSERT INTO inventory_transfer_items (
                    id, transfer_id, product_id, quantity, unit_cost, batch_number,
                    to_bin_location, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(item.transfer_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_cost)
            .bind(&item.batch_number)
            .bind(&item.to_bin_location)
            .bind(&item.notes)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn insert_cycle_count(&mut self, count: &CycleCount) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cycle_counts (
                id, cycle_count_number, location_id, count_date, counted_by,
                total_variances, notes, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(count.id)
        .bind(&count.cycle_count_number)
        .bind(count.location_id)
        .bind(count.count_date)
        .bind(count.counted_by)
        .bind(count.total_variances)
        .bind(&count.notes)
        .bind(count.created_by)
        .bind(count.created_at)
        .execute(&mut *self.tx)
        .await?;

        for item in &count.items {
            sqlx::query(
                r#"
                INSERT INTO cycle_count_items (
                    id, cycle_count_id, product_id, system_quantity, counted_quantity,
                    variance, unit_cost, variance_value, bin_location, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(item.id)
            .bind(item.cycle_count_id)
            .bind(item.product_id)
            .bind(item.system_quantity)
            .bind(item.counted_quantity)
            .bind(item.variance)
            .bind(item.unit_cost)
            .bind(item.variance_value)
            .bind(&item.bin_location)
            .bind(&item.notes)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn insert_reservation(&mut self, r: &Reservation) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_reservations (
                id, product_id, location_id, quantity, reference_type, reference_id,
                status, created_by, created_at, released_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(r.id)
        .bind(r.product_id)
        .bind(r.location_id)
        .bind(r.quantity)
        .bind(&r.reference_type)
        .bind(r.reference_id)
        .bind(r.status.as_str())
        .bind(r.created_by)
        .bind(r.created_at)
        .bind(r.released_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_reservation_for_update(
        &mut self,
        reservation_id: Uuid,
    ) -> AppResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT id, product_id, location_id, quantity, reference_type, reference_id,
                   status, created_by, created_at, released_at
            FROM inventory_reservations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Reservation::try_from).transpose()
    }

    async fn update_reservation(&mut self, r: &Reservation) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_reservations
            SET status = $2, released_at = $3
            WHERE id = $1
            "#,
        )
        .bind(r.id)
        .bind(r.status.as_str())
        .bind(r.released_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
