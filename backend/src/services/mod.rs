//! Inventory workflows over the ledger store
//!
//! [`InventoryEngine`] owns the store, the balance cache and the ledger
//! tunables. Each workflow lives in its own module as an `impl` block.

use chrono::{NaiveDate, Utc};
use shared::{
    format_document_number, DocumentPrefix, FieldError, InventoryBalance, Location, Product,
    StockKey, ValidateRequest,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::BalanceCache;
use crate::config::LedgerSettings;
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

mod allocation;
pub mod cycle_count;
pub mod issue;
pub mod ledger;
pub mod receipt;
pub mod replenishment;
pub mod reservation;
pub mod status;
pub mod transfer;

pub use ledger::NewMovement;

pub struct InventoryEngine<S> {
    store: Arc<S>,
    cache: BalanceCache,
    settings: LedgerSettings,
}

impl<S: LedgerStore> InventoryEngine<S> {
    pub fn new(store: Arc<S>, cache: BalanceCache, settings: LedgerSettings) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Take the next `{PREFIX}{YYMMDD}{NNNN}` number for today
    async fn next_document_number(&self, prefix: DocumentPrefix) -> AppResult<String> {
        let today = Utc::now().date_naive();
        let sequence = self.store.next_document_sequence(prefix, today).await?;
        Ok(format_document_number(prefix, today, sequence))
    }

    /// Invalidate cached status of every touched pair and raise reorder
    /// alerts for the touched products. Neither step can fail the workflow
    /// that already committed.
    async fn after_commit(&self, keys: &BTreeSet<StockKey>) {
        self.cache.invalidate_all(keys.iter()).await;

        let product_ids: Vec<Uuid> = keys
            .iter()
            .map(|k| k.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if let Err(e) = self.check_reorder_points(&product_ids).await {
            tracing::warn!(error = %e, product_count = product_ids.len(), "Reorder check failed after commit");
        }
    }
}

/// Reject a request with every violation it carries
pub(crate) fn validate<R: ValidateRequest>(request: &R) -> AppResult<()> {
    let errors: Vec<FieldError> = request.validation_errors();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(errors))
    }
}

/// Document date supplied by the caller, or today
pub(crate) fn document_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Utc::now().date_naive())
}

/// Lock every pair in ascending key order, so that concurrent workflows over
/// overlapping pairs cannot deadlock.
pub(crate) async fn lock_balances<T: LedgerTx>(
    tx: &mut T,
    keys: &BTreeSet<StockKey>,
) -> AppResult<BTreeMap<StockKey, InventoryBalance>> {
    let mut balances = BTreeMap::new();
    for key in keys {
        let balance = tx.lock_balance(*key).await?;
        balances.insert(*key, balance);
    }
    Ok(balances)
}

pub(crate) async fn require_product<T: LedgerTx>(tx: &mut T, product_id: Uuid) -> AppResult<Product> {
    tx.find_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))
}

pub(crate) async fn require_location<T: LedgerTx>(
    tx: &mut T,
    location_id: Uuid,
) -> AppResult<Location> {
    tx.find_location(location_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Location {location_id}")))
}

/// Balance locked earlier in the same workflow
pub(crate) fn locked<'a>(
    balances: &'a mut BTreeMap<StockKey, InventoryBalance>,
    key: &StockKey,
) -> AppResult<&'a mut InventoryBalance> {
    balances
        .get_mut(key)
        .ok_or_else(|| AppError::Internal(format!("balance {key:?} was not locked")))
}

/// Log a workflow that wrote nothing and pass the error on
pub(crate) fn rolled_back(workflow: &'static str, err: AppError) -> AppError {
    match &err {
        AppError::Persistence(_)
        | AppError::Cache(_)
        | AppError::Configuration(_)
        | AppError::Internal(_) => {
            tracing::error!(workflow, error = %err, "Workflow rolled back");
        }
        _ => {
            tracing::warn!(workflow, error = %err, "Workflow rejected");
        }
    }
    err
}
