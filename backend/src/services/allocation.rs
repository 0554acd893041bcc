//! Availability pre-flight and FIFO allocation under row locks

use shared::{allocate_fifo, BatchAllocation, InventoryBalance, Shortage, StockKey};
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};
use crate::store::LedgerTx;

/// Check every requested pair against its locked balance before anything is
/// written, reporting all shortages at once.
pub(crate) fn preflight(
    required: &BTreeMap<StockKey, i64>,
    balances: &BTreeMap<StockKey, InventoryBalance>,
) -> AppResult<()> {
    let shortages: Vec<Shortage> = required
        .iter()
        .filter_map(|(key, &quantity)| {
            let available = balances
                .get(key)
                .map(InventoryBalance::quantity_available)
                .unwrap_or(0);
            (available < quantity)
                .then(|| Shortage::new(key.product_id, key.location_id, available, quantity))
        })
        .collect();

    if shortages.is_empty() {
        Ok(())
    } else {
        Err(AppError::InsufficientInventory { shortages })
    }
}

/// Oldest-first batches covering `quantity` at `key`, read inside `tx`
pub(crate) async fn allocate<T: LedgerTx>(
    tx: &mut T,
    key: StockKey,
    quantity: i64,
) -> AppResult<Vec<BatchAllocation>> {
    let batches = tx.batches(key).await?;
    allocate_fifo(&batches, quantity).map_err(|shortfall| AppError::from_shortfall(key, shortfall))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_preflight_reports_every_short_pair() {
        let ok = StockKey::new(Uuid::from_u128(1), Uuid::from_u128(9));
        let short = StockKey::new(Uuid::from_u128(2), Uuid::from_u128(9));
        let missing = StockKey::new(Uuid::from_u128(3), Uuid::from_u128(9));

        let mut balances = BTreeMap::new();
        let mut b = InventoryBalance::empty(ok.product_id, ok.location_id);
        b.quantity_on_hand = 10;
        balances.insert(ok, b);
        let mut b = InventoryBalance::empty(short.product_id, short.location_id);
        b.quantity_on_hand = 10;
        b.quantity_reserved = 4;
        balances.insert(short, b);

        let required = BTreeMap::from([(ok, 10), (short, 7), (missing, 1)]);
        match preflight(&required, &balances).unwrap_err() {
            AppError::InsufficientInventory { shortages } => {
                assert_eq!(shortages.len(), 2);
                assert_eq!(shortages[0].product_id, short.product_id);
                assert_eq!(shortages[0].available, 6);
                assert_eq!(shortages[0].shortage, 1);
                assert_eq!(shortages[1].available, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
