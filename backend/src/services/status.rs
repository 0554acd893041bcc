//! Read-side status and availability

use shared::{stock_status, Availability, InventoryStatus, StockKey};
use uuid::Uuid;

use super::InventoryEngine;
use crate::error::{AppError, AppResult};
use crate::store::LedgerStore;

impl<S: LedgerStore> InventoryEngine<S> {
    /// Balance, stock health and latest movements of a pair.
    ///
    /// Served from the cache when possible. Cache failures degrade to a
    /// store read.
    pub async fn get_inventory_status(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<InventoryStatus> {
        let key = StockKey::new(product_id, location_id);

        match self.cache.get::<InventoryStatus>(&key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, product_id = %product_id, location_id = %location_id, "Cache read failed"),
        }

        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))?;
        self.store
            .find_location(location_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location {location_id}")))?;

        let balance = self.store.get_balance(key).await?;
        let recent_movements = self
            .store
            .recent_movements(key, self.settings.recent_movements_limit)
            .await?;

        let status = InventoryStatus {
            product_id,
            location_id,
            quantity_on_hand: balance.as_ref().map_or(0, |b| b.quantity_on_hand),
            quantity_reserved: balance.as_ref().map_or(0, |b| b.quantity_reserved),
            quantity_available: balance.as_ref().map_or(0, |b| b.quantity_available()),
            abc_classification: balance.as_ref().and_then(|b| b.abc_classification),
            last_movement_at: balance.as_ref().and_then(|b| b.last_movement_at),
            stock_status: stock_status(balance.as_ref(), &product),
            recent_movements,
        };

        if let Err(e) = self.cache.put(&key, &status).await {
            tracing::warn!(error = %e, product_id = %product_id, location_id = %location_id, "Cache write failed");
        }

        Ok(status)
    }

    /// Whether a pair can cover `required` right now. Advisory only: the
    /// mutating workflows repeat the check under lock.
    pub async fn check_availability(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        required: i64,
    ) -> AppResult<Availability> {
        if required <= 0 {
            return Err(AppError::field("quantity", "range", "quantity must be greater than zero"));
        }

        let balance = self.get_balance(product_id, location_id).await?;
        let available_quantity = balance.quantity_available();

        Ok(Availability {
            available: available_quantity >= required,
            available_quantity,
            required_quantity: required,
            shortage: (required - available_quantity).max(0),
            on_hand: balance.quantity_on_hand,
            reserved: balance.quantity_reserved,
        })
    }
}
