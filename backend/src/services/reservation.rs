//! Stock reservations

use chrono::Utc;
use shared::{Reservation, ReservationRequest, ReservationStatus, Shortage, StockKey};
use uuid::Uuid;

use super::{require_location, require_product, rolled_back, validate, InventoryEngine};
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

impl<S: LedgerStore> InventoryEngine<S> {
    /// Promise available stock to a caller without moving it.
    ///
    /// Availability is re-checked under the balance lock; the reserved
    /// quantity is then unavailable to issues and outbound transfers until
    /// released.
    pub async fn reserve_inventory(
        &self,
        request: ReservationRequest,
        actor_id: Uuid,
    ) -> AppResult<Reservation> {
        validate(&request).map_err(|e| rolled_back("reservation", e))?;
        let key = StockKey::new(request.product_id, request.location_id);

        let reservation = self
            .post_reservation(&request, key, actor_id)
            .await
            .map_err(|e| rolled_back("reservation", e))?;

        tracing::info!(
            reservation_id = %reservation.id,
            product_id = %key.product_id,
            location_id = %key.location_id,
            quantity = reservation.quantity,
            performed_by = %actor_id,
            "Inventory reserved"
        );

        self.cache.invalidate_all([&key]).await;
        Ok(reservation)
    }

    async fn post_reservation(
        &self,
        request: &ReservationRequest,
        key: StockKey,
        actor_id: Uuid,
    ) -> AppResult<Reservation> {
        let mut tx = self.store.begin().await?;

        require_product(&mut tx, key.product_id).await?;
        require_location(&mut tx, key.location_id).await?;
        let mut balance = tx.lock_balance(key).await?;

        let available = balance.quantity_available();
        if available < request.quantity {
            return Err(AppError::insufficient(Shortage::new(
                key.product_id,
                key.location_id,
                available,
                request.quantity,
            )));
        }

        let reservation = Reservation {
            id: Uuid::new_v4(),
            product_id: key.product_id,
            location_id: key.location_id,
            quantity: request.quantity,
            reference_type: request.reference_type.clone(),
            reference_id: request.reference_id,
            status: ReservationStatus::Active,
            created_by: actor_id,
            created_at: Utc::now(),
            released_at: None,
        };
        tx.insert_reservation(&reservation).await?;

        balance.quantity_reserved += reservation.quantity;
        balance.updated_at = Utc::now();
        tx.save_balance(&balance).await?;

        tx.commit().await?;
        Ok(reservation)
    }

    /// Return reserved stock to the available pool
    pub async fn release_reservation(
        &self,
        reservation_id: Uuid,
        actor_id: Uuid,
    ) -> AppResult<Reservation> {
        let reservation = self
            .post_release(reservation_id)
            .await
            .map_err(|e| rolled_back("reservation_release", e))?;

        tracing::info!(
            reservation_id = %reservation_id,
            quantity = reservation.quantity,
            performed_by = %actor_id,
            "Reservation released"
        );

        let key = StockKey::new(reservation.product_id, reservation.location_id);
        self.cache.invalidate_all([&key]).await;
        Ok(reservation)
    }

    async fn post_release(&self, reservation_id: Uuid) -> AppResult<Reservation> {
        let mut tx = self.store.begin().await?;

        let mut reservation = tx
            .find_reservation_for_update(reservation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {reservation_id}")))?;

        if reservation.status == ReservationStatus::Released {
            return Err(AppError::Conflict {
                resource: format!("reservation {reservation_id}"),
                message: "reservation is already released".to_string(),
            });
        }

        let mut balance = tx
            .lock_balance(StockKey::new(reservation.product_id, reservation.location_id))
            .await?;

        let now = Utc::now();
        reservation.status = ReservationStatus::Released;
        reservation.released_at = Some(now);
        tx.update_reservation(&reservation).await?;

        balance.quantity_reserved = (balance.quantity_reserved - reservation.quantity).max(0);
        balance.updated_at = now;
        tx.save_balance(&balance).await?;

        tx.commit().await?;
        Ok(reservation)
    }
}
