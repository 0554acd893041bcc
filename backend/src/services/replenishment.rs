//! Reorder alerts, recommendations and ABC classification
//!
//! None of these take balance locks: they read a possibly slightly stale
//! snapshot and are advisory only.

use chrono::{Duration, Months, NaiveDate, NaiveTime, Utc};
use shared::{
    build_recommendation, classify_abc, needs_reorder, sort_recommendations, summarize_abc,
    AbcAnalysis, AbcClass, Product, ReorderAlert, ReorderRecommendationReport,
};
use std::collections::HashMap;
use uuid::Uuid;

use super::InventoryEngine;
use crate::error::{AppError, AppResult};
use crate::store::LedgerStore;

const ALERT_PENDING: &str = "pending";

impl<S: LedgerStore> InventoryEngine<S> {
    /// Raise today's reorder alert for every pair of the given products whose
    /// available stock is at or below the reorder point.
    ///
    /// Returns only newly created alerts; a pair already alerted today is
    /// skipped silently.
    pub async fn check_reorder_points(&self, product_ids: &[Uuid]) -> AppResult<Vec<ReorderAlert>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let products: HashMap<Uuid, Product> = self
            .store
            .find_products(product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let balances = self.store.balances_for_products(product_ids).await?;

        let now = Utc::now();
        let today = now.date_naive();
        let mut created = Vec::new();

        for balance in balances {
            let Some(product) = products.get(&balance.product_id) else {
                continue;
            };
            if !needs_reorder(&balance, product) {
                continue;
            }

            let alert = ReorderAlert {
                id: Uuid::new_v4(),
                product_id: balance.product_id,
                location_id: balance.location_id,
                current_quantity: balance.quantity_available(),
                reorder_point: product.reorder_point,
                alert_date: today,
                status: ALERT_PENDING.to_string(),
                created_at: now,
            };

            if self.store.insert_reorder_alert(&alert).await? {
                tracing::info!(
                    product_id = %alert.product_id,
                    location_id = %alert.location_id,
                    current_quantity = alert.current_quantity,
                    reorder_point = alert.reorder_point,
                    "Reorder alert raised"
                );
                created.push(alert);
            }
        }

        Ok(created)
    }

    /// Pairs at a location that need replenishing, most urgent first
    pub async fn generate_reorder_recommendations(
        &self,
        location_id: Uuid,
    ) -> AppResult<ReorderRecommendationReport> {
        self.store
            .find_location(location_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location {location_id}")))?;

        let balances = self.store.balances_at_location(location_id).await?;
        let product_ids: Vec<Uuid> = balances.iter().map(|b| b.product_id).collect();
        let products: HashMap<Uuid, Product> = self
            .store
            .find_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let window_days = self.settings.consumption_window_days;
        let until = Utc::now();
        let since = until - Duration::days(i64::from(window_days));
        let issued: HashMap<Uuid, i64> = self
            .store
            .issued_quantities(location_id, since, until)
            .await?
            .into_iter()
            .map(|c| (c.product_id, c.total_quantity))
            .collect();

        let mut recommendations: Vec<_> = balances
            .iter()
            .filter_map(|balance| {
                let product = products.get(&balance.product_id)?;
                needs_reorder(balance, product).then(|| {
                    build_recommendation(
                        balance,
                        product,
                        issued.get(&product.id).copied().unwrap_or(0),
                        window_days,
                        self.settings.safety_factor,
                    )
                })
            })
            .collect();
        sort_recommendations(&mut recommendations);

        Ok(ReorderRecommendationReport {
            location_id,
            total_items: recommendations.len(),
            recommendations,
            generated_at: until,
        })
    }

    /// Classify products at a location by the value issued over the trailing
    /// window ending with `as_of`, and store the class on their balances.
    pub async fn perform_abc_analysis(
        &self,
        location_id: Uuid,
        as_of: NaiveDate,
    ) -> AppResult<AbcAnalysis> {
        self.store
            .find_location(location_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location {location_id}")))?;

        let until = as_of
            .succ_opt()
            .ok_or_else(|| AppError::field("as_of", "out_of_range", "date is out of range"))?
            .and_time(NaiveTime::MIN)
            .and_utc();
        let since = until
            .checked_sub_months(Months::new(self.settings.abc_window_months))
            .ok_or_else(|| AppError::field("as_of", "out_of_range", "date is out of range"))?;

        let consumption = self.store.issued_quantities(location_id, since, until).await?;
        let products = classify_abc(consumption);

        let classes: Vec<(Uuid, AbcClass)> = products
            .iter()
            .map(|p| (p.product_id, p.classification))
            .collect();
        self.store.save_abc_classifications(location_id, &classes).await?;

        let summary = summarize_abc(&products);
        tracing::info!(
            location_id = %location_id,
            as_of = %as_of,
            a = summary.a,
            b = summary.b,
            c = summary.c,
            "ABC analysis completed"
        );

        Ok(AbcAnalysis {
            location_id,
            analysis_date: as_of,
            products,
            summary,
            generated_at: Utc::now(),
        })
    }
}
