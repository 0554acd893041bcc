//! Replenishment arithmetic and ABC value classification

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{
    AbcClass, AbcClassification, AbcSummary, InventoryBalance, Product, ProductConsumption,
    ReorderRecommendation, ReplenishmentPriority, StockStatus,
};

/// Cumulative value share that closes the A tier
pub fn a_threshold() -> Decimal {
    Decimal::new(80, 2)
}

/// Cumulative value share that closes the B tier
pub fn b_threshold() -> Decimal {
    Decimal::new(95, 2)
}

/// Default multiplier applied to lead-time demand
pub fn default_safety_factor() -> Decimal {
    Decimal::new(12, 1)
}

/// Rank products by consumption value and assign A/B/C tiers.
///
/// Products are sorted by value descending. A product whose preceding
/// cumulative share of total value is below 80% is `A`, below 95% is `B`,
/// otherwise `C`. When nothing of value was consumed every product is `C`.
pub fn classify_abc(consumption: Vec<ProductConsumption>) -> Vec<AbcClassification> {
    let mut ranked = consumption;
    ranked.sort_by(|a, b| {
        b.total_value
            .cmp(&a.total_value)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    let total: Decimal = ranked.iter().map(|p| p.total_value).sum();
    let mut cumulative = Decimal::ZERO;

    ranked
        .into_iter()
        .map(|p| {
            let preceding_share = if total.is_zero() {
                Decimal::ONE
            } else {
                cumulative / total
            };
            cumulative += p.total_value;

            let classification = if preceding_share < a_threshold() {
                AbcClass::A
            } else if preceding_share < b_threshold() {
                AbcClass::B
            } else {
                AbcClass::C
            };

            let avg_unit_cost = if p.total_quantity > 0 {
                (p.total_value / Decimal::from(p.total_quantity)).round_dp(4)
            } else {
                Decimal::ZERO
            };

            AbcClassification {
                product_id: p.product_id,
                total_consumption: p.total_quantity,
                avg_unit_cost,
                total_value: p.total_value,
                preceding_share: preceding_share.round_dp(4),
                classification,
            }
        })
        .collect()
}

pub fn summarize_abc(products: &[AbcClassification]) -> AbcSummary {
    let mut summary = AbcSummary {
        total: products.len(),
        ..AbcSummary::default()
    };
    for p in products {
        match p.classification {
            AbcClass::A => summary.a += 1,
            AbcClass::B => summary.b += 1,
            AbcClass::C => summary.c += 1,
        }
    }
    summary
}

/// Units issued per day over the window
pub fn average_daily_consumption(total_issued: i64, window_days: u32) -> Decimal {
    if window_days == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(total_issued.max(0)) / Decimal::from(window_days)
}

/// `max(reorder_quantity, ceil(avg_daily * lead_time_days * safety_factor))`
pub fn suggested_order_quantity(
    reorder_quantity: i64,
    avg_daily_consumption: Decimal,
    lead_time_days: i32,
    safety_factor: Decimal,
) -> i64 {
    let lead_time_demand =
        (avg_daily_consumption * Decimal::from(lead_time_days.max(0)) * safety_factor).ceil();
    let demand = lead_time_demand.to_i64().unwrap_or(i64::MAX);
    reorder_quantity.max(demand)
}

/// Stock health used by inventory status reads
pub fn stock_status(balance: Option<&InventoryBalance>, product: &Product) -> StockStatus {
    let Some(balance) = balance else {
        return StockStatus::OutOfStock;
    };
    let available = balance.quantity_available();
    if available <= 0 {
        StockStatus::OutOfStock
    } else if available <= product.reorder_point {
        StockStatus::Reorder
    } else if available <= product.min_stock_level {
        StockStatus::Low
    } else if product.max_stock_level > 0 && available >= product.max_stock_level {
        StockStatus::Overstock
    } else {
        StockStatus::Normal
    }
}

/// True when an active product has fallen to its reorder point
pub fn needs_reorder(balance: &InventoryBalance, product: &Product) -> bool {
    product.is_active && balance.quantity_available() <= product.reorder_point
}

pub fn replenishment_priority(available: i64, product: &Product) -> ReplenishmentPriority {
    if available <= 0 {
        ReplenishmentPriority::OutOfStock
    } else if available <= product.min_stock_level {
        ReplenishmentPriority::BelowMinimum
    } else {
        ReplenishmentPriority::Reorder
    }
}

/// Build the recommendation line for a pair that needs reordering
pub fn build_recommendation(
    balance: &InventoryBalance,
    product: &Product,
    total_issued: i64,
    window_days: u32,
    safety_factor: Decimal,
) -> ReorderRecommendation {
    let available = balance.quantity_available();
    let avg_daily = average_daily_consumption(total_issued, window_days);
    ReorderRecommendation {
        product_id: product.id,
        sku: product.sku.clone(),
        product_name: product.name.clone(),
        location_id: balance.location_id,
        quantity_on_hand: balance.quantity_on_hand,
        quantity_reserved: balance.quantity_reserved,
        quantity_available: available,
        reorder_point: product.reorder_point,
        reorder_quantity: product.reorder_quantity,
        lead_time_days: product.lead_time_days,
        min_stock_level: product.min_stock_level,
        max_stock_level: product.max_stock_level,
        avg_daily_consumption: avg_daily.round_dp(4),
        suggested_order_quantity: suggested_order_quantity(
            product.reorder_quantity,
            avg_daily,
            product.lead_time_days,
            safety_factor,
        ),
        priority: replenishment_priority(available, product),
    }
}

/// Most urgent first, then lowest availability
pub fn sort_recommendations(recommendations: &mut [ReorderRecommendation]) {
    recommendations.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.quantity_available.cmp(&b.quantity_available))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn consumption(id: u128, value: i64) -> ProductConsumption {
        ProductConsumption {
            product_id: Uuid::from_u128(id),
            total_quantity: 10,
            total_value: Decimal::from(value),
        }
    }

    fn product(reorder_point: i64, min: i64, max: i64) -> Product {
        Product {
            id: Uuid::from_u128(7),
            sku: "SKU-7".to_string(),
            name: "Widget".to_string(),
            reorder_point,
            reorder_quantity: 50,
            min_stock_level: min,
            max_stock_level: max,
            lead_time_days: 7,
            is_active: true,
        }
    }

    fn balance(on_hand: i64, reserved: i64) -> InventoryBalance {
        let mut b = InventoryBalance::empty(Uuid::from_u128(7), Uuid::from_u128(9));
        b.quantity_on_hand = on_hand;
        b.quantity_reserved = reserved;
        b
    }

    #[test]
    fn test_abc_example_800_150_50() {
        let result = classify_abc(vec![
            consumption(3, 50),
            consumption(1, 800),
            consumption(2, 150),
        ]);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].product_id, Uuid::from_u128(1));
        assert_eq!(result[0].classification, AbcClass::A);
        assert_eq!(result[1].product_id, Uuid::from_u128(2));
        assert_eq!(result[1].classification, AbcClass::B);
        assert_eq!(result[2].product_id, Uuid::from_u128(3));
        assert_eq!(result[2].classification, AbcClass::C);
        assert_eq!(result[1].preceding_share, dec("0.8"));
        assert_eq!(result[2].preceding_share, dec("0.95"));
    }

    #[test]
    fn test_single_product_is_a() {
        let result = classify_abc(vec![consumption(1, 10)]);
        assert_eq!(result[0].classification, AbcClass::A);
    }

    #[test]
    fn test_zero_value_products_are_c() {
        let result = classify_abc(vec![consumption(1, 0), consumption(2, 0)]);
        assert!(result.iter().all(|r| r.classification == AbcClass::C));
    }

    #[test]
    fn test_abc_average_unit_cost() {
        let result = classify_abc(vec![ProductConsumption {
            product_id: Uuid::nil(),
            total_quantity: 4,
            total_value: dec("10"),
        }]);
        assert_eq!(result[0].avg_unit_cost, dec("2.5"));
    }

    #[test]
    fn test_abc_summary_counts() {
        let result = classify_abc(vec![
            consumption(1, 800),
            consumption(2, 150),
            consumption(3, 50),
        ]);
        let summary = summarize_abc(&result);
        assert_eq!(
            summary,
            AbcSummary {
                a: 1,
                b: 1,
                c: 1,
                total: 3
            }
        );
    }

    #[test]
    fn test_average_daily_consumption() {
        assert_eq!(average_daily_consumption(90, 30), dec("3"));
        assert_eq!(average_daily_consumption(0, 30), Decimal::ZERO);
        assert_eq!(average_daily_consumption(10, 0), Decimal::ZERO);
    }

    #[test]
    fn test_suggested_quantity_uses_lead_time_demand() {
        // 3/day * 10 days * 1.2 = 36
        assert_eq!(
            suggested_order_quantity(20, dec("3"), 10, default_safety_factor()),
            36
        );
        // 0.5/day * 7 days * 1.2 = 4.2 -> 5, below reorder quantity
        assert_eq!(
            suggested_order_quantity(20, dec("0.5"), 7, default_safety_factor()),
            20
        );
        // Fractional demand rounds up
        assert_eq!(
            suggested_order_quantity(0, dec("0.5"), 7, default_safety_factor()),
            5
        );
    }

    #[test]
    fn test_stock_status_levels() {
        let p = product(10, 20, 100);
        assert_eq!(stock_status(None, &p), StockStatus::OutOfStock);
        assert_eq!(stock_status(Some(&balance(5, 5)), &p), StockStatus::OutOfStock);
        assert_eq!(stock_status(Some(&balance(10, 0)), &p), StockStatus::Reorder);
        assert_eq!(stock_status(Some(&balance(15, 0)), &p), StockStatus::Low);
        assert_eq!(stock_status(Some(&balance(120, 0)), &p), StockStatus::Overstock);
        assert_eq!(stock_status(Some(&balance(50, 0)), &p), StockStatus::Normal);
    }

    #[test]
    fn test_needs_reorder_respects_active_flag() {
        let mut p = product(10, 0, 0);
        assert!(needs_reorder(&balance(10, 0), &p));
        assert!(needs_reorder(&balance(30, 25), &p));
        assert!(!needs_reorder(&balance(11, 0), &p));
        p.is_active = false;
        assert!(!needs_reorder(&balance(0, 0), &p));
    }

    #[test]
    fn test_recommendations_sort_most_urgent_first() {
        let p = product(30, 10, 100);
        let mut recs = vec![
            build_recommendation(&balance(25, 0), &p, 0, 30, default_safety_factor()),
            build_recommendation(&balance(0, 0), &p, 0, 30, default_safety_factor()),
            build_recommendation(&balance(8, 0), &p, 0, 30, default_safety_factor()),
            build_recommendation(&balance(20, 0), &p, 0, 30, default_safety_factor()),
        ];
        sort_recommendations(&mut recs);
        let available: Vec<i64> = recs.iter().map(|r| r.quantity_available).collect();
        assert_eq!(available, vec![0, 8, 20, 25]);
        assert_eq!(recs[0].priority, ReplenishmentPriority::OutOfStock);
        assert_eq!(recs[1].priority, ReplenishmentPriority::BelowMinimum);
        assert_eq!(recs[3].priority, ReplenishmentPriority::Reorder);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Tiers are monotone in value rank: A before B before C
        #[test]
        fn abc_tiers_follow_rank(values in prop::collection::vec(0i64..10_000, 1..20)) {
            let input: Vec<ProductConsumption> = values
                .iter()
                .enumerate()
                .map(|(i, v)| consumption(i as u128, *v))
                .collect();
            let result = classify_abc(input);
            prop_assert_eq!(result.len(), values.len());
            for pair in result.windows(2) {
                prop_assert!(pair[0].total_value >= pair[1].total_value);
                prop_assert!(pair[0].classification <= pair[1].classification);
            }
            let total: i64 = values.iter().sum();
            if total > 0 {
                prop_assert_eq!(result[0].classification, AbcClass::A);
            }
        }

        /// The suggestion never drops below the configured reorder quantity
        #[test]
        fn suggestion_at_least_reorder_quantity(
            reorder_qty in 0i64..1000,
            issued in 0i64..10_000,
            lead in 0i32..90,
        ) {
            let avg = average_daily_consumption(issued, 30);
            let suggested = suggested_order_quantity(reorder_qty, avg, lead, default_safety_factor());
            prop_assert!(suggested >= reorder_qty);
        }
    }
}
