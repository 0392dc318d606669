//! Price-volume-mix decomposition of period-over-period revenue change.
//!
//! Per product: `price_effect = (price_B − price_A) × qty_B` and
//! `volume_effect = (qty_B − qty_A) × price_A`. The mix effect is a single
//! aggregate residual, so the bridge reconciles exactly by construction:
//! `start + Σprice + Σvolume + mix = end`.

use crate::error::{CockpitError, Result};
use crate::schema::OrderLine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-product quantity and average price within one period.
#[derive(Debug, Clone, Copy, Default)]
struct ProductStats {
    qty: f64,
    price: f64,
}

/// Per-product contribution to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeDetail {
    pub product_id: String,
    pub qty_a: f64,
    pub qty_b: f64,
    pub price_a: f64,
    pub price_b: f64,
    pub price_effect: f64,
    pub volume_effect: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueBridge {
    pub start_value: f64,
    pub price_effect: f64,
    pub volume_effect: f64,
    pub mix_effect: f64,
    pub end_value: f64,
    pub details: Vec<BridgeDetail>,
}

/// Group one period's lines per product: quantities summed, unit prices
/// averaged (unweighted across lines).
fn group_by_product(lines: &[OrderLine]) -> BTreeMap<String, ProductStats> {
    let mut sums: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
    for line in lines {
        let entry = sums.entry(line.product_id.clone()).or_insert((0.0, 0.0, 0));
        entry.0 += line.quantity;
        entry.1 += line.unit_price;
        entry.2 += 1;
    }
    sums.into_iter()
        .map(|(product, (qty, price_sum, count))| {
            (
                product,
                ProductStats {
                    qty,
                    price: price_sum / count as f64,
                },
            )
        })
        .collect()
}

/// Decompose the revenue change from period A (earlier) to period B (later).
///
/// Products appearing in only one period enter the outer join with qty 0
/// and price 0 on the missing side. Either period being empty is an
/// insufficient-data signal: a one-sided bridge has no meaning.
pub fn revenue_bridge(period_a: &[OrderLine], period_b: &[OrderLine]) -> Result<RevenueBridge> {
    if period_a.is_empty() || period_b.is_empty() {
        return Err(CockpitError::InsufficientData(
            "both periods need at least one order line to build a bridge".to_string(),
        ));
    }

    let a = group_by_product(period_a);
    let b = group_by_product(period_b);

    let mut products: Vec<&String> = a.keys().chain(b.keys()).collect();
    products.sort();
    products.dedup();

    let mut start_value = 0.0;
    let mut end_value = 0.0;
    let mut price_effect = 0.0;
    let mut volume_effect = 0.0;
    let mut details = Vec::with_capacity(products.len());

    for product in products {
        let sa = a.get(product).copied().unwrap_or_default();
        let sb = b.get(product).copied().unwrap_or_default();

        let line_price = (sb.price - sa.price) * sb.qty;
        let line_volume = (sb.qty - sa.qty) * sa.price;

        start_value += sa.qty * sa.price;
        end_value += sb.qty * sb.price;
        price_effect += line_price;
        volume_effect += line_volume;

        details.push(BridgeDetail {
            product_id: product.clone(),
            qty_a: sa.qty,
            qty_b: sb.qty,
            price_a: sa.price,
            price_b: sb.price,
            price_effect: line_price,
            volume_effect: line_volume,
        });
    }

    // The residual absorbs cross-effects and rounding so the bridge closes.
    let mix_effect = end_value - start_value - price_effect - volume_effect;

    Ok(RevenueBridge {
        start_value,
        price_effect,
        volume_effect,
        mix_effect,
        end_value,
        details,
    })
}
