//! Working capital metrics: AR/AP balances, inventory valuation, and the
//! DSO/DPO/DIO/CCC/NWC ratio set over a trailing window.
//!
//! Every ratio floors to 0 on a zero denominator; sparse data degrades to
//! zeros rather than errors so a dashboard never goes dark.

use crate::pnl::estimate_unit_cost;
use crate::schema::{CostTable, InventorySnapshot, Invoice, OrderLine};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default trailing window for the daily revenue/COGS averages.
pub const DEFAULT_TRAILING_DAYS: i64 = 90;

/// Fallback factor when a product has no explicit unit cost: last observed
/// unit price times this.
const INVENTORY_PRICE_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapital {
    pub dso: f64,
    pub dpo: f64,
    pub dio: f64,
    pub ccc: f64,
    pub nwc: f64,
    pub ar_balance: f64,
    pub ap_balance: f64,
    pub inventory_value: f64,
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Sum of open amounts, 0.0 when the table is absent.
fn open_balance(invoices: Option<&[Invoice]>) -> f64 {
    invoices
        .map(|rows| rows.iter().map(Invoice::open_amount).sum())
        .unwrap_or(0.0)
}

/// Value the inventory snapshot: explicit unit cost per product when the
/// cost table has one, otherwise the last observed unit price (file order
/// over the full, unwindowed line set) times 0.7.
pub fn inventory_value(
    inventory: &[InventorySnapshot],
    lines: &[OrderLine],
    costs: Option<&CostTable>,
) -> f64 {
    let mut last_price: BTreeMap<&str, f64> = BTreeMap::new();
    for line in lines {
        last_price.insert(line.product_id.as_str(), line.unit_price);
    }

    inventory
        .iter()
        .map(|snapshot| {
            let unit_cost = costs
                .and_then(|c| c.unit_cost(&snapshot.product_id))
                .or_else(|| {
                    last_price
                        .get(snapshot.product_id.as_str())
                        .map(|p| p * INVENTORY_PRICE_FACTOR)
                })
                .unwrap_or(0.0);
            snapshot.on_hand * unit_cost
        })
        .sum()
}

/// Compute the working capital metric set.
///
/// The daily revenue and COGS averages are taken over
/// `[max order_date − trailing_days, max order_date]`, averaging per-day
/// totals across the days that actually have orders. The denominator is
/// the number of distinct active days, not the window length — that is the
/// established contract of these ratios and changing it would silently
/// shift every derived figure.
pub fn wc_metrics(
    lines: &[OrderLine],
    ar: Option<&[Invoice]>,
    ap: Option<&[Invoice]>,
    inventory: Option<&[InventorySnapshot]>,
    costs: Option<&CostTable>,
    trailing_days: i64,
) -> WorkingCapital {
    let Some(max_date) = lines.iter().filter_map(|l| l.order_date).max() else {
        return WorkingCapital::default();
    };
    let window_start = max_date - Duration::days(trailing_days);

    let mut daily: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for line in lines {
        let Some(date) = line.order_date else {
            continue;
        };
        if date < window_start || date > max_date {
            continue;
        }
        let entry = daily.entry(date).or_insert((0.0, 0.0));
        entry.0 += line.extended_price();
        entry.1 += line.quantity * estimate_unit_cost(line, costs).value;
    }

    let active_days = daily.len() as f64;
    let daily_revenue = safe_ratio(daily.values().map(|(rev, _)| rev).sum(), active_days);
    let daily_cogs = safe_ratio(daily.values().map(|(_, cogs)| cogs).sum(), active_days);

    let ar_balance = open_balance(ar);
    let ap_balance = open_balance(ap);
    let inv_value = inventory
        .map(|snapshots| inventory_value(snapshots, lines, costs))
        .unwrap_or(0.0);

    let dso = safe_ratio(ar_balance, daily_revenue) * 365.0;
    let dpo = safe_ratio(ap_balance, daily_cogs) * 365.0;
    let dio = safe_ratio(inv_value, daily_cogs) * 365.0;

    WorkingCapital {
        dso,
        dpo,
        dio,
        ccc: dio + dso - dpo,
        nwc: ar_balance + inv_value - ap_balance,
        ar_balance,
        ap_balance,
        inventory_value: inv_value,
    }
}
