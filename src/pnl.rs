//! Revenue/COGS estimation and the monthly P&L series.
//!
//! Per-line cost resolution is an ordered fallback chain: explicit unit
//! cost from the cost table, then the category cost factor, then the
//! default factor. Each estimate carries a [`CostBasis`] naming which
//! strategy fired.

use crate::schema::{BudgetLine, CostTable, OrderLine};
use crate::table::month_start;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cost factor applied to unit price per product category.
pub const CATEGORY_COST_FACTORS: &[(&str, f64)] = &[
    ("FMCG-Food", 0.70),
    ("FMCG-Non-Food", 0.65),
    ("Chemical", 0.85),
    ("Pharma", 0.60),
];

/// Factor for unknown or missing categories.
pub const DEFAULT_COST_FACTOR: f64 = 0.70;

/// Opex assumption when no budget opex lines exist for a month.
pub const OPEX_REVENUE_SHARE: f64 = 0.20;

/// Which strategy produced a unit-cost estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostBasis {
    /// Non-missing unit cost found in the cost table.
    ExplicitUnitCost,
    /// Unit price scaled by the line's category factor.
    CategoryFactor,
    /// Unit price scaled by the default factor (unknown category).
    DefaultFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatedCost {
    pub value: f64,
    pub basis: CostBasis,
}

pub fn category_cost_factor(category: Option<&str>) -> Option<f64> {
    let category = category?;
    CATEGORY_COST_FACTORS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, factor)| *factor)
}

/// Estimate the unit cost for one order line.
pub fn estimate_unit_cost(line: &OrderLine, costs: Option<&CostTable>) -> EstimatedCost {
    if let Some(unit_cost) = costs.and_then(|c| c.unit_cost(&line.product_id)) {
        return EstimatedCost {
            value: unit_cost,
            basis: CostBasis::ExplicitUnitCost,
        };
    }
    match category_cost_factor(line.category.as_deref()) {
        Some(factor) => EstimatedCost {
            value: line.unit_price * factor,
            basis: CostBasis::CategoryFactor,
        },
        None => EstimatedCost {
            value: line.unit_price * DEFAULT_COST_FACTOR,
            basis: CostBasis::DefaultFactor,
        },
    }
}

/// One month of the base P&L. `month` is the first-of-month timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPnl {
    pub month: NaiveDate,
    pub net_revenue: f64,
    pub cogs: f64,
    pub gm: f64,
    pub gm_pct: f64,
}

/// Group lines by calendar month and sum revenue and estimated COGS.
/// Lines with no parsable order date are excluded. `gm_pct` is 0 when a
/// month has zero revenue; a zero denominator is never an error.
pub fn monthly_pnl(lines: &[OrderLine], costs: Option<&CostTable>) -> Vec<MonthlyPnl> {
    let mut months: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

    for line in lines {
        let Some(date) = line.order_date else {
            continue;
        };
        let entry = months.entry(month_start(date)).or_insert((0.0, 0.0));
        entry.0 += line.extended_price();
        entry.1 += line.quantity * estimate_unit_cost(line, costs).value;
    }

    months
        .into_iter()
        .map(|(month, (net_revenue, cogs))| {
            let gm = net_revenue - cogs;
            let gm_pct = if net_revenue != 0.0 {
                gm / net_revenue * 100.0
            } else {
                0.0
            };
            MonthlyPnl {
                month,
                net_revenue,
                cogs,
                gm,
                gm_pct,
            }
        })
        .collect()
}

/// Which strategy supplied a month's opex figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpexBasis {
    /// Summed from budget lines whose account matches "opex".
    Budget,
    /// Assumed as a fixed share of net revenue.
    RevenueShare,
}

/// Monthly P&L enriched with budget revenue and opex/EBITDA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFigures {
    pub month: NaiveDate,
    pub net_revenue: f64,
    pub budget_revenue: Option<f64>,
    pub cogs: f64,
    pub gm: f64,
    pub gm_pct: f64,
    pub opex: f64,
    pub opex_basis: OpexBasis,
    pub ebitda: f64,
    pub ebitda_pct: f64,
}

/// Sum budget amounts per month for accounts containing `needle`
/// (case-insensitive substring, matching the source data's loose account
/// naming: "Revenue", "rev_export", "Opex - Logistics", ...).
pub fn budget_by_month(budget: &[BudgetLine], needle: &str) -> BTreeMap<NaiveDate, f64> {
    let needle = needle.to_lowercase();
    let mut months: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for line in budget {
        let Some(month) = line.month else { continue };
        if line.account.to_lowercase().contains(&needle) {
            *months.entry(month_start(month)).or_insert(0.0) += line.amount;
        }
    }
    months
}

/// Build the enriched monthly series: base P&L plus budget revenue and the
/// opex/EBITDA columns, opex resolved per month through the budget →
/// revenue-share fallback chain.
pub fn monthly_figures(
    lines: &[OrderLine],
    costs: Option<&CostTable>,
    budget: Option<&[BudgetLine]>,
) -> Vec<MonthlyFigures> {
    let opex_budget = budget.map(|b| budget_by_month(b, "opex")).unwrap_or_default();
    let revenue_budget = budget.map(|b| budget_by_month(b, "rev")).unwrap_or_default();

    monthly_pnl(lines, costs)
        .into_iter()
        .map(|row| {
            let (opex, opex_basis) = match opex_budget.get(&row.month) {
                Some(amount) => (*amount, OpexBasis::Budget),
                None => (row.net_revenue * OPEX_REVENUE_SHARE, OpexBasis::RevenueShare),
            };
            let ebitda = row.gm - opex;
            let ebitda_pct = if row.net_revenue > 0.0 {
                ebitda / row.net_revenue * 100.0
            } else {
                0.0
            };
            MonthlyFigures {
                month: row.month,
                net_revenue: row.net_revenue,
                budget_revenue: revenue_budget.get(&row.month).copied(),
                cogs: row.cogs,
                gm: row.gm,
                gm_pct: row.gm_pct,
                opex,
                opex_basis,
                ebitda,
                ebitda_pct,
            }
        })
        .collect()
}
