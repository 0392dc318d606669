use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One sales order line, either read from `sales_flat` or assembled by
/// joining the atomic tables (orders, order_items, customers, channels,
/// products, brands).
///
/// `order_date` is `None` when the source value could not be parsed; such
/// lines are excluded from any month grouping but still count toward
/// unfiltered totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: String,
    pub product_id: String,
    pub customer_id: String,
    pub channel_id: String,
    pub order_date: Option<NaiveDate>,
    pub quantity: f64,
    pub unit_price: f64,
    /// Product category, drives the cost-factor heuristic.
    pub category: Option<String>,
    pub country: Option<String>,
    pub channel_name: Option<String>,
    pub status: Option<String>,
}

impl OrderLine {
    pub fn extended_price(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// Explicit per-product unit costs. Overrides the category heuristic when a
/// product is present with a finite cost.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostTable {
    costs: BTreeMap<String, f64>,
}

impl CostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product_id: impl Into<String>, unit_cost: f64) {
        self.costs.insert(product_id.into(), unit_cost);
    }

    pub fn unit_cost(&self, product_id: &str) -> Option<f64> {
        self.costs.get(product_id).copied().filter(|c| c.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

impl FromIterator<(String, f64)> for CostTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            costs: iter.into_iter().collect(),
        }
    }
}

/// Which side of the ledger an invoice table belongs to. AR and AP rows are
/// structurally identical; only the counterparty meaning differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerSide {
    Receivable,
    Payable,
}

impl LedgerSide {
    /// Counterparty column name in the source file.
    pub fn counterparty_column(&self) -> &'static str {
        match self {
            LedgerSide::Receivable => "customer_id",
            LedgerSide::Payable => "vendor_id",
        }
    }
}

/// An open or settled invoice (AR or AP).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub counterparty_id: String,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub amount: f64,
    /// Defaults to 0.0 when the column is absent from the source file.
    pub paid_amount: f64,
}

impl Invoice {
    pub fn open_amount(&self) -> f64 {
        self.amount - self.paid_amount
    }
}

/// Point-in-time stock level for one product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub product_id: String,
    pub on_hand: f64,
}

/// One budget row. `account` is matched by case-insensitive substring:
/// "rev" selects revenue lines, "opex" selects operating-expense lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetLine {
    pub month: Option<NaiveDate>,
    pub account: String,
    pub amount: f64,
}

/// General-ledger transaction. Negative amounts are expenses; accounts
/// matching Sales/Revenue/Income feed the dashboard revenue fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlTransaction {
    pub date: Option<NaiveDate>,
    pub account: String,
    pub amount: f64,
}

/// One weekly bucket of the 13-week cash plan. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashWeek {
    pub week_start: NaiveDate,
    pub receipts: f64,
    pub payments: f64,
    pub net: f64,
    /// Running balance: starting cash plus cumulative net through this week.
    pub cash: f64,
}
