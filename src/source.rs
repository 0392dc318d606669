//! Capability abstraction over where tables come from.
//!
//! The metrics engine never reads files itself; it consumes a
//! [`DataSource`]. Production code uses the folder-backed implementation
//! in [`crate::loader`]; tests and demos use [`FixtureDataSource`] with
//! synthetic rows. That keeps the engine pure and the data-availability
//! policy in one place.

use crate::error::{CockpitError, Result};
use crate::schema::{
    BudgetLine, CostTable, GlTransaction, InventorySnapshot, Invoice, LedgerSide, OrderLine,
};

/// Supplies typed tables for one computation. Optional tables return
/// `Ok(None)` when absent; the required order-line table reports a
/// missing-data error instead.
pub trait DataSource {
    /// Sales order lines. Required: absence is a configuration problem.
    fn order_lines(&self) -> Result<Vec<OrderLine>>;

    fn product_costs(&self) -> Result<Option<CostTable>>;

    fn inventory(&self) -> Result<Option<Vec<InventorySnapshot>>>;

    fn invoices(&self, side: LedgerSide) -> Result<Option<Vec<Invoice>>>;

    fn budget(&self) -> Result<Option<Vec<BudgetLine>>>;

    fn gl_transactions(&self) -> Result<Option<Vec<GlTransaction>>>;
}

/// In-memory data source holding synthetic fixture rows.
#[derive(Debug, Clone, Default)]
pub struct FixtureDataSource {
    pub lines: Vec<OrderLine>,
    pub costs: Option<CostTable>,
    pub inventory: Option<Vec<InventorySnapshot>>,
    pub ar: Option<Vec<Invoice>>,
    pub ap: Option<Vec<Invoice>>,
    pub budget: Option<Vec<BudgetLine>>,
    pub gl: Option<Vec<GlTransaction>>,
}

impl FixtureDataSource {
    pub fn new(lines: Vec<OrderLine>) -> Self {
        Self {
            lines,
            ..Default::default()
        }
    }

    pub fn with_ar(mut self, ar: Vec<Invoice>) -> Self {
        self.ar = Some(ar);
        self
    }

    pub fn with_ap(mut self, ap: Vec<Invoice>) -> Self {
        self.ap = Some(ap);
        self
    }

    pub fn with_costs(mut self, costs: CostTable) -> Self {
        self.costs = Some(costs);
        self
    }

    pub fn with_inventory(mut self, inventory: Vec<InventorySnapshot>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_budget(mut self, budget: Vec<BudgetLine>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_gl(mut self, gl: Vec<GlTransaction>) -> Self {
        self.gl = Some(gl);
        self
    }
}

impl DataSource for FixtureDataSource {
    fn order_lines(&self) -> Result<Vec<OrderLine>> {
        if self.lines.is_empty() {
            return Err(CockpitError::MissingData("sales_flat".to_string()));
        }
        Ok(self.lines.clone())
    }

    fn product_costs(&self) -> Result<Option<CostTable>> {
        Ok(self.costs.clone())
    }

    fn inventory(&self) -> Result<Option<Vec<InventorySnapshot>>> {
        Ok(self.inventory.clone())
    }

    fn invoices(&self, side: LedgerSide) -> Result<Option<Vec<Invoice>>> {
        Ok(match side {
            LedgerSide::Receivable => self.ar.clone(),
            LedgerSide::Payable => self.ap.clone(),
        })
    }

    fn budget(&self) -> Result<Option<Vec<BudgetLine>>> {
        Ok(self.budget.clone())
    }

    fn gl_transactions(&self) -> Result<Option<Vec<GlTransaction>>> {
        Ok(self.gl.clone())
    }
}
