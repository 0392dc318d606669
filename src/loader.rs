//! CSV discovery and loading from the data folder.
//!
//! Tables are addressed by logical stem (`sales_flat`, `ar_invoices`, ...).
//! Discovery tries `stem.csv` exactly, then any `stem*.csv` or
//! `Stem*.csv`. Optional tables simply come back as `None` when no file
//! matches; only the order lines are required.

use crate::error::{CockpitError, Result};
use crate::schema::{
    BudgetLine, CostTable, GlTransaction, InventorySnapshot, Invoice, LedgerSide, OrderLine,
};
use crate::source::DataSource;
use crate::table::{coerce_date, month_start, RawTable};
use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Environment variable naming the data folder.
pub const DATA_FOLDER_ENV: &str = "COCKPIT_DATA";

/// Locate the file backing a logical stem, if any.
pub fn find_path(folder: &Path, stem: &str) -> Option<PathBuf> {
    let exact = folder.join(format!("{stem}.csv"));
    if exact.exists() {
        return Some(exact);
    }

    let mut capitalized = stem.to_string();
    if let Some(first) = capitalized.get_mut(0..1) {
        first.make_ascii_uppercase();
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    let entries = std::fs::read_dir(folder).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".csv") {
            continue;
        }
        if name.starts_with(stem) || name.starts_with(&capitalized) {
            candidates.push(path);
        }
    }
    candidates.sort();
    candidates.into_iter().next()
}

/// Read a table by stem. `Ok(None)` when no file matches.
pub fn read_table(folder: &Path, stem: &str) -> Result<Option<RawTable>> {
    let Some(path) = find_path(folder, stem) else {
        debug!("no file found for stem '{}'", stem);
        return Ok(None);
    };
    info!("loading '{}' from {}", stem, path.display());
    let file = File::open(&path)?;
    Ok(Some(RawTable::from_csv_reader(file)?))
}

fn require_column(table: &RawTable, stem: &str, column: &str) -> Result<()> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(CockpitError::MissingColumn {
            table: stem.to_string(),
            column: column.to_string(),
        })
    }
}

fn lines_from_flat(mut table: RawTable) -> Result<Vec<OrderLine>> {
    require_column(&table, "sales_flat", "order_date")?;
    table.normalize(&["order_date", "delivery_date"], &["quantity", "unit_price"]);

    let mut lines = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        lines.push(OrderLine {
            order_id: table.get_str(row, "order_id").unwrap_or_default().to_string(),
            product_id: table.get_str(row, "product_id").unwrap_or_default().to_string(),
            customer_id: table.get_str(row, "customer_id").unwrap_or_default().to_string(),
            channel_id: table.get_str(row, "channel_id").unwrap_or_default().to_string(),
            order_date: table.get_date(row, "order_date"),
            quantity: table.get_number(row, "quantity"),
            unit_price: table.get_number(row, "unit_price"),
            category: table.get_str(row, "category").map(str::to_string),
            country: table.get_str(row, "country").map(str::to_string),
            channel_name: table.get_str(row, "channel_name").map(str::to_string),
            status: table.get_str(row, "status").map(str::to_string),
        });
    }
    Ok(lines)
}

/// Single-column lookup (id → value) from a dimension table.
fn lookup(table: &RawTable, key: &str, value: &str) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(table.len());
    for row in 0..table.len() {
        if let (Some(k), Some(v)) = (table.get_str(row, key), table.get_str(row, value)) {
            map.insert(k.to_string(), v.to_string());
        }
    }
    map
}

fn lines_from_atomic(folder: &Path) -> Result<Vec<OrderLine>> {
    const ATOMIC_STEMS: [&str; 6] = [
        "orders",
        "order_items",
        "customers",
        "channels",
        "products",
        "brands",
    ];

    let mut tables = HashMap::new();
    let mut missing = Vec::new();
    for stem in ATOMIC_STEMS {
        match read_table(folder, stem)? {
            Some(table) => {
                tables.insert(stem, table);
            }
            None => missing.push(stem),
        }
    }
    if !missing.is_empty() {
        return Err(CockpitError::MissingData(missing.join(", ")));
    }

    let mut orders = tables.remove("orders").unwrap_or_default();
    orders.normalize(&["order_date", "delivery_date"], &[]);
    let mut items = tables.remove("order_items").unwrap_or_default();
    items.normalize(&[], &["quantity", "unit_price"]);

    let countries = lookup(&tables["customers"], "customer_id", "country");
    let channel_names = lookup(&tables["channels"], "channel_id", "channel_name");
    let categories = lookup(&tables["products"], "product_id", "category");

    // Per-order header fields, keyed for the item join.
    struct OrderHeader {
        customer_id: String,
        channel_id: String,
        order_date: Option<chrono::NaiveDate>,
        status: Option<String>,
    }
    let mut headers: HashMap<String, OrderHeader> = HashMap::with_capacity(orders.len());
    for row in 0..orders.len() {
        let Some(order_id) = orders.get_str(row, "order_id") else {
            continue;
        };
        headers.insert(
            order_id.to_string(),
            OrderHeader {
                customer_id: orders.get_str(row, "customer_id").unwrap_or_default().to_string(),
                channel_id: orders.get_str(row, "channel_id").unwrap_or_default().to_string(),
                order_date: orders.get_date(row, "order_date"),
                status: orders.get_str(row, "status").map(str::to_string),
            },
        );
    }

    let mut lines = Vec::with_capacity(items.len());
    for row in 0..items.len() {
        let order_id = items.get_str(row, "order_id").unwrap_or_default().to_string();
        let product_id = items.get_str(row, "product_id").unwrap_or_default().to_string();
        let header = headers.get(&order_id);

        let customer_id = header.map(|h| h.customer_id.clone()).unwrap_or_default();
        let channel_id = header.map(|h| h.channel_id.clone()).unwrap_or_default();

        lines.push(OrderLine {
            order_date: header.and_then(|h| h.order_date),
            status: header.and_then(|h| h.status.clone()),
            country: countries.get(&customer_id).cloned(),
            channel_name: channel_names.get(&channel_id).cloned(),
            category: categories.get(&product_id).cloned(),
            quantity: items.get_number(row, "quantity"),
            unit_price: items.get_number(row, "unit_price"),
            order_id,
            product_id,
            customer_id,
            channel_id,
        });
    }
    Ok(lines)
}

/// Load order lines: `sales_flat` when present, otherwise the atomic
/// tables joined. Neither available is a reported configuration error.
pub fn load_order_lines(folder: &Path) -> Result<Vec<OrderLine>> {
    match read_table(folder, "sales_flat")? {
        Some(table) => lines_from_flat(table),
        None => lines_from_atomic(folder),
    }
}

pub fn load_invoices(folder: &Path, side: LedgerSide) -> Result<Option<Vec<Invoice>>> {
    let stem = match side {
        LedgerSide::Receivable => "ar_invoices",
        LedgerSide::Payable => "ap_invoices",
    };
    let Some(mut table) = read_table(folder, stem)? else {
        return Ok(None);
    };
    table.normalize(
        &["invoice_date", "due_date", "paid_date"],
        &["amount", "paid_amount"],
    );

    let counterparty = side.counterparty_column();
    let mut invoices = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        invoices.push(Invoice {
            invoice_id: table.get_str(row, "invoice_id").unwrap_or_default().to_string(),
            counterparty_id: table.get_str(row, counterparty).unwrap_or_default().to_string(),
            invoice_date: table.get_date(row, "invoice_date"),
            due_date: table.get_date(row, "due_date"),
            amount: table.get_number(row, "amount"),
            paid_amount: table.get_number(row, "paid_amount"),
        });
    }
    Ok(Some(invoices))
}

pub fn load_product_costs(folder: &Path) -> Result<Option<CostTable>> {
    let Some(table) = read_table(folder, "product_costs")? else {
        return Ok(None);
    };
    let mut costs = CostTable::new();
    for row in 0..table.len() {
        let Some(product_id) = table.get_str(row, "product_id") else {
            continue;
        };
        // Blank cells stay missing so the category heuristic can fire;
        // coercing them to 0.0 would claim an explicit zero cost.
        if let Some(raw) = table.get_str(row, "unit_cost") {
            if let Ok(cost) = raw.trim().replace(',', "").parse::<f64>() {
                if cost.is_finite() {
                    costs.insert(product_id, cost);
                }
            }
        }
    }
    Ok(Some(costs))
}

pub fn load_inventory(folder: &Path) -> Result<Option<Vec<InventorySnapshot>>> {
    let Some(mut table) = read_table(folder, "inventory")? else {
        return Ok(None);
    };
    table.normalize(&[], &["on_hand"]);
    let mut snapshots = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let Some(product_id) = table.get_str(row, "product_id") else {
            continue;
        };
        snapshots.push(InventorySnapshot {
            product_id: product_id.to_string(),
            on_hand: table.get_number(row, "on_hand"),
        });
    }
    Ok(Some(snapshots))
}

/// Budget months may arrive as full dates or as `YYYY-MM`.
fn coerce_month(raw: &str) -> Option<chrono::NaiveDate> {
    coerce_date(raw)
        .or_else(|| coerce_date(&format!("{}-01", raw.trim())))
        .map(month_start)
}

pub fn load_budget(folder: &Path) -> Result<Option<Vec<BudgetLine>>> {
    let Some(mut table) = read_table(folder, "budget")? else {
        return Ok(None);
    };
    table.normalize(&[], &["amount"]);
    let mut budget = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        budget.push(BudgetLine {
            month: table.get_str(row, "month").and_then(coerce_month),
            account: table.get_str(row, "account").unwrap_or_default().to_string(),
            amount: table.get_number(row, "amount"),
        });
    }
    Ok(Some(budget))
}

pub fn load_gl_transactions(folder: &Path) -> Result<Option<Vec<GlTransaction>>> {
    let Some(mut table) = read_table(folder, "gl_txn")? else {
        return Ok(None);
    };
    table.normalize(&["date"], &["amount"]);
    let mut transactions = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        transactions.push(GlTransaction {
            date: table.get_date(row, "date"),
            account: table.get_str(row, "account").unwrap_or_default().to_string(),
            amount: table.get_number(row, "amount"),
        });
    }
    Ok(Some(transactions))
}

/// Data source backed by a folder of CSV files. Stateless: every call
/// re-reads from disk so concurrent computations share nothing mutable.
#[derive(Debug, Clone)]
pub struct FolderDataSource {
    folder: PathBuf,
}

impl FolderDataSource {
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        if !folder.is_dir() {
            return Err(CockpitError::Config(format!(
                "data folder '{}' does not exist",
                folder.display()
            )));
        }
        Ok(Self { folder })
    }

    /// Resolve the folder from the `COCKPIT_DATA` environment variable.
    pub fn from_env() -> Result<Self> {
        let folder = std::env::var(DATA_FOLDER_ENV)
            .map_err(|_| CockpitError::Config(format!("{DATA_FOLDER_ENV} is not set")))?;
        Self::new(folder)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl DataSource for FolderDataSource {
    fn order_lines(&self) -> Result<Vec<OrderLine>> {
        load_order_lines(&self.folder)
    }

    fn product_costs(&self) -> Result<Option<CostTable>> {
        load_product_costs(&self.folder)
    }

    fn inventory(&self) -> Result<Option<Vec<InventorySnapshot>>> {
        load_inventory(&self.folder)
    }

    fn invoices(&self, side: LedgerSide) -> Result<Option<Vec<Invoice>>> {
        load_invoices(&self.folder, side)
    }

    fn budget(&self) -> Result<Option<Vec<BudgetLine>>> {
        load_budget(&self.folder)
    }

    fn gl_transactions(&self) -> Result<Option<Vec<GlTransaction>>> {
        load_gl_transactions(&self.folder)
    }
}
