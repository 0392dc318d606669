//! # Finance Cockpit
//!
//! A library for turning a folder of raw commercial CSV exports (orders,
//! invoices, budgets, inventory, GL transactions) into the metrics a CFO
//! dashboard needs: monthly P&L, working capital ratios, a 13-week cash
//! forecast, AR/AP aging, and a price/volume/mix revenue bridge.
//!
//! ## Core Concepts
//!
//! - **DataSource**: where tables come from. [`FolderDataSource`] reads
//!   CSVs from disk; [`FixtureDataSource`] serves in-memory rows.
//! - **Cockpit**: the stateless metrics engine over a `DataSource`.
//!   Every call re-reads and recomputes; nothing is cached.
//! - **RowFilter**: conjunctive country/channel/status/date-range filter
//!   applied before any aggregation.
//! - **Fallback chains**: missing optional data degrades with an explicit
//!   reason code (cost basis, opex basis, revenue source) instead of
//!   failing or silently guessing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use finance_cockpit::*;
//! use chrono::NaiveDate;
//!
//! let source = FolderDataSource::new("./data")?;
//! let cockpit = Cockpit::new(source);
//!
//! let filter = RowFilter::default();
//! let summary = cockpit.dashboard(&filter)?;
//! println!("revenue {:.2} via {:?}", summary.revenue, summary.revenue_source);
//!
//! let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
//! for week in cockpit.cash_plan(&filter, 100_000.0, today)? {
//!     println!("{}: {:.2}", week.week_start, week.cash);
//! }
//! ```

pub mod aging;
pub mod bridge;
pub mod cash;
pub mod error;
pub mod filter;
pub mod loader;
pub mod pnl;
pub mod schema;
pub mod service;
pub mod source;
pub mod table;
pub mod working_capital;

#[cfg(feature = "commentary")]
pub mod commentary;

pub use aging::{aging_buckets, top_overdue, AgingBand, AgingBucket, OverdueInvoice};
pub use bridge::{revenue_bridge, BridgeDetail, RevenueBridge};
pub use cash::{cash_forecast_13w, week_anchor, FORECAST_WEEKS};
pub use error::{CockpitError, Result};
pub use filter::{filter_options, FilterOptions, RowFilter};
pub use loader::FolderDataSource;
pub use pnl::{
    estimate_unit_cost, monthly_figures, monthly_pnl, CostBasis, EstimatedCost, MonthlyFigures,
    MonthlyPnl, OpexBasis,
};
pub use schema::*;
pub use service::{Cockpit, CommentaryContext, DashboardSummary, RevenueSource};
pub use source::{DataSource, FixtureDataSource};
pub use table::{coerce_date, coerce_number, month_start, RawTable};
pub use working_capital::{wc_metrics, WorkingCapital, DEFAULT_TRAILING_DAYS};

#[cfg(feature = "commentary")]
pub use commentary::{CommentaryClient, CommentaryConfig};
