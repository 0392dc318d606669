//! The metrics API surface: a [`Cockpit`] over any [`DataSource`].
//!
//! Every operation re-reads from the source and recomputes from scratch,
//! so the cockpit holds no mutable state and can be shared freely. One
//! broken optional table never blocks an unrelated metric.

use crate::aging::{aging_buckets, top_overdue, AgingBucket, OverdueInvoice};
use crate::bridge::{revenue_bridge, RevenueBridge};
use crate::cash::cash_forecast_13w;
use crate::error::{CockpitError, Result};
use crate::filter::{filter_options, FilterOptions, RowFilter};
use crate::pnl::{monthly_figures, MonthlyFigures};
use crate::schema::{CashWeek, GlTransaction, Invoice, LedgerSide, OrderLine};
use crate::source::DataSource;
use crate::table::month_start;
use crate::working_capital::{wc_metrics, WorkingCapital, DEFAULT_TRAILING_DAYS};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which table ultimately supplied the dashboard revenue figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevenueSource {
    SalesLines,
    ArInvoices,
    GlRevenue,
}

/// Headline totals for the landing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub revenue: f64,
    pub revenue_source: RevenueSource,
    pub expenses: f64,
    pub net_profit: f64,
    pub net_margin_pct: f64,
    pub budget_total: f64,
    pub ar_total: f64,
    pub ap_total: f64,
    /// Paid share of invoiced AR, as a percentage.
    pub collection_rate: f64,
}

/// Labeled figures handed to the commentary generator. The [`fmt::Display`]
/// rendering is deterministic so prompts are reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentaryContext {
    pub as_of: NaiveDate,
    pub ytd_revenue: f64,
    pub gm_pct: f64,
    pub ebitda_pct: f64,
    pub working_capital: WorkingCapital,
    /// Latest month's actual minus budget revenue, when a budget exists.
    pub budget_variance: Option<f64>,
    /// Lowest projected cash balance across the forecast horizon.
    pub min_cash_week: Option<CashWeek>,
}

impl fmt::Display for CommentaryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "As of: {}", self.as_of)?;
        writeln!(f, "YTD revenue: {:.2}", self.ytd_revenue)?;
        writeln!(f, "Gross margin: {:.1}%", self.gm_pct)?;
        writeln!(f, "EBITDA margin: {:.1}%", self.ebitda_pct)?;
        let wc = &self.working_capital;
        writeln!(
            f,
            "DSO: {:.1} days, DPO: {:.1} days, DIO: {:.1} days, CCC: {:.1} days",
            wc.dso, wc.dpo, wc.dio, wc.ccc
        )?;
        writeln!(f, "Net working capital: {:.2}", wc.nwc)?;
        match self.budget_variance {
            Some(variance) => writeln!(f, "Latest month vs budget: {variance:+.2}")?,
            None => writeln!(f, "Latest month vs budget: n/a")?,
        }
        match &self.min_cash_week {
            Some(week) => writeln!(
                f,
                "Lowest forecast cash: {:.2} in week of {}",
                week.cash, week.week_start
            )?,
            None => writeln!(f, "Lowest forecast cash: n/a")?,
        }
        Ok(())
    }
}

/// Stateless metrics engine over a [`DataSource`].
#[derive(Debug, Clone)]
pub struct Cockpit<S: DataSource> {
    source: S,
}

impl<S: DataSource> Cockpit<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Filtered order lines, or `None` when the source has no sales data
    /// at all. Other errors still propagate.
    fn lines_if_present(&self, filter: &RowFilter) -> Result<Option<Vec<OrderLine>>> {
        match self.source.order_lines() {
            Ok(lines) => Ok(Some(filter.apply_lines(&lines))),
            Err(CockpitError::MissingData(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn lines(&self, filter: &RowFilter) -> Result<Vec<OrderLine>> {
        Ok(filter.apply_lines(&self.source.order_lines()?))
    }

    fn invoices(&self, side: LedgerSide, filter: &RowFilter) -> Result<Option<Vec<Invoice>>> {
        Ok(self
            .source
            .invoices(side)?
            .map(|invoices| filter.apply_invoices(&invoices)))
    }

    fn gl_in_range(&self, filter: &RowFilter) -> Result<Option<Vec<GlTransaction>>> {
        let Some(transactions) = self.source.gl_transactions()? else {
            return Ok(None);
        };
        let has_range = filter.date_start.is_some() || filter.date_end.is_some();
        let kept = transactions
            .into_iter()
            .filter(|txn| match txn.date {
                Some(date) => {
                    filter.date_start.map_or(true, |start| date >= start)
                        && filter.date_end.map_or(true, |end| date <= end)
                }
                None => !has_range,
            })
            .collect();
        Ok(Some(kept))
    }

    /// Headline totals. Revenue resolves through an ordered fallback:
    /// sales lines, then AR invoice amounts, then GL revenue accounts.
    pub fn dashboard(&self, filter: &RowFilter) -> Result<DashboardSummary> {
        let lines = self.lines_if_present(filter)?;
        let ar = self.invoices(LedgerSide::Receivable, filter)?;
        let ap = self.invoices(LedgerSide::Payable, filter)?;
        let gl = self.gl_in_range(filter)?;

        let (revenue, revenue_source) = if let Some(lines) = lines.filter(|l| !l.is_empty()) {
            let total = lines.iter().map(OrderLine::extended_price).sum();
            (total, RevenueSource::SalesLines)
        } else if let Some(ar) = ar.as_deref().filter(|a| !a.is_empty()) {
            let total = ar.iter().map(|invoice| invoice.amount).sum();
            (total, RevenueSource::ArInvoices)
        } else if let Some(gl) = gl.as_deref() {
            // Revenue accounts may be credit-signed; the magnitude is the
            // revenue either way.
            let total: f64 = gl
                .iter()
                .filter(|txn| is_revenue_account(&txn.account))
                .map(|txn| txn.amount)
                .sum();
            (total.abs(), RevenueSource::GlRevenue)
        } else {
            return Err(CockpitError::MissingData(
                "no sales lines, AR invoices or GL transactions".to_string(),
            ));
        };
        debug!("dashboard revenue {:.2} via {:?}", revenue, revenue_source);

        let expenses: f64 = gl
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|txn| txn.amount < 0.0)
            .map(|txn| txn.amount.abs())
            .sum();
        let net_profit = revenue - expenses;
        let net_margin_pct = if revenue != 0.0 {
            net_profit / revenue * 100.0
        } else {
            0.0
        };

        let budget_total = self
            .source
            .budget()?
            .unwrap_or_default()
            .iter()
            .map(|line| line.amount)
            .sum();

        let ar_total = open_total(ar.as_deref());
        let ap_total = open_total(ap.as_deref());
        let (invoiced, collected) = ar.as_deref().unwrap_or_default().iter().fold(
            (0.0, 0.0),
            |(invoiced, collected), invoice| {
                (invoiced + invoice.amount, collected + invoice.paid_amount)
            },
        );
        let collection_rate = if invoiced != 0.0 {
            collected / invoiced * 100.0
        } else {
            0.0
        };

        Ok(DashboardSummary {
            revenue,
            revenue_source,
            expenses,
            net_profit,
            net_margin_pct,
            budget_total,
            ar_total,
            ap_total,
            collection_rate,
        })
    }

    /// Per-month revenue, margins, opex and EBITDA.
    pub fn monthly_series(&self, filter: &RowFilter) -> Result<Vec<MonthlyFigures>> {
        let lines = self.lines(filter)?;
        let costs = self.source.product_costs()?;
        let budget = self.source.budget()?;
        Ok(monthly_figures(&lines, costs.as_ref(), budget.as_deref()))
    }

    pub fn working_capital(
        &self,
        filter: &RowFilter,
        trailing_days: Option<i64>,
    ) -> Result<WorkingCapital> {
        let lines = self.lines(filter)?;
        let ar = self.invoices(LedgerSide::Receivable, filter)?;
        let ap = self.invoices(LedgerSide::Payable, filter)?;
        let inventory = self.source.inventory()?;
        let costs = self.source.product_costs()?;
        Ok(wc_metrics(
            &lines,
            ar.as_deref(),
            ap.as_deref(),
            inventory.as_deref(),
            costs.as_ref(),
            trailing_days.unwrap_or(DEFAULT_TRAILING_DAYS),
        ))
    }

    pub fn cash_plan(
        &self,
        filter: &RowFilter,
        starting_cash: f64,
        today: NaiveDate,
    ) -> Result<Vec<CashWeek>> {
        let ar = self.invoices(LedgerSide::Receivable, filter)?;
        let ap = self.invoices(LedgerSide::Payable, filter)?;
        Ok(cash_forecast_13w(
            ar.as_deref(),
            ap.as_deref(),
            starting_cash,
            today,
        ))
    }

    pub fn aging(
        &self,
        side: LedgerSide,
        filter: &RowFilter,
        today: NaiveDate,
    ) -> Result<Vec<AgingBucket>> {
        let invoices = self.invoices(side, filter)?.unwrap_or_default();
        Ok(aging_buckets(&invoices, today))
    }

    pub fn top_overdue(
        &self,
        side: LedgerSide,
        filter: &RowFilter,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<OverdueInvoice>> {
        let invoices = self.invoices(side, filter)?.unwrap_or_default();
        Ok(top_overdue(&invoices, today, limit))
    }

    /// Price/volume/mix decomposition between two calendar months.
    pub fn bridge(
        &self,
        filter: &RowFilter,
        month_a: NaiveDate,
        month_b: NaiveDate,
    ) -> Result<RevenueBridge> {
        let month_a = month_start(month_a);
        let month_b = month_start(month_b);
        let lines = self.lines(filter)?;
        let in_month = |month: NaiveDate| -> Vec<OrderLine> {
            lines
                .iter()
                .filter(|line| line.order_date.map(month_start) == Some(month))
                .cloned()
                .collect()
        };
        revenue_bridge(&in_month(month_a), &in_month(month_b))
    }

    pub fn filter_options(&self) -> Result<FilterOptions> {
        let lines = self.source.order_lines()?;
        Ok(filter_options(&lines))
    }

    /// Assemble the labeled figures the commentary generator consumes.
    pub fn commentary_context(
        &self,
        filter: &RowFilter,
        today: NaiveDate,
    ) -> Result<CommentaryContext> {
        let figures = self.monthly_series(filter)?;
        let working_capital = self.working_capital(filter, None)?;

        let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).ok_or_else(|| {
            CockpitError::InsufficientData(format!("invalid reference date {today}"))
        })?;
        let ytd: Vec<&MonthlyFigures> = figures
            .iter()
            .filter(|figure| figure.month >= year_start && figure.month <= today)
            .collect();
        let ytd_revenue: f64 = ytd.iter().map(|figure| figure.net_revenue).sum();
        let ytd_gm: f64 = ytd.iter().map(|figure| figure.gm).sum();
        let ytd_ebitda: f64 = ytd.iter().map(|figure| figure.ebitda).sum();
        let gm_pct = if ytd_revenue != 0.0 {
            ytd_gm / ytd_revenue * 100.0
        } else {
            0.0
        };
        let ebitda_pct = if ytd_revenue != 0.0 {
            ytd_ebitda / ytd_revenue * 100.0
        } else {
            0.0
        };

        // Variance is always for the latest month; a month without a budget
        // row compares against 0. Only a wholly absent budget table means
        // there is no variance to report.
        let budget_variance = if self.source.budget()?.is_some() {
            figures
                .last()
                .map(|figure| figure.net_revenue - figure.budget_revenue.unwrap_or(0.0))
        } else {
            None
        };

        let forecast = self.cash_plan(filter, 0.0, today)?;
        let min_cash_week = forecast
            .into_iter()
            .min_by(|a, b| a.cash.total_cmp(&b.cash));

        info!("commentary context assembled as of {}", today);
        Ok(CommentaryContext {
            as_of: today,
            ytd_revenue,
            gm_pct,
            ebitda_pct,
            working_capital,
            budget_variance,
            min_cash_week,
        })
    }
}

fn is_revenue_account(account: &str) -> bool {
    let lower = account.to_lowercase();
    ["sales", "revenue", "income"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn open_total(invoices: Option<&[Invoice]>) -> f64 {
    invoices
        .unwrap_or_default()
        .iter()
        .map(Invoice::open_amount)
        .sum()
}
