//! Conjunctive row filtering and available-filter-value extraction.
//!
//! Every metrics operation accepts an optional [`RowFilter`]; all populated
//! criteria must match (AND). Set criteria apply only where the row carries
//! the dimension — an order line without a country passes no country filter
//! but fails a populated one, matching the source data's column-presence
//! semantics.

use crate::schema::{Invoice, OrderLine};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Row filter applied before any aggregation. Empty sets mean
/// "no constraint"; the date range is inclusive on both ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowFilter {
    pub countries: Vec<String>,
    pub channels: Vec<String>,
    pub statuses: Vec<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

impl RowFilter {
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
            && self.channels.is_empty()
            && self.statuses.is_empty()
            && self.date_start.is_none()
            && self.date_end.is_none()
    }

    fn date_in_range(&self, date: Option<NaiveDate>) -> bool {
        match (self.date_start, self.date_end) {
            (None, None) => true,
            _ => match date {
                None => false,
                Some(d) => {
                    self.date_start.map_or(true, |s| d >= s)
                        && self.date_end.map_or(true, |e| d <= e)
                }
            },
        }
    }

    fn set_matches(allowed: &[String], value: Option<&str>) -> bool {
        if allowed.is_empty() {
            return true;
        }
        match value {
            Some(v) => allowed.iter().any(|a| a == v),
            None => false,
        }
    }

    pub fn matches_line(&self, line: &OrderLine) -> bool {
        Self::set_matches(&self.countries, line.country.as_deref())
            && Self::set_matches(&self.channels, line.channel_name.as_deref())
            && Self::set_matches(&self.statuses, line.status.as_deref())
            && self.date_in_range(line.order_date)
    }

    /// Invoices carry no country/channel/status dimensions, so only the
    /// date range applies, keyed on the invoice date.
    pub fn matches_invoice(&self, invoice: &Invoice) -> bool {
        self.date_in_range(invoice.invoice_date)
    }

    pub fn apply_lines(&self, lines: &[OrderLine]) -> Vec<OrderLine> {
        lines
            .iter()
            .filter(|l| self.matches_line(l))
            .cloned()
            .collect()
    }

    pub fn apply_invoices(&self, invoices: &[Invoice]) -> Vec<Invoice> {
        invoices
            .iter()
            .filter(|i| self.matches_invoice(i))
            .cloned()
            .collect()
    }
}

/// Distinct filter values present in the data, sorted, for populating a
/// presentation layer's filter controls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    pub countries: Vec<String>,
    pub channels: Vec<String>,
    pub statuses: Vec<String>,
}

pub fn filter_options(lines: &[OrderLine]) -> FilterOptions {
    let mut countries = BTreeSet::new();
    let mut channels = BTreeSet::new();
    let mut statuses = BTreeSet::new();

    for line in lines {
        if let Some(c) = &line.country {
            countries.insert(c.clone());
        }
        if let Some(c) = &line.channel_name {
            channels.insert(c.clone());
        }
        if let Some(s) = &line.status {
            statuses.insert(s.clone());
        }
    }

    FilterOptions {
        countries: countries.into_iter().collect(),
        channels: channels.into_iter().collect(),
        statuses: statuses.into_iter().collect(),
    }
}
