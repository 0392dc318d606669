//! Past-due aging bands and top-overdue invoice lists.

use crate::schema::Invoice;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aging bands in reporting order. Upper bounds are inclusive:
/// 30 days past due falls in `1-30`, 31 days in `31-60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgingBand {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBand {
    pub const ALL: [AgingBand; 5] = [
        AgingBand::Current,
        AgingBand::Days1To30,
        AgingBand::Days31To60,
        AgingBand::Days61To90,
        AgingBand::Over90,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AgingBand::Current => "Current",
            AgingBand::Days1To30 => "1-30",
            AgingBand::Days31To60 => "31-60",
            AgingBand::Days61To90 => "61-90",
            AgingBand::Over90 => "90+",
        }
    }

    /// Band for a number of days past due; zero or negative means the
    /// invoice is not yet due.
    pub fn for_days_past_due(days: i64) -> AgingBand {
        match days {
            d if d <= 0 => AgingBand::Current,
            d if d <= 30 => AgingBand::Days1To30,
            d if d <= 60 => AgingBand::Days31To60,
            d if d <= 90 => AgingBand::Days61To90,
            _ => AgingBand::Over90,
        }
    }
}

/// Open amount aggregated into one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingBucket {
    pub band: AgingBand,
    pub label: String,
    pub open_amount: f64,
}

/// All five bands in fixed order, zero-filled when empty. Invoices with no
/// parsable due date count as Current so the buckets always partition the
/// total open amount.
pub fn aging_buckets(invoices: &[Invoice], today: NaiveDate) -> Vec<AgingBucket> {
    let mut totals = [0.0_f64; 5];

    for invoice in invoices {
        let days = invoice
            .due_date
            .map(|due| (today - due).num_days())
            .unwrap_or(0);
        let band = AgingBand::for_days_past_due(days);
        let index = AgingBand::ALL.iter().position(|b| *b == band).unwrap_or(0);
        totals[index] += invoice.open_amount();
    }

    AgingBand::ALL
        .iter()
        .zip(totals)
        .map(|(band, open_amount)| AgingBucket {
            band: *band,
            label: band.label().to_string(),
            open_amount,
        })
        .collect()
}

/// One row of the top-overdue list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueInvoice {
    pub invoice_id: String,
    pub counterparty_id: String,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub open_amount: f64,
    pub days_past_due: i64,
}

/// Invoices with a positive open amount, sorted most-overdue first
/// (days past due, then open amount, both descending), limited.
pub fn top_overdue(invoices: &[Invoice], today: NaiveDate, limit: usize) -> Vec<OverdueInvoice> {
    let mut rows: Vec<OverdueInvoice> = invoices
        .iter()
        .filter(|i| i.open_amount() > 0.0)
        .map(|i| OverdueInvoice {
            invoice_id: i.invoice_id.clone(),
            counterparty_id: i.counterparty_id.clone(),
            invoice_date: i.invoice_date,
            due_date: i.due_date,
            open_amount: i.open_amount(),
            days_past_due: i.due_date.map(|due| (today - due).num_days()).unwrap_or(0),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.days_past_due
            .cmp(&a.days_past_due)
            .then(b.open_amount.total_cmp(&a.open_amount))
    });
    rows.truncate(limit);
    rows
}
