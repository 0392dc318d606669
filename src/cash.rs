//! 13-week rolling cash forecast.
//!
//! Open AR lands as receipts and open AP as payments in the Monday-anchored
//! week containing each invoice's due date. Invoices due outside the
//! horizon are excluded — they are neither pulled forward nor carried back.

use crate::schema::{CashWeek, Invoice};
use chrono::{Datelike, Duration, NaiveDate};

/// Number of weekly buckets in the forecast horizon.
pub const FORECAST_WEEKS: usize = 13;

/// Monday of the week containing `date`.
pub fn week_anchor(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Build the 13-week cash plan starting from the week containing `today`.
///
/// Returns an empty vector when both AR and AP are absent: with no invoice
/// data the forecast is undefined, and fabricating a flat zero line would
/// hide that from the caller. `cash` is the running balance
/// `starting_cash + Σ net` in strict week order.
pub fn cash_forecast_13w(
    ar: Option<&[Invoice]>,
    ap: Option<&[Invoice]>,
    starting_cash: f64,
    today: NaiveDate,
) -> Vec<CashWeek> {
    if ar.is_none() && ap.is_none() {
        return Vec::new();
    }

    let start = week_anchor(today);
    let horizon_end = start + Duration::weeks(FORECAST_WEEKS as i64);

    let mut receipts = vec![0.0; FORECAST_WEEKS];
    let mut payments = vec![0.0; FORECAST_WEEKS];

    let bucket = |totals: &mut [f64], invoices: &[Invoice]| {
        for invoice in invoices {
            let Some(due) = invoice.due_date else {
                continue;
            };
            if due < start || due >= horizon_end {
                continue;
            }
            let index = ((due - start).num_days() / 7) as usize;
            totals[index] += invoice.open_amount();
        }
    };

    if let Some(rows) = ar {
        bucket(&mut receipts, rows);
    }
    if let Some(rows) = ap {
        bucket(&mut payments, rows);
    }

    let mut cash = starting_cash;
    (0..FORECAST_WEEKS)
        .map(|i| {
            let net = receipts[i] - payments[i];
            cash += net;
            CashWeek {
                week_start: start + Duration::weeks(i as i64),
                receipts: receipts[i],
                payments: payments[i],
                net,
                cash,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(due: Option<NaiveDate>, amount: f64, paid: f64) -> Invoice {
        Invoice {
            due_date: due,
            amount,
            paid_amount: paid,
            ..Default::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_anchor_is_monday() {
        // 2025-06-18 is a Wednesday; its week starts Monday 2025-06-16.
        assert_eq!(week_anchor(date(2025, 6, 18)), date(2025, 6, 16));
        assert_eq!(week_anchor(date(2025, 6, 16)), date(2025, 6, 16));
        assert_eq!(week_anchor(date(2025, 6, 22)), date(2025, 6, 16));
    }

    #[test]
    fn test_no_data_yields_empty_forecast() {
        assert!(cash_forecast_13w(None, None, 1000.0, date(2025, 6, 18)).is_empty());
    }

    #[test]
    fn test_one_sided_data_yields_full_horizon() {
        let ar = vec![invoice(Some(date(2025, 6, 20)), 100.0, 0.0)];
        let plan = cash_forecast_13w(Some(&ar), None, 0.0, date(2025, 6, 18));
        assert_eq!(plan.len(), FORECAST_WEEKS);
        assert_eq!(plan[0].receipts, 100.0);
        assert_eq!(plan[0].payments, 0.0);
    }

    #[test]
    fn test_due_dates_bucket_into_containing_week() {
        let today = date(2025, 6, 18);
        let ar = vec![
            invoice(Some(date(2025, 6, 16)), 50.0, 0.0),  // week 0 (Monday)
            invoice(Some(date(2025, 6, 22)), 25.0, 0.0),  // week 0 (Sunday)
            invoice(Some(date(2025, 6, 23)), 40.0, 0.0),  // week 1
            invoice(Some(date(2025, 6, 15)), 999.0, 0.0), // before horizon
            invoice(Some(date(2026, 1, 1)), 999.0, 0.0),  // after horizon
            invoice(None, 999.0, 0.0),                    // unparsable due date
        ];
        let plan = cash_forecast_13w(Some(&ar), None, 0.0, today);
        assert_eq!(plan[0].receipts, 75.0);
        assert_eq!(plan[1].receipts, 40.0);
        let total: f64 = plan.iter().map(|w| w.receipts).sum();
        assert_eq!(total, 115.0);
    }

    #[test]
    fn test_cash_is_prefix_sum_of_net() {
        let today = date(2025, 6, 18);
        let ar = vec![
            invoice(Some(date(2025, 6, 19)), 100.0, 20.0),
            invoice(Some(date(2025, 7, 3)), 60.0, 0.0),
        ];
        let ap = vec![invoice(Some(date(2025, 6, 26)), 30.0, 0.0)];
        let starting_cash = 500.0;
        let plan = cash_forecast_13w(Some(&ar), Some(&ap), starting_cash, today);

        let mut running = starting_cash;
        for week in &plan {
            assert_eq!(week.net, week.receipts - week.payments);
            running += week.net;
            assert!((week.cash - running).abs() < 1e-9);
        }
        assert_eq!(plan.last().unwrap().cash, 500.0 + 80.0 + 60.0 - 30.0);
    }

    #[test]
    fn test_weeks_are_consecutive() {
        let ap = vec![invoice(Some(date(2025, 6, 26)), 30.0, 0.0)];
        let plan = cash_forecast_13w(None, Some(&ap), 0.0, date(2025, 6, 18));
        for pair in plan.windows(2) {
            assert_eq!(pair[1].week_start - pair[0].week_start, Duration::weeks(1));
        }
    }
}
