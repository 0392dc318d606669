//! End-to-end tests: CSV folder in, dashboard metrics out.

use chrono::NaiveDate;
use finance_cockpit::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_file(folder: &Path, name: &str, content: &str) {
    let mut file = File::create(folder.join(name)).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

/// A small but complete data folder: two months of sales across two
/// countries, partial explicit costs, AR/AP, inventory, budget and GL.
fn seed_folder(folder: &Path) {
    write_file(
        folder,
        "sales_flat.csv",
        "order_id,product_id,customer_id,channel_id,order_date,quantity,unit_price,category,country,channel_name,status\n\
         O1,P1,C1,CH1,2025-04-05,10,10,Pharma,UAE,Retail,Delivered\n\
         O2,P2,C2,CH1,2025-04-18,4,25,Chemical,KSA,Retail,Delivered\n\
         O3,P1,C1,CH2,2025-05-07,6,12,Pharma,UAE,Wholesale,Delivered\n\
         O4,P2,C2,CH2,2025-05-21,5,25,Chemical,KSA,Wholesale,Pending\n",
    );
    write_file(folder, "product_costs.csv", "product_id,unit_cost\nP1,5\n");
    write_file(
        folder,
        "ar_invoices.csv",
        "invoice_id,customer_id,invoice_date,due_date,amount,paid_amount\n\
         AR1,C1,2025-04-10,2025-04-18,1000,300\n\
         AR2,C2,2025-05-15,2025-06-20,500,0\n",
    );
    write_file(
        folder,
        "ap_invoices.csv",
        "invoice_id,vendor_id,invoice_date,due_date,amount,paid_amount\n\
         AP1,V1,2025-05-01,2025-06-10,400,0\n",
    );
    write_file(folder, "inventory.csv", "product_id,on_hand\nP1,20\nP2,8\n");
    write_file(
        folder,
        "budget.csv",
        "month,account,amount\n\
         2025-04,Revenue Plan,250\n\
         2025-05,Revenue Plan,200\n\
         2025-04,Opex Plan,30\n",
    );
    write_file(
        folder,
        "gl_txn.csv",
        "date,account,amount\n\
         2025-04-30,Sales Revenue,300\n\
         2025-04-30,Office Rent,-50\n",
    );
}

fn cockpit() -> (tempfile::TempDir, Cockpit<FolderDataSource>) {
    let dir = tempfile::tempdir().unwrap();
    seed_folder(dir.path());
    let source = FolderDataSource::new(dir.path()).unwrap();
    (dir, Cockpit::new(source))
}

#[test]
fn dashboard_from_folder_uses_sales_lines() {
    let (_dir, cockpit) = cockpit();
    let summary = cockpit.dashboard(&RowFilter::default()).unwrap();

    // 100 + 100 + 72 + 125
    assert!((summary.revenue - 397.0).abs() < 1e-9);
    assert_eq!(summary.revenue_source, RevenueSource::SalesLines);
    assert_eq!(summary.expenses, 50.0);
    assert_eq!(summary.ar_total, 1200.0);
    assert_eq!(summary.ap_total, 400.0);
    assert!((summary.collection_rate - 20.0).abs() < 1e-9);
    assert_eq!(summary.budget_total, 480.0);
}

#[test]
fn monthly_series_sums_revenue_and_applies_cost_fallbacks() {
    let (_dir, cockpit) = cockpit();
    let figures = cockpit.monthly_series(&RowFilter::default()).unwrap();
    assert_eq!(figures.len(), 2);

    let april = &figures[0];
    assert_eq!(april.month, date(2025, 4, 1));
    assert!((april.net_revenue - 200.0).abs() < 1e-9);
    // P1 has an explicit cost (10 × 5); P2 falls back to Chemical 0.85
    // (4 × 25 × 0.85 = 85).
    assert!((april.cogs - 135.0).abs() < 1e-9);
    assert!((april.gm - (april.net_revenue - april.cogs)).abs() < 1e-9);
    // April has an opex budget line; May does not and takes 20% of revenue.
    assert_eq!(april.opex_basis, OpexBasis::Budget);
    assert_eq!(april.opex, 30.0);
    assert_eq!(april.budget_revenue, Some(250.0));

    let may = &figures[1];
    assert_eq!(may.opex_basis, OpexBasis::RevenueShare);
    assert!((may.opex - may.net_revenue * 0.20).abs() < 1e-9);
}

#[test]
fn country_filter_restricts_every_metric() {
    let (_dir, cockpit) = cockpit();
    let mut filter = RowFilter::default();
    filter.countries.push("UAE".to_string());

    let figures = cockpit.monthly_series(&filter).unwrap();
    let total: f64 = figures.iter().map(|f| f.net_revenue).sum();
    assert!((total - 172.0).abs() < 1e-9); // O1 + O3 only

    let options = cockpit.filter_options().unwrap();
    assert_eq!(options.countries, vec!["KSA", "UAE"]);
    assert_eq!(options.channels, vec!["Retail", "Wholesale"]);
}

#[test]
fn working_capital_identities_hold() {
    let (_dir, cockpit) = cockpit();
    let wc = cockpit.working_capital(&RowFilter::default(), None).unwrap();

    assert!((wc.ccc - (wc.dio + wc.dso - wc.dpo)).abs() < 1e-9);
    assert!((wc.nwc - (wc.ar_balance + wc.inventory_value - wc.ap_balance)).abs() < 1e-9);
    assert_eq!(wc.ar_balance, 1200.0);
    assert_eq!(wc.ap_balance, 400.0);
    // P1 valued at its explicit cost, P2 at last price × 0.7.
    assert!((wc.inventory_value - (20.0 * 5.0 + 8.0 * 25.0 * 0.7)).abs() < 1e-9);
}

#[test]
fn cash_plan_buckets_open_amounts_by_due_week() {
    let (_dir, cockpit) = cockpit();
    let today = date(2025, 6, 2); // a Monday
    let weeks = cockpit.cash_plan(&RowFilter::default(), 1000.0, today).unwrap();

    assert_eq!(weeks.len(), FORECAST_WEEKS);
    assert_eq!(weeks[0].week_start, today);
    for pair in weeks.windows(2) {
        assert_eq!(pair[1].week_start - pair[0].week_start, chrono::Duration::days(7));
    }

    // AR1 is due before the horizon and excluded. AR2 (500 open, due
    // 2025-06-20) lands in week 2; AP1 (400, due 2025-06-10) in week 1.
    let receipts: f64 = weeks.iter().map(|w| w.receipts).sum();
    let payments: f64 = weeks.iter().map(|w| w.payments).sum();
    assert_eq!(receipts, 500.0);
    assert_eq!(payments, 400.0);
    assert_eq!(weeks[1].payments, 400.0);
    assert_eq!(weeks[2].receipts, 500.0);

    // Running balance is the prefix sum of nets over starting cash.
    let mut expected = 1000.0;
    for week in &weeks {
        expected += week.net;
        assert!((week.cash - expected).abs() < 1e-9);
    }
    assert_eq!(weeks.last().unwrap().cash, 1000.0 + 500.0 - 400.0);
}

#[test]
fn aging_partitions_open_ar() {
    let (_dir, cockpit) = cockpit();
    let today = date(2025, 6, 2);
    let buckets = cockpit
        .aging(LedgerSide::Receivable, &RowFilter::default(), today)
        .unwrap();

    assert_eq!(buckets.len(), 5);
    let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["Current", "1-30", "31-60", "61-90", "90+"]);

    // AR1: 45 days past due, 700 open → "31-60". AR2 not yet due.
    let by_label = |label: &str| {
        buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.open_amount)
            .unwrap()
    };
    assert_eq!(by_label("31-60"), 700.0);
    assert_eq!(by_label("Current"), 500.0);

    let total: f64 = buckets.iter().map(|b| b.open_amount).sum();
    assert_eq!(total, 1200.0);

    let overdue = cockpit
        .top_overdue(LedgerSide::Receivable, &RowFilter::default(), today, 25)
        .unwrap();
    assert_eq!(overdue.len(), 2);
    assert_eq!(overdue[0].invoice_id, "AR1");
    assert_eq!(overdue[0].days_past_due, 45);
}

#[test]
fn bridge_reconciles_between_months() {
    let (_dir, cockpit) = cockpit();
    let bridge = cockpit
        .bridge(&RowFilter::default(), date(2025, 4, 1), date(2025, 5, 1))
        .unwrap();

    let reconstructed =
        bridge.start_value + bridge.price_effect + bridge.volume_effect + bridge.mix_effect;
    assert!((reconstructed - bridge.end_value).abs() < 1e-9);
    assert!((bridge.start_value - 200.0).abs() < 1e-9);
    assert!((bridge.end_value - 197.0).abs() < 1e-9);
}

#[test]
fn commentary_context_is_deterministic_text() {
    let (_dir, cockpit) = cockpit();
    let context = cockpit
        .commentary_context(&RowFilter::default(), date(2025, 6, 2))
        .unwrap();

    assert!((context.ytd_revenue - 397.0).abs() < 1e-9);
    assert_eq!(context.budget_variance, Some(197.0 - 200.0));
    let first = context.to_string();
    let second = context.to_string();
    assert_eq!(first, second);
    assert!(first.contains("YTD revenue: 397.00"));
}

#[test]
fn atomic_tables_join_when_flat_export_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "orders.csv",
        "order_id,customer_id,channel_id,order_date,status\nO1,C1,CH1,2025-04-05,Delivered\n",
    );
    write_file(
        dir.path(),
        "order_items.csv",
        "order_id,product_id,quantity,unit_price\nO1,P1,10,10\n",
    );
    write_file(dir.path(), "customers.csv", "customer_id,country\nC1,UAE\n");
    write_file(dir.path(), "channels.csv", "channel_id,channel_name\nCH1,Retail\n");
    write_file(dir.path(), "products.csv", "product_id,category\nP1,Pharma\n");
    write_file(dir.path(), "brands.csv", "brand_id,brand_name\nB1,Acme\n");

    let cockpit = Cockpit::new(FolderDataSource::new(dir.path()).unwrap());
    let summary = cockpit.dashboard(&RowFilter::default()).unwrap();
    assert_eq!(summary.revenue, 100.0);
    assert_eq!(summary.revenue_source, RevenueSource::SalesLines);

    // Pharma category factor 0.60 drives the estimated COGS.
    let figures = cockpit.monthly_series(&RowFilter::default()).unwrap();
    assert!((figures[0].cogs - 60.0).abs() < 1e-9);
}

#[test]
fn empty_folder_reports_missing_tables() {
    let dir = tempfile::tempdir().unwrap();
    let cockpit = Cockpit::new(FolderDataSource::new(dir.path()).unwrap());
    let err = cockpit.monthly_series(&RowFilter::default()).unwrap_err();
    assert!(matches!(err, CockpitError::MissingData(_)));

    // The dashboard has no fallback source left either.
    let err = cockpit.dashboard(&RowFilter::default()).unwrap_err();
    assert!(matches!(err, CockpitError::MissingData(_)));
}

#[test]
fn fixture_source_matches_folder_source() {
    let (_dir, folder_cockpit) = cockpit();
    let lines = folder_cockpit.source().order_lines().unwrap();
    let ar = folder_cockpit
        .source()
        .invoices(LedgerSide::Receivable)
        .unwrap()
        .unwrap();

    let fixture = FixtureDataSource::new(lines).with_ar(ar);
    let fixture_cockpit = Cockpit::new(fixture);

    let today = date(2025, 6, 2);
    let folder_aging = folder_cockpit
        .aging(LedgerSide::Receivable, &RowFilter::default(), today)
        .unwrap();
    let fixture_aging = fixture_cockpit
        .aging(LedgerSide::Receivable, &RowFilter::default(), today)
        .unwrap();
    assert_eq!(folder_aging, fixture_aging);
}
