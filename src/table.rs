//! Raw row-oriented tables and the column normalizer.
//!
//! Source files arrive with unknown, missing, or extra columns. The
//! normalizer coerces named columns into canonical form without ever
//! failing: unparsable dates become empty cells (null), unparsable numbers
//! become 0.0, and missing numeric columns are synthesized as 0.0.
//! Normalization is idempotent.

use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use log::debug;
use std::io::Read;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a date cell, trying the accepted formats in order.
/// Returns `None` for empty or unparsable values — never an error.
pub fn coerce_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    // Datetime strings parse on their date prefix.
    if let Some(prefix) = raw.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }
    debug!("unparsable date value '{}' coerced to null", raw);
    None
}

/// Parse a numeric cell, tolerating thousands separators.
/// Unparsable or empty values coerce to 0.0 — never an error.
pub fn coerce_number(raw: &str) -> f64 {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            debug!("unparsable numeric value '{}' coerced to 0.0", raw);
            0.0
        }
    }
}

/// First day of the calendar month containing `date`. Two dates in the same
/// month map to the same key.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// A header row plus string cells, exactly as read from a CSV file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            // Flexible CSVs may come up short; pad so every row is rectangular.
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        let mut row = row;
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Raw string value of `column` in `row`, or `None` if the column is
    /// absent or the cell is empty.
    pub fn get_str(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        let value = self.cell(row, idx);
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn get_date(&self, row: usize, column: &str) -> Option<NaiveDate> {
        self.get_str(row, column).and_then(coerce_date)
    }

    /// Numeric value of `column` in `row`; absent columns and unparsable
    /// cells read as 0.0.
    pub fn get_number(&self, row: usize, column: &str) -> f64 {
        self.get_str(row, column).map(coerce_number).unwrap_or(0.0)
    }

    /// Coerce the named columns into canonical form in place.
    ///
    /// Date columns are rewritten as `YYYY-MM-DD` (empty when unparsable);
    /// numeric columns are rewritten as their parsed value (0 when
    /// unparsable); numeric columns missing from the table are appended
    /// and filled with 0. Running `normalize` twice yields the same table
    /// as running it once.
    pub fn normalize(&mut self, date_columns: &[&str], numeric_columns: &[&str]) {
        for name in date_columns {
            if let Some(idx) = self.column_index(name) {
                for row in &mut self.rows {
                    row[idx] = match coerce_date(&row[idx]) {
                        Some(d) => d.format("%Y-%m-%d").to_string(),
                        None => String::new(),
                    };
                }
            }
        }

        for name in numeric_columns {
            match self.column_index(name) {
                Some(idx) => {
                    for row in &mut self.rows {
                        row[idx] = coerce_number(&row[idx]).to_string();
                    }
                }
                None => {
                    self.headers.push((*name).to_string());
                    for row in &mut self.rows {
                        row.push("0".to_string());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawTable {
        let csv = "order_id,order_date,amount\n\
                   O1,2025-03-14,\"1,250.50\"\n\
                   O2,not-a-date,abc\n\
                   O3,14/03/2025,\n";
        RawTable::from_csv_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_coerce_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(coerce_date("2025-03-14"), Some(expected));
        assert_eq!(coerce_date("2025/03/14"), Some(expected));
        assert_eq!(coerce_date("14/03/2025"), Some(expected));
        assert_eq!(coerce_date("2025-03-14 10:30:00"), Some(expected));
        assert_eq!(coerce_date(""), None);
        assert_eq!(coerce_date("soon"), None);
    }

    #[test]
    fn test_coerce_number_never_fails() {
        assert_eq!(coerce_number("1,250.50"), 1250.50);
        assert_eq!(coerce_number(" 42 "), 42.0);
        assert_eq!(coerce_number("abc"), 0.0);
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("NaN"), 0.0);
    }

    #[test]
    fn test_month_start_merges_same_month() {
        let a = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(month_start(a), month_start(b));
        assert_eq!(month_start(b).day(), 1);
    }

    #[test]
    fn test_typed_getters() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get_date(0, "order_date"),
            NaiveDate::from_ymd_opt(2025, 3, 14)
        );
        assert_eq!(table.get_date(1, "order_date"), None);
        assert_eq!(table.get_number(0, "amount"), 1250.50);
        assert_eq!(table.get_number(1, "amount"), 0.0);
        assert_eq!(table.get_number(0, "missing_column"), 0.0);
    }

    #[test]
    fn test_normalize_synthesizes_missing_numeric_column() {
        let mut table = sample();
        table.normalize(&["order_date"], &["amount", "paid_amount"]);
        assert!(table.has_column("paid_amount"));
        assert_eq!(table.get_number(0, "paid_amount"), 0.0);
        assert_eq!(table.get_number(1, "amount"), 0.0);
        assert_eq!(table.get_str(1, "order_date"), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut once = sample();
        once.normalize(&["order_date"], &["amount", "paid_amount"]);

        let mut twice = once.clone();
        twice.normalize(&["order_date"], &["amount", "paid_amount"]);

        assert_eq!(once, twice);
    }
}
