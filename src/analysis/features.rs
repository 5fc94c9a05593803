//! Per-row feature generation.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::domain::{Sale, TransactionRow};
use crate::error::{AppError, EXIT_DATA, Stage};

/// Derive calendar and financial fields and sort canonically.
///
/// The input is only borrowed. Rows come back ordered by
/// `(tx_date, customer_id)`; the sort is stable so equal keys keep their
/// input order.
pub fn generate_features(rows: &[TransactionRow]) -> Result<Vec<Sale>, AppError> {
    let mut out = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let tx_date = parse_date(&row.tx_date).map_err(|e| {
            AppError::at(Stage::Features, EXIT_DATA, format!("row {idx} ({}): {e}", row.product_name))
        })?;

        let tot_rev = row.price * row.qty;
        let tot_cost = row.purch_cost * row.qty;

        out.push(Sale {
            tx_date,
            year: tx_date.year(),
            month: tx_date.month(),
            day: tx_date.day(),
            customer_id: row.customer_id,
            product_name: row.product_name.clone(),
            price: row.price,
            purch_cost: row.purch_cost,
            qty: row.qty,
            tot_rev,
            tot_cost,
            net_sales: tot_rev - tot_cost,
            product_class: None,
            product_category: None,
        });
    }

    out.sort_by_key(|s| (s.tx_date, s.customer_id));
    Ok(out)
}

/// Parse the date formats spreadsheet exports commonly produce.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    // Excel date cells usually round-trip through CSV with a time component.
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, DD/MM/YYYY, DD-MM-YYYY (optionally with HH:MM:SS)."
    ))
}
