//! Formatted text output.
//!
//! Formatting lives here so the aggregation code stays free of presentation
//! and output changes stay localized.

use crate::analysis::{AggregateTable, Column, TopRankings};
use crate::domain::Metric;
use crate::report::RunTotals;

/// Terminal summary: totals, then the top products, classes and customers.
pub fn format_run_summary(totals: &RunTotals, rankings: &TopRankings) -> String {
    let mut out = String::new();
    let net = Column::Metric(Metric::NetSales);

    out.push_str("=== sales-deck - Run Summary ===\n");
    out.push_str(&format!("Rows: {}\n", totals.rows));
    if let (Some(first), Some(last)) = (totals.first_date, totals.last_date) {
        out.push_str(&format!("Period: {first} .. {last}\n"));
    }
    out.push_str(&format!(
        "Customers: {} | Products: {} | Classes: {}\n",
        totals.customers, totals.products, totals.classes
    ));
    if totals.unmapped > 0 {
        out.push_str(&format!("Unmapped rows: {}\n", totals.unmapped));
    }
    out.push_str(&format!(
        "Revenue: {} | Cost: {} | Net sales: {}\n",
        fmt_money(totals.tot_rev),
        fmt_money(totals.tot_cost),
        fmt_money(totals.net_sales)
    ));
    out.push_str(&format!("Quantity: {:.0}\n", totals.qty));
    if let Some(m) = totals.margin_pct() {
        out.push_str(&format!("Margin: {m:.1}%\n"));
    }
    out.push('\n');

    out.push_str(&format_top_table("Top products (mean net sales):", &rankings.products, net));
    out.push('\n');
    out.push_str(&format_top_table("Top classes (mean net sales):", &rankings.classes, net));
    out.push('\n');
    out.push_str(&format_top_table("Top customers (net sales):", &rankings.customers_by_revenue, net));

    out
}

/// A titled two-column listing: the first key dimension and one value column.
pub fn format_top_table(title: &str, table: &AggregateTable, column: Column) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');

    let key_name = table.dimensions().first().map_or("key", |d| d.name());
    out.push_str(format!("{:<4} {:<24} {:>16}", "#", key_name, column.to_string()).trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<4} {:-<24} {:-<16}\n", "", "", ""));

    let values = table.column(column).unwrap_or(&[]);
    for (i, key) in table.keys().iter().enumerate() {
        let name = key.first().map(ToString::to_string).unwrap_or_default();
        let value = values.get(i).copied().unwrap_or(f64::NAN);
        out.push_str(&format!("{:<4} {:<24} {:>16}\n", i + 1, truncate(&name, 24), fmt_value(value)));
    }
    out
}

/// Body of the summary slide, one paragraph per line.
pub fn summary_text(totals: &RunTotals, rankings: &TopRankings) -> String {
    let net = Column::Metric(Metric::NetSales);
    let mut lines = Vec::new();

    let period = match (totals.first_date, totals.last_date) {
        (Some(first), Some(last)) => format!(" between {} and {}", first.format("%b %d, %Y"), last.format("%b %d, %Y")),
        _ => String::new(),
    };
    lines.push(format!(
        "{} transactions from {} customers generated {} of revenue{period}.",
        totals.rows,
        totals.customers,
        fmt_money(totals.tot_rev)
    ));

    let margin = totals
        .margin_pct()
        .map(|m| format!(", a {m:.1}% margin"))
        .unwrap_or_default();
    lines.push(format!(
        "Net sales came to {} on {:.0} units sold{margin}.",
        fmt_money(totals.net_sales),
        totals.qty
    ));

    if let Some((name, value)) = leader(&rankings.products, net) {
        lines.push(format!("Best product by average net sales: {name} ({}).", fmt_money(value)));
    }
    if let Some((name, value)) = leader(&rankings.classes, net) {
        lines.push(format!("Best product class by average net sales: {name} ({}).", fmt_money(value)));
    }
    if let Some((id, value)) = leader(&rankings.customers_by_revenue, net) {
        lines.push(format!("Largest customer: #{id} with {} in net sales.", fmt_money(value)));
    }
    if totals.unmapped > 0 {
        lines.push(format!(
            "{} transactions reference products without a class mapping and are left out of class figures.",
            totals.unmapped
        ));
    }

    lines.join("\n")
}

fn leader(table: &AggregateTable, column: Column) -> Option<(String, f64)> {
    let key = table.keys().first()?.first()?.to_string();
    let value = *table.column(column)?.first()?;
    Some((key, value))
}

/// `$1,234,567.89`, with a leading minus for losses.
fn fmt_money(v: f64) -> String {
    if !v.is_finite() {
        return "n/a".to_string();
    }
    let cents = (v.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

fn fmt_value(v: f64) -> String {
    if v.is_finite() { format!("{v:.2}") } else { String::new() }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
