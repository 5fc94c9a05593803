//! Top-N selections and display tables derived from them.

use std::collections::HashMap;

use crate::analysis::aggregate::{
    Agg, AggregateError, AggregateTable, Column, GroupedMetrics, aggregate, count_by, count_share,
};
use crate::domain::{Dimension, KeyValue, Metric, Sale};

/// Top-N tables used by the charts, tables and summary text.
#[derive(Debug, Clone)]
pub struct TopRankings {
    /// Products by mean net sales.
    pub products: AggregateTable,
    /// Product classes by mean net sales.
    pub classes: AggregateTable,
    /// `products` joined with per-product counts.
    pub products_with_counts: AggregateTable,
    /// `classes` joined with per-class counts and global shares.
    pub classes_with_counts: AggregateTable,
    /// Customers by summed net sales (`QTY`, `NET_SALES`).
    pub customers_by_revenue: AggregateTable,
    /// Customers by summed quantity (`QTY`, `NET_SALES`).
    pub customers_by_quantity: AggregateTable,
}

impl TopRankings {
    pub fn compute(sales: &[Sale], grouped: &GroupedMetrics, n: usize) -> Result<Self, AggregateError> {
        let net = Column::Metric(Metric::NetSales);
        let products = grouped.product_mean.top_n(net, n)?;
        let classes = grouped.class_mean.top_n(net, n)?;

        let product_counts = count_by(sales, &[Dimension::ProductName]);
        let class_counts = count_share(sales, Dimension::ProductClass);

        let per_customer = aggregate(sales, &[Dimension::CustomerId], &[Metric::Qty, Metric::NetSales], Agg::Sum);

        Ok(Self {
            products_with_counts: products.join_counts(&product_counts),
            classes_with_counts: classes.join_counts(&class_counts),
            products,
            classes,
            customers_by_revenue: per_customer.top_n(net, n)?,
            customers_by_quantity: per_customer.top_n(Column::Metric(Metric::Qty), n)?,
        })
    }
}

/// Per-category raw observations, categories in order of first appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub dimension: Dimension,
    pub metric: Metric,
    pub groups: Vec<(KeyValue, Vec<f64>)>,
}

impl Distribution {
    pub fn observation_count(&self) -> usize {
        self.groups.iter().map(|(_, v)| v.len()).sum()
    }
}

/// Raw `TOT_COST` observations for the `k` classes with the largest total cost.
pub fn top_cost_distribution(sales: &[Sale], k: usize) -> Result<Distribution, AggregateError> {
    let col = Column::Metric(Metric::TotCost);
    let totals = aggregate(sales, &[Dimension::ProductClass], &[Metric::TotCost], Agg::Sum);
    let top = totals.top_n(col, k)?;
    let allowed: Vec<KeyValue> = top.keys().iter().map(|key| key[0].clone()).collect();

    let mut index: HashMap<KeyValue, usize> = HashMap::new();
    let mut groups: Vec<(KeyValue, Vec<f64>)> = Vec::new();
    for sale in sales {
        let Some(class) = sale.key(Dimension::ProductClass) else {
            continue;
        };
        if !allowed.contains(&class) {
            continue;
        }
        let slot = *index.entry(class.clone()).or_insert_with(|| {
            groups.push((class, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(sale.tot_cost);
    }

    Ok(Distribution {
        dimension: Dimension::ProductClass,
        metric: Metric::TotCost,
        groups,
    })
}

/// Classes ranked by row count, with their daily quantity series.
#[derive(Debug, Clone)]
pub struct ClassSeries {
    /// Ranked classes, most frequent first.
    pub classes: Vec<KeyValue>,
    /// Summed `QTY` keyed by `(TX_DATE, PRODUCT_CLASS)`.
    pub series: AggregateTable,
}

/// The `k` most frequent product classes (by transaction count, not revenue)
/// and their per-day quantity. Only rows with a non-empty category are
/// counted; the quantity series keeps every row of the chosen classes.
pub fn top_classes_by_count(sales: &[Sale], k: usize) -> Result<ClassSeries, AggregateError> {
    let categorised: Vec<Sale> = sales
        .iter()
        .filter(|s| s.product_category.as_deref().is_some_and(|c| !c.trim().is_empty()))
        .cloned()
        .collect();
    let counts = count_by(&categorised, &[Dimension::ProductClass]);
    let top = counts.top_n(Column::Count, k)?;
    let classes: Vec<KeyValue> = top.keys().iter().map(|key| key[0].clone()).collect();

    let series = aggregate(
        sales,
        &[Dimension::TxDate, Dimension::ProductClass],
        &[Metric::Qty],
        Agg::Sum,
    )
    .filter_keys(Dimension::ProductClass, &classes);

    Ok(ClassSeries { classes, series })
}

/// A small string grid ready for the table renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DisplayTable {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Render a top-N table for display.
///
/// `integer_column` is truncated toward zero; other value columns keep two
/// decimals. Headers found in `rename` (raw name → label) are relabelled.
pub fn labelled_table(table: &AggregateTable, integer_column: Column, rename: &[(&str, &str)]) -> DisplayTable {
    let relabel = |raw: String| {
        rename
            .iter()
            .find(|(from, _)| *from == raw)
            .map_or(raw, |(_, to)| (*to).to_string())
    };

    let columns: Vec<Column> = table.columns().collect();
    let mut headers: Vec<String> = table.dimensions().iter().map(|d| relabel(d.name().to_string())).collect();
    headers.extend(columns.iter().map(|c| relabel(c.to_string())));

    let rows = (0..table.len())
        .map(|r| {
            let mut row: Vec<String> = table.keys()[r].iter().map(ToString::to_string).collect();
            for c in &columns {
                let v = table.column(*c).map_or(f64::NAN, |vals| vals[r]);
                row.push(format_cell(v, *c == integer_column));
            }
            row
        })
        .collect();

    DisplayTable { headers, rows }
}

fn format_cell(v: f64, integer: bool) -> String {
    if !v.is_finite() {
        return String::new();
    }
    if integer { format!("{}", v.trunc() as i64) } else { format!("{v:.2}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sale(day: u32, class: &str, qty: f64, cost: f64) -> Sale {
        Sale {
            tx_date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            year: 2021,
            month: 1,
            day,
            customer_id: i64::from(day % 3),
            product_name: format!("{class}-item"),
            price: 2.0,
            purch_cost: cost,
            qty,
            tot_rev: 2.0 * qty,
            tot_cost: cost * qty,
            net_sales: (2.0 - cost) * qty,
            product_class: Some(class.to_string()),
            product_category: Some("cat".to_string()),
        }
    }

    fn text(s: &str) -> KeyValue {
        KeyValue::Text(s.to_string())
    }

    #[test]
    fn top_classes_rank_by_count_not_revenue() {
        let sales = vec![
            sale(1, "rare", 100.0, 0.1),
            sale(1, "common", 1.0, 1.0),
            sale(2, "common", 2.0, 1.0),
            sale(3, "common", 3.0, 1.0),
            sale(2, "mid", 1.0, 1.0),
            sale(3, "mid", 1.0, 1.0),
        ];
        let top = top_classes_by_count(&sales, 2).unwrap();
        assert_eq!(top.classes, vec![text("common"), text("mid")]);

        let classes = top.series.key_column(Dimension::ProductClass).unwrap();
        assert!(classes.iter().all(|c| **c != text("rare")));
        assert_eq!(top.series.len(), 5);
    }

    #[test]
    fn uncategorised_rows_do_not_count_towards_class_rank() {
        let uncategorised = |day, class| Sale {
            product_category: None,
            ..sale(day, class, 1.0, 1.0)
        };
        let blank = |day, class| Sale {
            product_category: Some(" ".to_string()),
            ..sale(day, class, 1.0, 1.0)
        };
        let sales = vec![
            uncategorised(1, "loose"),
            uncategorised(2, "loose"),
            blank(3, "loose"),
            sale(1, "tagged", 1.0, 1.0),
            sale(2, "tagged", 1.0, 1.0),
        ];
        let top = top_classes_by_count(&sales, 1).unwrap();
        assert_eq!(top.classes, vec![text("tagged")]);
        assert_eq!(top.series.len(), 2);
    }

    #[test]
    fn cost_distribution_keeps_raw_rows_in_appearance_order() {
        let sales = vec![
            sale(1, "b", 1.0, 5.0),
            sale(2, "a", 1.0, 9.0),
            sale(3, "c", 1.0, 0.5),
            sale(4, "b", 1.0, 6.0),
        ];
        let dist = top_cost_distribution(&sales, 2).unwrap();
        assert_eq!(dist.groups.len(), 2);
        assert_eq!(dist.groups[0], (text("b"), vec![5.0, 6.0]));
        assert_eq!(dist.groups[1], (text("a"), vec![9.0]));
        assert_eq!(dist.observation_count(), 3);
    }

    #[test]
    fn rankings_cover_products_classes_customers() {
        let sales: Vec<Sale> = (1..=9)
            .map(|d| sale(d, ["x", "y", "z"][(d % 3) as usize], f64::from(d), 1.0))
            .collect();
        let grouped = GroupedMetrics::compute(&sales);
        let top = TopRankings::compute(&sales, &grouped, 2).unwrap();

        assert_eq!(top.products.len(), 2);
        assert_eq!(top.classes_with_counts.column(Column::Count).unwrap().len(), 2);
        assert!(top.customers_by_quantity.len() <= 2);
        let qty = top.customers_by_quantity.column(Column::Metric(Metric::Qty)).unwrap();
        assert!(qty[0] >= qty[1]);
    }

    #[test]
    fn labelled_table_truncates_and_relabels() {
        let sales = vec![sale(1, "a", 3.0, 0.9), sale(2, "b", 1.0, 0.5)];
        let table = aggregate(&sales, &[Dimension::ProductClass], &[Metric::NetSales], Agg::Sum);
        let shown = labelled_table(
            &table,
            Column::Metric(Metric::NetSales),
            &[("PRODUCT_CLASS", "Product Class"), ("NET_SALES", "Net Sales ($)")],
        );
        assert_eq!(shown.headers, vec!["Product Class", "Net Sales ($)"]);
        assert_eq!(shown.rows, vec![vec!["a".to_string(), "3".to_string()], vec!["b".to_string(), "1".to_string()]]);
    }
}
