//! Grouped sums, means and counts, plus rolling means over grouped series.
//!
//! Every function here reads the sales slice from scratch and returns a new
//! table; nothing is cached between calls and inputs are never mutated.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;

use crate::domain::{Dimension, KeyValue, Metric, Sale};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("Column `{0}` is not present in the table.")]
    MissingColumn(String),
    #[error("Rolling window must be at least one row.")]
    ZeroWindow,
}

/// How metric values are reduced within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Sum,
    Mean,
}

/// A named value column of an aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Metric(Metric),
    /// Rolling mean of a metric over `window` rows.
    MovingAverage(Metric, usize),
    /// `PROD_CNT`: rows per key.
    Count,
    /// `PROD_CNT_PCT`: the key's share of all rows, in percent.
    CountShare,
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Metric(m) => f.write_str(m.name()),
            Column::MovingAverage(m, w) => write!(f, "{}_MA_{w}", m.name()),
            Column::Count => f.write_str("PROD_CNT"),
            Column::CountShare => f.write_str("PROD_CNT_PCT"),
        }
    }
}

/// Grouping keys (ascending, one entry per dimension) plus value columns.
///
/// Undefined values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    dimensions: Vec<Dimension>,
    keys: Vec<Vec<KeyValue>>,
    columns: Vec<(Column, Vec<f64>)>,
}

impl AggregateTable {
    fn with_keys(dimensions: Vec<Dimension>, keys: Vec<Vec<KeyValue>>) -> Self {
        Self {
            dimensions,
            keys,
            columns: Vec::new(),
        }
    }

    fn push_column(&mut self, column: Column, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.keys.len());
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((column, values)),
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Vec<KeyValue>] {
        &self.keys
    }

    /// Values of one key dimension, row by row.
    pub fn key_column(&self, dim: Dimension) -> Option<Vec<&KeyValue>> {
        let idx = self.dimensions.iter().position(|d| *d == dim)?;
        Some(self.keys.iter().map(|k| &k[idx]).collect())
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().map(|(c, _)| *c)
    }

    pub fn column(&self, column: Column) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_slice())
    }

    fn require(&self, column: Column) -> Result<&[f64], AggregateError> {
        self.column(column)
            .ok_or_else(|| AggregateError::MissingColumn(column.to_string()))
    }

    /// Row index of a key.
    pub fn position(&self, key: &[KeyValue]) -> Option<usize> {
        self.keys.iter().position(|k| k.as_slice() == key)
    }

    pub fn value(&self, key: &[KeyValue], column: Column) -> Option<f64> {
        let row = self.position(key)?;
        self.column(column).map(|v| v[row])
    }

    /// Keep the given rows, in the given order.
    fn select(&self, rows: &[usize]) -> Self {
        Self {
            dimensions: self.dimensions.clone(),
            keys: rows.iter().map(|&r| self.keys[r].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|(c, v)| (*c, rows.iter().map(|&r| v[r]).collect()))
                .collect(),
        }
    }

    /// Append `<METRIC>_MA_<window>`.
    ///
    /// The first `window - 1` rows are `NaN`; that warm-up is expected.
    pub fn with_rolling_mean(&self, metric: Metric, window: usize) -> Result<Self, AggregateError> {
        if window == 0 {
            return Err(AggregateError::ZeroWindow);
        }
        let values = rolling_mean(self.require(Column::Metric(metric))?, window);
        let mut out = self.clone();
        out.push_column(Column::MovingAverage(metric, window), values);
        Ok(out)
    }

    /// The `n` rows with the largest `column` values, descending.
    ///
    /// Ties keep their table order; `NaN` sorts last.
    pub fn top_n(&self, column: Column, n: usize) -> Result<Self, AggregateError> {
        let values = self.require(column)?;
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| descending_nan_last(values[a], values[b]));
        order.truncate(n);
        Ok(self.select(&order))
    }

    /// Left-join the count columns of `counts` on the full key.
    ///
    /// Keys missing from `counts` get `NaN`.
    pub fn join_counts(&self, counts: &AggregateTable) -> Self {
        let index: HashMap<&[KeyValue], usize> = counts
            .keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_slice(), i))
            .collect();

        let mut out = self.clone();
        for column in [Column::Count, Column::CountShare] {
            let Some(source) = counts.column(column) else {
                continue;
            };
            let values = self
                .keys
                .iter()
                .map(|k| index.get(k.as_slice()).map_or(f64::NAN, |&i| source[i]))
                .collect();
            out.push_column(column, values);
        }
        out
    }

    /// Rows whose value for `dim` is one of `allowed`.
    pub fn filter_keys(&self, dim: Dimension, allowed: &[KeyValue]) -> Self {
        let Some(idx) = self.dimensions.iter().position(|d| *d == dim) else {
            return self.clone();
        };
        let rows: Vec<usize> = (0..self.len())
            .filter(|&r| allowed.contains(&self.keys[r][idx]))
            .collect();
        self.select(&rows)
    }

    /// Keep only the listed value columns, in the listed order.
    pub fn project(&self, columns: &[Column]) -> Result<Self, AggregateError> {
        let mut out = Self::with_keys(self.dimensions.clone(), self.keys.clone());
        for &column in columns {
            out.push_column(column, self.require(column)?.to_vec());
        }
        Ok(out)
    }
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Trailing mean over `window` consecutive values.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                f64::NAN
            } else {
                values[i + 1 - window..=i].iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}

fn group_rows<'a>(sales: &'a [Sale], dims: &[Dimension]) -> BTreeMap<Vec<KeyValue>, Vec<&'a Sale>> {
    let mut groups: BTreeMap<Vec<KeyValue>, Vec<&Sale>> = BTreeMap::new();
    for sale in sales {
        // A row without a value for any grouping dimension is left out.
        let key: Option<Vec<KeyValue>> = dims.iter().map(|d| sale.key(*d)).collect();
        if let Some(key) = key {
            groups.entry(key).or_default().push(sale);
        }
    }
    groups
}

/// Group `sales` by `dims` and reduce each metric with `agg`.
///
/// Non-finite metric values are skipped.
pub fn aggregate(sales: &[Sale], dims: &[Dimension], metrics: &[Metric], agg: Agg) -> AggregateTable {
    let groups = group_rows(sales, dims);
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(groups.len()); metrics.len()];
    let mut keys = Vec::with_capacity(groups.len());

    for (key, rows) in groups {
        for (m_idx, metric) in metrics.iter().enumerate() {
            let (sum, n) = rows
                .iter()
                .map(|s| s.metric(*metric))
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
            let value = match agg {
                Agg::Sum => sum,
                Agg::Mean if n == 0 => f64::NAN,
                Agg::Mean => sum / n as f64,
            };
            columns[m_idx].push(value);
        }
        keys.push(key);
    }

    let mut table = AggregateTable::with_keys(dims.to_vec(), keys);
    for (metric, values) in metrics.iter().zip(columns) {
        table.push_column(Column::Metric(*metric), values);
    }
    table
}

/// Row count per key (`PROD_CNT`).
pub fn count_by(sales: &[Sale], dims: &[Dimension]) -> AggregateTable {
    let groups = group_rows(sales, dims);
    let counts = groups.values().map(|rows| rows.len() as f64).collect();
    let mut table = AggregateTable::with_keys(dims.to_vec(), groups.into_keys().collect());
    table.push_column(Column::Count, counts);
    table
}

/// `PROD_CNT` plus `PROD_CNT_PCT` per value of `dim`.
///
/// Percentages are shares of the whole grouped universe and sum to 100 over
/// all keys. A top-N slice joined with this table therefore shows global
/// shares, not shares of the slice.
pub fn count_share(sales: &[Sale], dim: Dimension) -> AggregateTable {
    let mut table = count_by(sales, &[dim]);
    let counts = table.column(Column::Count).map(<[f64]>::to_vec).unwrap_or_default();
    let total: f64 = counts.iter().sum();
    let shares = counts
        .iter()
        .map(|c| if total > 0.0 { c / total * 100.0 } else { f64::NAN })
        .collect();
    table.push_column(Column::CountShare, shares);
    table
}

/// The seven grouped tables the report draws on.
#[derive(Debug, Clone)]
pub struct GroupedMetrics {
    pub product_sum: AggregateTable,
    pub product_mean: AggregateTable,
    pub class_sum: AggregateTable,
    pub class_mean: AggregateTable,
    /// Daily sums, including `QTY`.
    pub by_date: AggregateTable,
    pub by_month: AggregateTable,
    pub by_day: AggregateTable,
}

impl GroupedMetrics {
    pub fn compute(sales: &[Sale]) -> Self {
        let fin = &Metric::FINANCIAL;
        let daily = [Metric::TotRev, Metric::TotCost, Metric::NetSales, Metric::Qty];
        Self {
            product_sum: aggregate(sales, &[Dimension::ProductName], fin, Agg::Sum),
            product_mean: aggregate(sales, &[Dimension::ProductName], fin, Agg::Mean),
            class_sum: aggregate(sales, &[Dimension::ProductClass], fin, Agg::Sum),
            class_mean: aggregate(sales, &[Dimension::ProductClass], fin, Agg::Mean),
            by_date: aggregate(sales, &[Dimension::TxDate], &daily, Agg::Sum),
            by_month: aggregate(sales, &[Dimension::Month], fin, Agg::Sum),
            by_day: aggregate(sales, &[Dimension::Day], fin, Agg::Sum),
        }
    }

    /// Named tables, for export.
    pub fn named(&self) -> [(&'static str, &AggregateTable); 7] {
        [
            ("product_sum", &self.product_sum),
            ("product_mean", &self.product_mean),
            ("class_sum", &self.class_sum),
            ("class_mean", &self.class_mean),
            ("by_date", &self.by_date),
            ("by_month", &self.by_month),
            ("by_day", &self.by_day),
        ]
    }
}

/// Daily table with rolling means of `TOT_REV` and `QTY` for every window.
pub fn moving_averages(by_date: &AggregateTable, windows: &[usize]) -> Result<AggregateTable, AggregateError> {
    let mut out = by_date.clone();
    for metric in [Metric::TotRev, Metric::Qty] {
        for &w in windows {
            out = out.with_rolling_mean(metric, w)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sale(day: u32, name: &str, class: Option<&str>, rev: f64, cost: f64) -> Sale {
        Sale {
            tx_date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            year: 2021,
            month: 1,
            day,
            customer_id: i64::from(day),
            product_name: name.to_string(),
            price: rev,
            purch_cost: cost,
            qty: 1.0,
            tot_rev: rev,
            tot_cost: cost,
            net_sales: rev - cost,
            product_class: class.map(str::to_string),
            product_category: None,
        }
    }

    fn text(s: &str) -> Vec<KeyValue> {
        vec![KeyValue::Text(s.to_string())]
    }

    #[test]
    fn widget_net_sales_sum() {
        let sales = vec![sale(1, "Widget", Some("A"), 20.0, 8.0), sale(2, "Widget", Some("A"), 30.0, 12.0)];
        let t = aggregate(&sales, &[Dimension::ProductName], &Metric::FINANCIAL, Agg::Sum);
        assert_eq!(t.value(&text("Widget"), Column::Metric(Metric::NetSales)), Some(30.0));
    }

    #[test]
    fn keys_sorted_and_missing_class_dropped() {
        let sales = vec![
            sale(1, "b", Some("Z"), 1.0, 0.0),
            sale(2, "a", Some("A"), 3.0, 0.0),
            sale(3, "c", None, 5.0, 0.0),
            sale(4, "d", Some("A"), 5.0, 0.0),
        ];
        let t = aggregate(&sales, &[Dimension::ProductClass], &[Metric::TotRev], Agg::Mean);
        assert_eq!(t.keys(), &[text("A"), text("Z")]);
        assert_eq!(t.column(Column::Metric(Metric::TotRev)).unwrap(), &[4.0, 1.0]);
    }

    #[test]
    fn rolling_mean_warm_up_is_undefined() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        for w in [1usize, 3, 7, 10] {
            let ma = rolling_mean(&values, w);
            assert_eq!(ma.len(), values.len());
            assert!(ma[..w - 1].iter().all(|v| v.is_nan()));
            assert_eq!(ma.iter().filter(|v| !v.is_nan()).count(), values.len() - w + 1);
        }
        let ma = rolling_mean(&values, 3);
        assert!((ma[2] - 2.0).abs() < 1e-12);
        assert!((ma[9] - 9.0).abs() < 1e-12);
    }

    #[test]
    fn rolling_mean_column_named_and_zero_window_rejected() {
        let sales: Vec<Sale> = (1..=5).map(|d| sale(d, "w", Some("A"), f64::from(d), 0.0)).collect();
        let daily = aggregate(&sales, &[Dimension::TxDate], &[Metric::TotRev, Metric::Qty], Agg::Sum);
        let ma = moving_averages(&daily, &[2]).unwrap();
        assert_eq!(Column::MovingAverage(Metric::TotRev, 2).to_string(), "TOT_REV_MA_2");
        let col = ma.column(Column::MovingAverage(Metric::TotRev, 2)).unwrap();
        assert!(col[0].is_nan());
        assert!((col[4] - 4.5).abs() < 1e-12);
        assert_eq!(daily.with_rolling_mean(Metric::TotRev, 0), Err(AggregateError::ZeroWindow));
    }

    #[test]
    fn top_n_is_bounded_descending_stable_and_member() {
        let sales = vec![
            sale(1, "a", None, 5.0, 0.0),
            sale(2, "b", None, 9.0, 0.0),
            sale(3, "c", None, 5.0, 0.0),
            sale(4, "d", None, 1.0, 0.0),
            sale(5, "e", None, 7.0, 0.0),
        ];
        let full = aggregate(&sales, &[Dimension::ProductName], &[Metric::NetSales], Agg::Sum);
        let col = Column::Metric(Metric::NetSales);
        let top = full.top_n(col, 3).unwrap();

        assert!(top.len() <= 3);
        assert_eq!(top.keys(), &[text("b"), text("e"), text("a")]);
        let v = top.column(col).unwrap();
        assert!(v.windows(2).all(|w| w[0] >= w[1]));
        assert!(top.keys().iter().all(|k| full.position(k).is_some()));

        assert_eq!(full.top_n(col, 50).unwrap().len(), 5);
        assert!(matches!(
            full.top_n(Column::Count, 1),
            Err(AggregateError::MissingColumn(_))
        ));
    }

    #[test]
    fn count_share_sums_to_100_over_full_universe() {
        let mut sales = Vec::new();
        for (i, class) in ["A", "A", "A", "B", "B", "C", "D", "D", "E"].iter().enumerate() {
            sales.push(sale(i as u32 + 1, "p", Some(class), 10.0 - i as f64, 0.0));
        }
        let shares = count_share(&sales, Dimension::ProductClass);
        let total: f64 = shares.column(Column::CountShare).unwrap().iter().sum();
        assert!((total - 100.0).abs() < 1e-9);

        let means = aggregate(&sales, &[Dimension::ProductClass], &[Metric::NetSales], Agg::Mean);
        let top = means.top_n(Column::Metric(Metric::NetSales), 2).unwrap().join_counts(&shares);
        let slice_total: f64 = top.column(Column::CountShare).unwrap().iter().sum();
        assert!(slice_total < 100.0);
        assert_eq!(top.value(&text("A"), Column::Count), Some(3.0));
    }

    #[test]
    fn join_counts_leaves_missing_keys_undefined() {
        let sales = vec![sale(1, "a", Some("A"), 1.0, 0.0)];
        let table = aggregate(&sales, &[Dimension::ProductName], &[Metric::TotRev], Agg::Sum);
        let counts = count_share(&sales, Dimension::ProductClass);
        let joined = table.join_counts(&counts);
        assert!(joined.column(Column::Count).unwrap()[0].is_nan());
    }

    #[test]
    fn project_keeps_listed_columns_in_order() {
        let sales = vec![sale(1, "a", Some("A"), 5.0, 2.0)];
        let t = aggregate(&sales, &[Dimension::ProductName], &Metric::FINANCIAL, Agg::Sum);
        let net = Column::Metric(Metric::NetSales);
        let p = t.project(&[net, Column::Metric(Metric::TotRev)]).unwrap();
        assert_eq!(p.columns().collect::<Vec<_>>(), vec![net, Column::Metric(Metric::TotRev)]);
        assert_eq!(p.keys(), t.keys());
        assert!(matches!(t.project(&[Column::Count]), Err(AggregateError::MissingColumn(_))));
    }
}
