//! Run totals and their text renderings (terminal summary, summary slide).

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::domain::Sale;

pub mod format;

pub use format::{format_run_summary, format_top_table, summary_text};

/// Headline figures of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTotals {
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub tot_rev: f64,
    pub tot_cost: f64,
    pub net_sales: f64,
    pub qty: f64,
    pub customers: usize,
    pub products: usize,
    pub classes: usize,
    /// Rows whose product has no mapping entry.
    pub unmapped: usize,
}

impl RunTotals {
    pub fn compute(sales: &[Sale]) -> Self {
        let mut customers = HashSet::new();
        let mut products = HashSet::new();
        let mut classes = HashSet::new();
        let mut totals = Self {
            rows: sales.len(),
            first_date: sales.iter().map(|s| s.tx_date).min(),
            last_date: sales.iter().map(|s| s.tx_date).max(),
            tot_rev: 0.0,
            tot_cost: 0.0,
            net_sales: 0.0,
            qty: 0.0,
            customers: 0,
            products: 0,
            classes: 0,
            unmapped: 0,
        };

        for s in sales {
            totals.tot_rev += s.tot_rev;
            totals.tot_cost += s.tot_cost;
            totals.net_sales += s.net_sales;
            totals.qty += s.qty;
            customers.insert(s.customer_id);
            products.insert(s.product_name.as_str());
            match &s.product_class {
                Some(c) => {
                    classes.insert(c.as_str());
                }
                None => totals.unmapped += 1,
            }
        }

        totals.customers = customers.len();
        totals.products = products.len();
        totals.classes = classes.len();
        totals
    }

    /// Net sales as a percentage of revenue; `None` without revenue.
    pub fn margin_pct(&self) -> Option<f64> {
        (self.tot_rev.abs() > f64::EPSILON).then(|| self.net_sales / self.tot_rev * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(day: u32, customer: i64, name: &str, class: Option<&str>, rev: f64, cost: f64) -> Sale {
        Sale {
            tx_date: NaiveDate::from_ymd_opt(2021, 5, day).unwrap(),
            year: 2021,
            month: 5,
            day,
            customer_id: customer,
            product_name: name.to_string(),
            price: rev,
            purch_cost: cost,
            qty: 2.0,
            tot_rev: rev,
            tot_cost: cost,
            net_sales: rev - cost,
            product_class: class.map(str::to_string),
            product_category: None,
        }
    }

    #[test]
    fn totals_count_distinct_and_unmapped() {
        let sales = vec![
            sale(3, 1, "Widget", Some("A"), 20.0, 8.0),
            sale(1, 2, "Widget", Some("A"), 30.0, 12.0),
            sale(9, 1, "Gadget", None, 50.0, 30.0),
        ];
        let t = RunTotals::compute(&sales);
        assert_eq!(t.rows, 3);
        assert_eq!(t.first_date, NaiveDate::from_ymd_opt(2021, 5, 1));
        assert_eq!(t.last_date, NaiveDate::from_ymd_opt(2021, 5, 9));
        assert_eq!((t.customers, t.products, t.classes, t.unmapped), (2, 2, 1, 1));
        assert!((t.net_sales - 50.0).abs() < 1e-12);
        assert!((t.margin_pct().unwrap() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn empty_run_has_no_margin() {
        let t = RunTotals::compute(&[]);
        assert_eq!(t.rows, 0);
        assert_eq!(t.first_date, None);
        assert_eq!(t.margin_pct(), None);
    }
}
