//! Shared domain types.
//!
//! Raw rows mirror the spreadsheet exports column-for-column (upper-case
//! headers). `Sale` is the enriched, immutable record every aggregation reads.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of a `tx_data_*` export.
///
/// `TX_DATE` stays textual here; it is parsed by the feature generator so that
/// a bad date is reported against that stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TransactionRow {
    pub tx_date: String,
    pub customer_id: i64,
    pub product_name: String,
    pub price: f64,
    pub purch_cost: f64,
    pub qty: f64,
}

/// One row of the product-name → class/category mapping export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProductMapping {
    pub product_name: String,
    pub product_class: Option<String>,
    pub product_category: Option<String>,
}

/// An enriched transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub tx_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub customer_id: i64,
    pub product_name: String,
    pub price: f64,
    pub purch_cost: f64,
    pub qty: f64,
    /// `price × qty`
    pub tot_rev: f64,
    /// `purch_cost × qty`
    pub tot_cost: f64,
    /// `tot_rev − tot_cost`
    pub net_sales: f64,
    pub product_class: Option<String>,
    pub product_category: Option<String>,
}

impl Sale {
    /// Value of a grouping dimension, `None` when the row has no value for it
    /// (an unmapped product has no class).
    pub fn key(&self, dim: Dimension) -> Option<KeyValue> {
        match dim {
            Dimension::TxDate => Some(KeyValue::Date(self.tx_date)),
            Dimension::Year => Some(KeyValue::Int(i64::from(self.year))),
            Dimension::Month => Some(KeyValue::Int(i64::from(self.month))),
            Dimension::Day => Some(KeyValue::Int(i64::from(self.day))),
            Dimension::CustomerId => Some(KeyValue::Int(self.customer_id)),
            Dimension::ProductName => Some(KeyValue::Text(self.product_name.clone())),
            Dimension::ProductClass => self.product_class.clone().map(KeyValue::Text),
            Dimension::ProductCategory => self.product_category.clone().map(KeyValue::Text),
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Price => self.price,
            Metric::PurchCost => self.purch_cost,
            Metric::Qty => self.qty,
            Metric::TotRev => self.tot_rev,
            Metric::TotCost => self.tot_cost,
            Metric::NetSales => self.net_sales,
        }
    }

    /// The raw columns this record was derived from.
    pub fn raw(&self) -> TransactionRow {
        TransactionRow {
            tx_date: self.tx_date.format("%Y-%m-%d").to_string(),
            customer_id: self.customer_id,
            product_name: self.product_name.clone(),
            price: self.price,
            purch_cost: self.purch_cost,
            qty: self.qty,
        }
    }
}

/// Columns a table can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    TxDate,
    Year,
    Month,
    Day,
    CustomerId,
    ProductName,
    ProductClass,
    ProductCategory,
}

impl Dimension {
    pub fn name(self) -> &'static str {
        match self {
            Dimension::TxDate => "TX_DATE",
            Dimension::Year => "TX_YER",
            Dimension::Month => "TX_MTH",
            Dimension::Day => "TX_DAY",
            Dimension::CustomerId => "CUSTOMER_ID",
            Dimension::ProductName => "PRODUCT_NAME",
            Dimension::ProductClass => "PRODUCT_CLASS",
            Dimension::ProductCategory => "PRODUCT_CATEGORY",
        }
    }
}

/// Numeric per-row measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Price,
    PurchCost,
    Qty,
    TotRev,
    TotCost,
    NetSales,
}

impl Metric {
    /// The three financial measures most tables carry.
    pub const FINANCIAL: [Metric; 3] = [Metric::TotRev, Metric::TotCost, Metric::NetSales];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Price => "PRICE",
            Metric::PurchCost => "PURCH_COST",
            Metric::Qty => "QTY",
            Metric::TotRev => "TOT_REV",
            Metric::TotCost => "TOT_COST",
            Metric::NetSales => "NET_SALES",
        }
    }
}

/// A grouping key value.
///
/// Values of one dimension always share a variant, so the derived ordering
/// sorts dates chronologically, integers numerically and text lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Int(i64),
    Date(NaiveDate),
    Text(String),
}

impl KeyValue {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            KeyValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            KeyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            KeyValue::Text(s) => f.write_str(s),
        }
    }
}
