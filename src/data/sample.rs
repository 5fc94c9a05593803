//! Synthetic input data: `tx_data_*.csv` batches plus a `map.csv`
//! product mapping, reproducible from a seed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ProductMapping, TransactionRow};
use crate::error::{AppError, EXIT_INPUT, EXIT_OUTPUT};

/// `(class, category, products with list price)`.
const CATALOGUE: &[(&str, &str, &[(&str, f64)])] = &[
    ("Laptops", "Electronics", &[("Aero 13", 1199.0), ("Aero 15", 1499.0), ("Terra 14", 899.0)]),
    ("Phones", "Electronics", &[("Pulse Mini", 499.0), ("Pulse Max", 999.0)]),
    ("Audio", "Electronics", &[("Echo Buds", 129.0), ("Echo Over-Ear", 249.0), ("Studio Dock", 349.0)]),
    ("Desks", "Furniture", &[("Standing Desk", 549.0), ("Corner Desk", 329.0)]),
    ("Chairs", "Furniture", &[("Task Chair", 189.0), ("Mesh Chair", 279.0), ("Stool", 59.0)]),
    ("Lighting", "Furniture", &[("Desk Lamp", 39.0), ("Floor Lamp", 89.0)]),
    ("Paper", "Office Supplies", &[("Copy Paper", 8.5), ("Notebook", 4.0), ("Sticky Notes", 3.0)]),
    ("Writing", "Office Supplies", &[("Gel Pen", 1.5), ("Marker Set", 12.0)]),
    ("Storage", "Office Supplies", &[("Archive Box", 6.0), ("Binder", 4.5)]),
    ("Cables", "Accessories", &[("USB-C Cable", 15.0), ("HDMI Cable", 12.0)]),
    ("Bags", "Accessories", &[("Laptop Sleeve", 35.0), ("Backpack", 79.0)]),
    ("Monitors", "Electronics", &[("View 24", 219.0), ("View 27", 329.0)]),
];

/// Sold but absent from `map.csv`, so reports show join gaps.
const UNMAPPED: &[(&str, f64)] = &[("Gift Card", 50.0)];

#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
    pub rows: usize,
    pub seed: u64,
    pub start: NaiveDate,
    pub days: u32,
    /// Number of `tx_data_*` batches the rows are split into.
    pub files: usize,
    pub customers: u32,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            rows: 5000,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            days: 365,
            files: 4,
            customers: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub transactions: Vec<TransactionRow>,
    pub mapping: Vec<ProductMapping>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleFiles {
    pub transactions: Vec<PathBuf>,
    pub mapping: PathBuf,
}

pub fn generate_sample(spec: &SampleSpec) -> Result<SampleData, AppError> {
    if spec.rows == 0 {
        return Err(AppError::new(EXIT_INPUT, "Sample row count must be > 0."));
    }
    if spec.days == 0 || spec.files == 0 || spec.customers == 0 {
        return Err(AppError::new(EXIT_INPUT, "Sample days, files and customers must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let price_noise =
        Normal::new(1.0_f64, 0.05).map_err(|e| AppError::new(EXIT_OUTPUT, format!("Price distribution error: {e}")))?;

    let products: Vec<(&str, f64, f64)> = CATALOGUE
        .iter()
        .flat_map(|(_, _, items)| items.iter())
        .chain(UNMAPPED.iter())
        .map(|&(name, list)| (name, list, rng.gen_range(0.45..0.8)))
        .collect();

    let mut transactions = Vec::with_capacity(spec.rows);
    for _ in 0..spec.rows {
        let offset = rng.gen_range(0..spec.days);
        let date = spec.start + Duration::days(i64::from(offset));
        let &(name, list, cost_ratio) = products.choose(&mut rng).unwrap_or(&products[0]);
        let price = (list * price_noise.sample(&mut rng).max(0.5) * 100.0).round() / 100.0;
        // Cheap items sell in bulk.
        let max_qty = if list < 20.0 { 40 } else if list < 200.0 { 8 } else { 3 };

        transactions.push(TransactionRow {
            tx_date: date.format("%Y-%m-%d").to_string(),
            customer_id: 1000 + i64::from(rng.gen_range(0..spec.customers)),
            product_name: name.to_string(),
            price,
            purch_cost: (list * cost_ratio * 100.0).round() / 100.0,
            qty: f64::from(rng.gen_range(1..=max_qty)),
        });
    }
    transactions.sort_by(|a, b| a.tx_date.cmp(&b.tx_date));

    let mapping = CATALOGUE
        .iter()
        .flat_map(|(class, category, items)| {
            items.iter().map(move |(name, _)| ProductMapping {
                product_name: (*name).to_string(),
                product_class: Some((*class).to_string()),
                product_category: Some((*category).to_string()),
            })
        })
        .collect();

    Ok(SampleData { transactions, mapping })
}

/// Generate and write `tx_data_NN.csv` batches and `map.csv` into `dir`.
pub fn write_sample(dir: &Path, spec: &SampleSpec) -> Result<SampleFiles, AppError> {
    let data = generate_sample(spec)?;
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to create '{}': {e}", dir.display())))?;

    let batch = data.transactions.len().div_ceil(spec.files);
    let mut transactions = Vec::with_capacity(spec.files);
    for (i, chunk) in data.transactions.chunks(batch).enumerate() {
        let path = dir.join(format!("tx_data_{:02}.csv", i + 1));
        write_rows(&path, chunk)?;
        transactions.push(path);
    }

    let mapping = dir.join("map.csv");
    write_rows(&mapping, &data.mapping)?;

    log::info!(
        "wrote {} transactions in {} files and {} mappings to {}",
        data.transactions.len(),
        transactions.len(),
        data.mapping.len(),
        dir.display()
    );
    Ok(SampleFiles { transactions, mapping })
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let err = |e: &dyn std::fmt::Display| AppError::new(EXIT_OUTPUT, format!("Failed to write '{}': {e}", path.display()));
    let mut writer = csv::Writer::from_path(path).map_err(|e| err(&e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| err(&e))?;
    }
    writer.flush().map_err(|e| err(&e))?;
    Ok(())
}
