//! Export grouped tables to CSV.
//!
//! One file per table, keys first and value columns after, so the numbers
//! behind every chart can be checked in a spreadsheet.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::analysis::AggregateTable;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create export directory '{}': {source}", path.display())]
    Dir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write export CSV '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Write one table. `NaN` values are written as empty cells.
pub fn write_table_csv(path: &Path, table: &AggregateTable) -> Result<(), ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;

    let columns: Vec<_> = table.columns().collect();
    let header = table
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .chain(columns.iter().map(ToString::to_string));
    writer.write_record(header).map_err(csv_err)?;

    for (row, key) in table.keys().iter().enumerate() {
        let values = columns.iter().map(|c| {
            let v = table.column(*c).map_or(f64::NAN, |vals| vals[row]);
            if v.is_finite() { format!("{v:.4}") } else { String::new() }
        });
        let record: Vec<String> = key.iter().map(ToString::to_string).chain(values).collect();
        writer.write_record(&record).map_err(csv_err)?;
    }

    writer
        .flush()
        .map_err(|e| csv_err(csv::Error::from(e)))?;
    Ok(())
}

/// Write every `(name, table)` pair to `<dir>/<name>.csv`.
pub fn write_tables(dir: &Path, tables: &[(&str, &AggregateTable)]) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Dir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(tables.len());
    for (name, table) in tables {
        let path = dir.join(format!("{name}.csv"));
        write_table_csv(&path, table)?;
        log::debug!("exported {} rows to {}", table.len(), path.display());
        written.push(path);
    }
    Ok(written)
}
