//! CSV discovery, concatenation and the product-mapping join.
//!
//! Source files are selected by a substring of their file name (`tx_data_`
//! batches, the `map` table) inside one data directory. Loading performs no
//! schema validation; typed views are produced on demand by `Frame::rows`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::{ProductMapping, Sale};

#[derive(Debug, Error)]
pub enum LoadError {
    /// No file in the directory matched the requested root.
    #[error("No data with file root '{root}' found in '{}'.", dir.display())]
    NotFound { root: String, dir: PathBuf },
    #[error("Failed to read data directory '{}': {source}", dir.display())]
    Dir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read CSV '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Malformed row in '{}' (line {line}): {source}", path.display())]
    Row {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },
}

/// Rows read from one source file.
#[derive(Debug, Clone)]
pub struct FramePart {
    pub path: PathBuf,
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
}

/// The concatenation of every file matched by one root, in file-name order.
#[derive(Debug, Clone)]
pub struct Frame {
    parts: Vec<FramePart>,
}

impl Frame {
    pub fn from_parts(parts: Vec<FramePart>) -> Self {
        Self { parts }
    }

    pub fn len(&self) -> usize {
        self.parts.iter().map(|p| p.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parts(&self) -> &[FramePart] {
        &self.parts
    }

    /// Deserialize every row by header name.
    ///
    /// Headers are matched per file, so batches may order their columns
    /// differently.
    pub fn rows<T: DeserializeOwned>(&self) -> Result<Vec<T>, LoadError> {
        let mut out = Vec::with_capacity(self.len());
        for part in &self.parts {
            for record in &part.records {
                let row = record.deserialize(Some(&part.headers)).map_err(|source| LoadError::Row {
                    path: part.path.clone(),
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    source,
                })?;
                out.push(row);
            }
        }
        Ok(out)
    }
}

/// List CSV files in `dir` whose file name contains `root`, sorted by name.
pub fn matching_files(dir: &Path, root: &str) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Dir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Dir {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv && name.contains(root) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load and concatenate every file matching `root`.
pub fn load_frame(dir: &Path, root: &str) -> Result<Frame, LoadError> {
    let files = matching_files(dir, root)?;
    if files.is_empty() {
        return Err(LoadError::NotFound {
            root: root.to_string(),
            dir: dir.to_path_buf(),
        });
    }

    let mut parts = Vec::with_capacity(files.len());
    for path in files {
        let part = read_part(&path)?;
        log::debug!("read {} rows from {}", part.records.len(), path.display());
        parts.push(part);
    }
    Ok(Frame::from_parts(parts))
}

fn read_part(path: &Path) -> Result<FramePart, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers: StringRecord = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(normalize_header_name)
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        records.push(result.map_err(csv_err)?);
    }

    Ok(FramePart {
        path: path.to_path_buf(),
        headers,
        records,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet tools sometimes emit a BOM before the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_uppercase()
}

/// Left-join product class/category onto sales by product name.
///
/// Unmatched products keep `None`. When the mapping lists a product twice the
/// first entry wins.
pub fn join_mapping(sales: &[Sale], mappings: &[ProductMapping]) -> Vec<Sale> {
    let mut by_name: HashMap<&str, &ProductMapping> = HashMap::with_capacity(mappings.len());
    for m in mappings {
        if by_name.contains_key(m.product_name.as_str()) {
            log::warn!("duplicate mapping for product '{}', keeping the first", m.product_name);
            continue;
        }
        by_name.insert(m.product_name.as_str(), m);
    }

    let mut unmatched = 0usize;
    let joined = sales
        .iter()
        .map(|s| {
            let mut sale = s.clone();
            match by_name.get(s.product_name.as_str()) {
                Some(m) => {
                    sale.product_class = m.product_class.clone();
                    sale.product_category = m.product_category.clone();
                }
                None => unmatched += 1,
            }
            sale
        })
        .collect();

    if unmatched > 0 {
        log::warn!("{unmatched} sales rows have no product mapping");
    }
    joined
}
