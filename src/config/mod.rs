//! Report configuration.
//!
//! Every field has a default, so an absent config file produces the stock
//! report. A JSON file named by `--config` or by `SALES_DECK_CONFIG` (read
//! from the environment or a `.env` file) overrides the defaults; unknown
//! keys are rejected. CLI flags are applied on top by the caller.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chart::FigureSize;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "SALES_DECK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Width and height of one figure, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inches {
    pub width: f64,
    pub height: f64,
}

impl Inches {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn at(self, dpi: u32) -> FigureSize {
        FigureSize::new(self.width, self.height, dpi)
    }
}

/// Figure sizes of the four chart images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartSizes {
    pub cost_distribution: Inches,
    pub top_classes: Inches,
    pub revenue_trend: Inches,
    pub net_sales_and_count: Inches,
}

impl Default for ChartSizes {
    fn default() -> Self {
        Self {
            cost_distribution: Inches::new(8.0, 5.0),
            top_classes: Inches::new(12.0, 5.5),
            revenue_trend: Inches::new(12.0, 5.0),
            net_sales_and_count: Inches::new(10.0, 5.5),
        }
    }
}

/// Cell geometry of the two table images, in inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableSizes {
    pub row_height: f64,
    pub product_col_width: f64,
    pub class_col_width: f64,
    pub font_size: f64,
}

impl Default for TableSizes {
    fn default() -> Self {
        Self {
            row_height: 0.4,
            product_col_width: 4.0,
            class_col_width: 2.0,
            font_size: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Directory scanned for input CSV files.
    pub data_dir: PathBuf,
    /// File-name substring selecting transaction files.
    pub transactions_root: String,
    /// File-name substring selecting product-mapping files.
    pub mapping_root: String,
    pub output_dir: PathBuf,
    /// Chart and table images, relative to `output_dir`.
    pub image_dir: PathBuf,
    /// Extra directories that receive a copy of every chart image.
    pub mirror_dirs: Vec<PathBuf>,
    pub template_path: PathBuf,
    pub report_title: String,
    /// Body of the summary slide; generated from run totals when absent.
    pub summary_text: Option<String>,
    /// Date in the output file name and subtitle; today when absent.
    pub report_date: Option<NaiveDate>,
    pub top_n: usize,
    /// Most frequent classes drawn on the quantity time series.
    pub top_series: usize,
    pub moving_average_windows: Vec<usize>,
    pub dpi: u32,
    pub charts: ChartSizes,
    pub tables: TableSizes,
    /// At most two title-slide logos.
    pub logos: Vec<PathBuf>,
    /// Write the grouped tables as CSV under `<output_dir>/tables/`.
    pub export_tables: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            transactions_root: "tx_data_".to_string(),
            mapping_root: "map".to_string(),
            output_dir: PathBuf::from("output"),
            image_dir: PathBuf::from("img"),
            mirror_dirs: Vec::new(),
            template_path: PathBuf::from("design_template.pptx"),
            report_title: "2021 Profitability Report".to_string(),
            summary_text: None,
            report_date: None,
            top_n: 10,
            top_series: 3,
            moving_average_windows: vec![7, 30],
            dpi: 100,
            charts: ChartSizes::default(),
            tables: TableSizes::default(),
            logos: Vec::new(),
            export_tables: true,
        }
    }
}

impl ReportConfig {
    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path first, then `SALES_DECK_CONFIG`, then the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        dotenvy::dotenv().ok();
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => {
                log::debug!("config from {CONFIG_ENV}");
                Self::from_file(Path::new(&path))
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".to_string()));
        }
        if self.top_series == 0 {
            return Err(ConfigError::Invalid("top_series must be at least 1".to_string()));
        }
        if self.moving_average_windows.contains(&0) {
            return Err(ConfigError::Invalid("moving-average windows must be at least 1".to_string()));
        }
        if self.dpi == 0 {
            return Err(ConfigError::Invalid("dpi must be positive".to_string()));
        }
        if self.logos.len() > 2 {
            return Err(ConfigError::Invalid(format!(
                "at most two logos fit on the title slide, got {}",
                self.logos.len()
            )));
        }
        if self.transactions_root.is_empty() || self.mapping_root.is_empty() {
            return Err(ConfigError::Invalid("file roots must not be empty".to_string()));
        }
        let sizes = [
            self.charts.cost_distribution,
            self.charts.top_classes,
            self.charts.revenue_trend,
            self.charts.net_sales_and_count,
        ];
        let tables = [self.tables.row_height, self.tables.product_col_width, self.tables.class_col_width];
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !sizes.iter().all(|s| positive(s.width) && positive(s.height)) || !tables.iter().all(|v| positive(*v)) {
            return Err(ConfigError::Invalid("figure and cell sizes must be positive".to_string()));
        }
        Ok(())
    }

    pub fn image_path(&self, file: &str) -> PathBuf {
        self.output_dir.join(&self.image_dir).join(file)
    }

    /// `file` under the image directory and every mirror directory.
    pub fn image_targets(&self, file: &str) -> Vec<PathBuf> {
        std::iter::once(self.image_path(file))
            .chain(self.mirror_dirs.iter().map(|d| d.join(file)))
            .collect()
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.output_dir.join("tables")
    }

    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.output_dir.join(format!("report_{}.pptx", date.format("%Y-%m-%d")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config: ReportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.moving_average_windows, vec![7, 30]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        fs::write(
            &path,
            r#"{"top_n": 5, "report_date": "2021-12-31", "charts": {"revenue_trend": {"width": 6, "height": 3}}}"#,
        )
        .unwrap();

        let config = ReportConfig::from_file(&path).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.report_date, NaiveDate::from_ymd_opt(2021, 12, 31));
        assert_eq!(config.charts.revenue_trend, Inches::new(6.0, 3.0));
        assert_eq!(config.charts.top_classes, Inches::new(12.0, 5.5));
        assert_eq!(config.mapping_root, "map");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        fs::write(&path, r#"{"top": 5}"#).unwrap();
        assert!(matches!(ReportConfig::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = ReportConfig {
            moving_average_windows: vec![7, 0],
            ..ReportConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ReportConfig {
            logos: vec!["a.png".into(), "b.png".into(), "c.png".into()],
            ..ReportConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn output_paths() {
        let config = ReportConfig {
            output_dir: "out".into(),
            mirror_dirs: vec!["mirror".into()],
            ..ReportConfig::default()
        };
        let date = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        assert_eq!(config.report_path(date), PathBuf::from("out/report_2021-03-04.pptx"));
        assert_eq!(
            config.image_targets("boxplot.png"),
            vec![PathBuf::from("out/img/boxplot.png"), PathBuf::from("mirror/boxplot.png")]
        );
    }
}
