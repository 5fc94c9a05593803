//! Command-line parsing for the sales report generator.
//!
//! Parsing stays separate from the pipeline: clap produces these structs and
//! `app` folds them over the loaded `ReportConfig`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::ReportConfig;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sales-deck", version, about = "Sales transaction report generator (charts + pptx deck)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load, aggregate, render charts and tables, and write the slide deck.
    Run(RunArgs),
    /// Load and aggregate, then print the run summary only.
    Summary(RunArgs),
    /// Write synthetic `tx_data_*.csv` and `map.csv` input files.
    Sample(SampleArgs),
}

/// Options shared by `run` and `summary`. Every flag overrides the config file.
#[derive(Debug, Args, Clone, Default)]
pub struct RunArgs {
    /// JSON config file (defaults to `$SALES_DECK_CONFIG`, then built-in defaults).
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory containing the input CSV files.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for images, table exports and the report.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Template `.pptx` whose first slide master supplies the layouts.
    #[arg(short = 't', long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Rows in each top-N table.
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Report date used in the file name and subtitle (default: today).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Skip the aggregate CSV exports.
    #[arg(long)]
    pub no_export: bool,
}

impl RunArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut ReportConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.template {
            config.template_path = path.clone();
        }
        if let Some(n) = self.top {
            config.top_n = n;
        }
        if let Some(date) = self.date {
            config.report_date = Some(date);
        }
        if self.no_export {
            config.export_tables = false;
        }
    }
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Directory that receives the CSV files.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Number of transactions to generate.
    #[arg(short = 'n', long, default_value_t = 5000)]
    pub rows: usize,

    /// Random seed; the same seed writes the same files.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of `tx_data_*` batches to split the rows into.
    #[arg(long, default_value_t = 4)]
    pub files: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_override_config() {
        let cli = Cli::parse_from([
            "sales-deck",
            "run",
            "--data-dir",
            "in",
            "--top",
            "5",
            "--date",
            "2021-12-31",
            "--no-export",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };

        let mut config = ReportConfig::default();
        args.apply(&mut config);
        assert_eq!(config.data_dir, PathBuf::from("in"));
        assert_eq!(config.top_n, 5);
        assert_eq!(config.report_date, NaiveDate::from_ymd_opt(2021, 12, 31));
        assert!(!config.export_tables);
        assert_eq!(config.output_dir, ReportConfig::default().output_dir);
    }

    #[test]
    fn sample_defaults() {
        let cli = Cli::parse_from(["sales-deck", "sample", "--out", "data"]);
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!((args.rows, args.seed, args.files), (5000, 42, 4));
    }

    #[test]
    fn bad_date_is_a_parse_error() {
        assert!(Cli::try_parse_from(["sales-deck", "run", "--date", "31/12/2021"]).is_err());
    }
}
