//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module:
//! - parses CLI arguments
//! - resolves the report configuration
//! - runs the report pipeline or prints its summary
//! - writes synthetic input data

use std::path::Path;

use clap::Parser;

use crate::cli::{Command, RunArgs, SampleArgs};
use crate::config::ReportConfig;
use crate::data::{SampleSpec, write_sample};
use crate::error::{AppError, EXIT_INPUT, Stage};

pub mod pipeline;

/// Entry point for the `sales-deck` binary.
pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(&args),
        Command::Summary(args) => handle_summary(&args),
        Command::Sample(args) => handle_sample(&args),
    }
}

/// Config file (or defaults) with the CLI flags applied on top.
pub fn resolve_config(args: &RunArgs) -> Result<ReportConfig, AppError> {
    let config_err = |e: &dyn std::fmt::Display| AppError::at(Stage::Config, EXIT_INPUT, e);
    let mut config = ReportConfig::discover(args.config.as_deref()).map_err(|e| config_err(&e))?;
    args.apply(&mut config);
    config.validate().map_err(|e| config_err(&e))?;
    Ok(config)
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let config = resolve_config(args)?;
    let out = pipeline::run_report(&config, chrono::Local::now().date_naive())?;

    println!(
        "{}",
        crate::report::format_run_summary(&out.analysis.totals, &out.analysis.rankings)
    );
    if !out.exports.is_empty() {
        println!("Exported {} tables to {}", out.exports.len(), config.tables_dir().display());
    }
    println!("Report written to {}", out.report.display());
    Ok(())
}

fn handle_summary(args: &RunArgs) -> Result<(), AppError> {
    let config = resolve_config(args)?;
    let analysis = pipeline::analyze(&config)?;
    println!(
        "{}",
        crate::report::format_run_summary(&analysis.totals, &analysis.rankings)
    );
    Ok(())
}

fn handle_sample(args: &SampleArgs) -> Result<(), AppError> {
    let spec = SampleSpec {
        rows: args.rows,
        seed: args.seed,
        files: args.files,
        ..SampleSpec::default()
    };
    let files = write_sample(Path::new(&args.out), &spec)?;
    for path in files.transactions.iter().chain(std::iter::once(&files.mapping)) {
        println!("{}", path.display());
    }
    Ok(())
}

/// Rewrite argv so `sales-deck` defaults to `sales-deck run`.
///
/// Rules:
/// - `sales-deck`                      -> `sales-deck run`
/// - `sales-deck -d data ...`          -> `sales-deck run -d data ...`
/// - `sales-deck --help/--version/-h`  -> unchanged (top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "summary" | "sample");
    if is_subcommand {
        return argv;
    }

    // A leading flag belongs to `run`.
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}
