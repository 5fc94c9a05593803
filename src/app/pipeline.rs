//! The report pipeline shared by `run` and `summary`.
//!
//! load -> features -> aggregate -> {charts, tables, exports} -> deck
//!
//! Stage failures become `AppError`s prefixed with the stage name. A chart
//! whose options fail validation is logged and skipped together with its
//! slide; every other rendering failure aborts the run.

use std::path::PathBuf;

use chrono::NaiveDate;
use plotters::style::RED;

use crate::analysis::{
    AggregateError, AggregateTable, ClassSeries, Column, Distribution, GroupedMetrics, TopRankings, generate_features,
    labelled_table, moving_averages, top_classes_by_count, top_cost_distribution,
};
use crate::chart::{
    AxisLabels, BarChart, BarOptions, BoxChart, BoxOptions, ChartError, Fill, LIGHT_GREY, LineChart, LineMode,
    LineOptions, Orientation, OutputTargets, SaveOptions, Spines, TableChart, TableStyle,
};
use crate::config::ReportConfig;
use crate::deck::{
    BOXPLOT_OFFSET, ChartSlide, DataTableSlide, Deck, DeckError, SummarySlide, TableSection, TitleSlide,
};
use crate::domain::{Dimension, Metric, ProductMapping, Sale, TransactionRow};
use crate::error::{AppError, EXIT_DATA, EXIT_INPUT, EXIT_OUTPUT, Stage};
use crate::io::{ExportError, LoadError, join_mapping, load_frame, write_tables};
use crate::report::{RunTotals, summary_text};

/// Trimmed from the width of both data-table images, in EMU.
pub const TABLE_WIDTH_TRIM_EMU: i64 = 1_000_000;

/// Everything computed from the input files.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub sales: Vec<Sale>,
    pub totals: RunTotals,
    pub grouped: GroupedMetrics,
    /// Daily sums with `<METRIC>_MA_<W>` columns.
    pub moving: AggregateTable,
    pub rankings: TopRankings,
    pub cost_distribution: Distribution,
    pub class_series: ClassSeries,
}

/// Images produced for the deck; `None` when a chart was skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub cost_distribution: Option<PathBuf>,
    pub top_classes: Option<PathBuf>,
    pub revenue_trend: Option<PathBuf>,
    pub net_sales_and_count: Option<PathBuf>,
    pub product_table: Option<PathBuf>,
    pub class_table: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub analysis: Analysis,
    pub artifacts: Artifacts,
    pub exports: Vec<PathBuf>,
    pub report: PathBuf,
}

/// Full run: analysis, exports, images and the deck.
pub fn run_report(config: &ReportConfig, today: NaiveDate) -> Result<RunOutput, AppError> {
    let analysis = analyze(config)?;

    let exports = if config.export_tables {
        export_tables(config, &analysis)?
    } else {
        Vec::new()
    };

    log::info!("rendering charts");
    let mut artifacts = render_charts(config, &analysis)?;
    log::info!("rendering tables");
    render_tables(config, &analysis, &mut artifacts)?;

    let date = config.report_date.unwrap_or(today);
    log::info!("composing deck from {}", config.template_path.display());
    let report = compose_deck(config, &analysis, &artifacts, date).map_err(deck_err)?;

    Ok(RunOutput {
        analysis,
        artifacts,
        exports,
        report,
    })
}

/// Load, derive features and aggregate.
pub fn analyze(config: &ReportConfig) -> Result<Analysis, AppError> {
    log::info!("loading data from {}", config.data_dir.display());
    let rows: Vec<TransactionRow> = load_frame(&config.data_dir, &config.transactions_root)
        .and_then(|frame| frame.rows())
        .map_err(load_err)?;
    let mapping: Vec<ProductMapping> = load_frame(&config.data_dir, &config.mapping_root)
        .and_then(|frame| frame.rows())
        .map_err(load_err)?;
    log::info!("loaded {} transactions and {} mappings", rows.len(), mapping.len());

    let sales = join_mapping(&generate_features(&rows)?, &mapping);
    if sales.is_empty() {
        return Err(AppError::at(Stage::Load, EXIT_DATA, "no transaction rows to report on"));
    }

    log::info!("aggregating {} sales", sales.len());
    let aggregate_err = |e: AggregateError| AppError::at(Stage::Aggregate, EXIT_INPUT, e);
    let grouped = GroupedMetrics::compute(&sales);
    let moving = moving_averages(&grouped.by_date, &config.moving_average_windows).map_err(aggregate_err)?;
    let rankings = TopRankings::compute(&sales, &grouped, config.top_n).map_err(aggregate_err)?;
    let cost_distribution = top_cost_distribution(&sales, config.top_n).map_err(aggregate_err)?;
    let class_series = top_classes_by_count(&sales, config.top_series).map_err(aggregate_err)?;

    Ok(Analysis {
        totals: RunTotals::compute(&sales),
        sales,
        grouped,
        moving,
        rankings,
        cost_distribution,
        class_series,
    })
}

fn export_tables(config: &ReportConfig, analysis: &Analysis) -> Result<Vec<PathBuf>, AppError> {
    let mut tables: Vec<(&str, &AggregateTable)> = analysis.grouped.named().to_vec();
    tables.push(("moving_averages", &analysis.moving));
    tables.push(("top_products", &analysis.rankings.products_with_counts));
    tables.push(("top_classes", &analysis.rankings.classes_with_counts));
    tables.push(("top_customers_by_revenue", &analysis.rankings.customers_by_revenue));
    tables.push(("top_customers_by_quantity", &analysis.rankings.customers_by_quantity));

    let written =
        write_tables(&config.tables_dir(), &tables).map_err(|e: ExportError| AppError::at(Stage::Export, EXIT_OUTPUT, e))?;
    log::info!("exported {} tables to {}", written.len(), config.tables_dir().display());
    Ok(written)
}

/// The four chart images.
pub fn render_charts(config: &ReportConfig, analysis: &Analysis) -> Result<Artifacts, AppError> {
    Ok(Artifacts {
        cost_distribution: skip_invalid("boxplot", cost_distribution_chart(config, analysis))?,
        top_classes: skip_invalid("timeseries_top", top_classes_chart(config, analysis))?,
        revenue_trend: skip_invalid("timeseries_ma", revenue_trend_chart(config, analysis))?,
        net_sales_and_count: skip_invalid("combo", net_sales_and_count_chart(config, analysis))?,
        ..Artifacts::default()
    })
}

/// The two table images, added to `artifacts`.
pub fn render_tables(config: &ReportConfig, analysis: &Analysis, artifacts: &mut Artifacts) -> Result<(), AppError> {
    let net = Column::Metric(Metric::NetSales);
    let style = TableStyle {
        font_size: config.tables.font_size,
        dpi: config.dpi,
        ..TableStyle::default()
    };
    let tables = [
        (
            &analysis.rankings.products,
            ("PRODUCT_NAME", "Product Name"),
            config.tables.product_col_width,
            "top_10_prods.png",
        ),
        (
            &analysis.rankings.classes,
            ("PRODUCT_CLASS", "Product Class"),
            config.tables.class_col_width,
            "top_10_classes.png",
        ),
    ];

    let mut written = Vec::with_capacity(tables.len());
    for (table, key_label, col_width, file) in tables {
        let projected = table
            .project(&[net])
            .map_err(|e| AppError::at(Stage::Tables, EXIT_INPUT, e))?;
        let data = labelled_table(&projected, net, &[key_label, ("NET_SALES", "Net Sales ($)")]);
        let table_err = |e: ChartError| AppError::at(Stage::Tables, EXIT_OUTPUT, format!("{file}: {e}"));
        let mut chart = TableChart::new(config.tables.row_height, col_width, &data, config.image_path(file));
        chart.plot(&style).map_err(table_err)?;
        let path = chart.save(&SaveOptions::default()).map_err(table_err)?;
        log::debug!("wrote {}", path.display());
        written.push(path);
    }

    let mut written = written.into_iter();
    artifacts.product_table = written.next();
    artifacts.class_table = written.next();
    Ok(())
}

fn targets(config: &ReportConfig, file: &str) -> OutputTargets {
    OutputTargets::many(config.image_targets(file))
}

fn cost_distribution_chart(config: &ReportConfig, analysis: &Analysis) -> Result<Vec<PathBuf>, ChartError> {
    let size = config.charts.cost_distribution.at(config.dpi);
    let mut chart = BoxChart::new(size, &analysis.cost_distribution, targets(config, "boxplot.png"));
    chart.plot(&BoxOptions {
        labels: AxisLabels::new("Cost ($)", "Product Class"),
        ..BoxOptions::default()
    })?;
    chart.save(&SaveOptions::default())
}

fn top_classes_chart(config: &ReportConfig, analysis: &Analysis) -> Result<Vec<PathBuf>, ChartError> {
    let size = config.charts.top_classes.at(config.dpi);
    let mode = LineMode::BySelector {
        column: Column::Metric(Metric::Qty),
        selector: Dimension::ProductClass,
        selectors: analysis.class_series.classes.clone(),
    };
    let options = LineOptions {
        labels: AxisLabels::new("Date", "Quantity Sold"),
        time_axis: true,
        ..LineOptions::new(mode)
    };
    let mut chart = LineChart::new(size, &analysis.class_series.series, targets(config, "timeseries_top.png"));
    chart.plot(Dimension::TxDate, &options)?;
    chart.save(&SaveOptions::default())
}

fn revenue_trend_chart(config: &ReportConfig, analysis: &Analysis) -> Result<Vec<PathBuf>, ChartError> {
    let size = config.charts.revenue_trend.at(config.dpi);
    let mut columns = vec![Column::Metric(Metric::TotRev)];
    let mut labels = vec!["Revenue".to_string()];
    for &w in &config.moving_average_windows {
        columns.push(Column::MovingAverage(Metric::TotRev, w));
        labels.push(format!("Revenue ({w}-day Moving Average)"));
    }
    let options = LineOptions {
        labels: AxisLabels::new("Date", "Revenue"),
        time_axis: true,
        line_width: 2.0,
        ..LineOptions::new(LineMode::Explicit {
            columns: Some(columns),
            colors: None,
            labels: Some(labels),
        })
    };
    let mut chart = LineChart::new(size, &analysis.moving, targets(config, "timeseries_ma.png"));
    chart.plot(Dimension::TxDate, &options)?;
    chart.save(&SaveOptions::default())
}

/// Net-sales bars with the product count on a second y axis.
fn net_sales_and_count_chart(config: &ReportConfig, analysis: &Analysis) -> Result<Vec<PathBuf>, ChartError> {
    let size = config.charts.net_sales_and_count.at(config.dpi);
    let table = &analysis.rankings.classes_with_counts;

    let mut bars = BarChart::new(size, table, targets(config, "combo_top_and_count.png"));
    let bar_options = BarOptions {
        labels: AxisLabels::new("Products", "Net Sales ($)"),
        orientation: Orientation::Vertical,
        fill: Fill::Solid(LIGHT_GREY),
        spines: Spines::right_only(),
        ..BarOptions::default()
    };
    let mut axis = bars.plot_combo(Dimension::ProductClass, Column::Metric(Metric::NetSales), &bar_options)?;

    let counts = LineChart::new(size, table, OutputTargets::none());
    let line_options = LineOptions {
        labels: AxisLabels::new("", "Product Count"),
        spines: Spines::right_only(),
        line_width: 0.9,
        ..LineOptions::new(LineMode::Single {
            column: Column::Count,
            color: RED,
            alpha: 1.0,
        })
    };
    counts.plot_on(&mut axis, Dimension::ProductClass, &line_options)?;

    bars.save(&SaveOptions::default())
}

/// First written path of a chart; `None` (logged) when its options were invalid.
fn skip_invalid(name: &str, result: Result<Vec<PathBuf>, ChartError>) -> Result<Option<PathBuf>, AppError> {
    match result {
        Ok(paths) => {
            log::debug!("{name}: wrote {} file(s)", paths.len());
            Ok(paths.into_iter().next())
        }
        Err(ChartError::Validation(msg)) => {
            log::warn!("skipping chart `{name}` and its slide: {msg}");
            Ok(None)
        }
        Err(e) => Err(AppError::at(Stage::Charts, EXIT_OUTPUT, format!("{name}: {e}"))),
    }
}

/// Build the seven-slide deck from whatever artifacts exist.
pub fn compose_deck(
    config: &ReportConfig,
    analysis: &Analysis,
    artifacts: &Artifacts,
    date: NaiveDate,
) -> Result<PathBuf, DeckError> {
    let mut deck = Deck::open(config.report_path(date), &config.template_path)?.with_image_dpi(config.dpi);

    let mut title = deck.create_slide::<TitleSlide>("title")?;
    title
        .title(&config.report_title)?
        .subtitle(&format!("Generated on - {}", date.format("%b %d, %Y")), 1)?;
    for logo in &config.logos {
        title.logo(logo, None)?;
    }

    let body = match &config.summary_text {
        Some(text) => text.clone(),
        None => summary_text(&analysis.totals, &analysis.rankings),
    };
    deck.create_slide::<SummarySlide>("text")?
        .title("Report Summary")?
        .body(&body, 1)?;

    let charts = [
        (&artifacts.cost_distribution, "Cost Distribution Among Product Classes", BOXPLOT_OFFSET),
        (&artifacts.top_classes, "Average Top 3 Sold Products (2021)", (0.0, 0.0)),
        (&artifacts.revenue_trend, "2021 Revenue and Trends", (0.0, 0.0)),
        (&artifacts.net_sales_and_count, "Average Top 10 Net Sales & Product Count", (0.0, 0.0)),
    ];
    for (image, label, offset) in charts {
        let Some(image) = image else {
            log::warn!("no image for slide `{label}`; skipped");
            continue;
        };
        deck.create_slide::<ChartSlide>("blank")?.title(label)?.chart(image, offset)?;
    }

    let sections: Vec<TableSection> = [
        (&artifacts.product_table, "Top 10 Product Revenue", 1, (-0.25, 0.75)),
        (&artifacts.class_table, "Top 10 Product Class Revenue", 3, (5.35, 0.75)),
    ]
    .into_iter()
    .filter_map(|(image, subtitle, placeholder, offset)| {
        image.as_ref().map(|image| TableSection {
            subtitle: subtitle.to_string(),
            placeholder,
            image: image.clone(),
            offset,
            width_trim_emu: TABLE_WIDTH_TRIM_EMU,
        })
    })
    .collect();
    if !sections.is_empty() {
        let mut slide = deck.create_slide::<DataTableSlide>("two_columns")?;
        slide.title("Top Product and Class Revenue")?;
        for section in &sections {
            slide.section(section)?;
        }
    }

    deck.save()
}

fn load_err(e: LoadError) -> AppError {
    let code = match e {
        LoadError::NotFound { .. } | LoadError::Dir { .. } => EXIT_INPUT,
        LoadError::Csv { .. } | LoadError::Row { .. } => EXIT_DATA,
    };
    AppError::at(Stage::Load, code, e)
}

fn deck_err(e: DeckError) -> AppError {
    let code = match e {
        DeckError::UnknownLayout(_)
        | DeckError::MissingLayout { .. }
        | DeckError::MissingPlaceholder { .. }
        | DeckError::SectionLimit(_)
        | DeckError::ImageLimit { .. }
        | DeckError::UnsupportedImage { .. }
        | DeckError::Package(_) => EXIT_INPUT,
        _ => EXIT_OUTPUT,
    };
    AppError::at(Stage::Deck, code, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleSpec, write_sample};
    use crate::deck::testutil::{write_png, write_template};
    use std::fs::File;
    use std::io::Read;

    fn config_for(dir: &std::path::Path) -> ReportConfig {
        ReportConfig {
            data_dir: dir.join("data"),
            output_dir: dir.join("out"),
            template_path: write_template(dir, 5),
            report_date: NaiveDate::from_ymd_opt(2021, 12, 31),
            ..ReportConfig::default()
        }
    }

    fn sample(dir: &std::path::Path) {
        let spec = SampleSpec {
            rows: 400,
            seed: 3,
            files: 2,
            ..SampleSpec::default()
        };
        write_sample(&dir.join("data"), &spec).unwrap();
    }

    #[test]
    fn missing_input_exits_with_input_code() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        let err = analyze(&config_for(dir.path())).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.message().starts_with("[load] No data with file root 'tx_data_'"));
    }

    #[test]
    fn malformed_row_exits_with_data_code() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(
            data.join("tx_data_1.csv"),
            "TX_DATE,CUSTOMER_ID,PRODUCT_NAME,PRICE,PURCH_COST,QTY\n2021-01-01,1,Widget,ten,4,2\n",
        )
        .unwrap();
        std::fs::write(data.join("map.csv"), "PRODUCT_NAME,PRODUCT_CLASS,PRODUCT_CATEGORY\nWidget,A,Tools\n").unwrap();

        let err = analyze(&config_for(dir.path())).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
        assert!(err.message().starts_with("[load]"));
    }

    #[test]
    fn analysis_of_sample_data() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        let config = config_for(dir.path());
        let a = analyze(&config).unwrap();

        assert_eq!(a.totals.rows, 400);
        assert!(a.rankings.products.len() <= config.top_n);
        assert_eq!(a.class_series.classes.len(), config.top_series);
        assert!(a.moving.column(Column::MovingAverage(Metric::TotRev, 30)).is_some());
        assert!(a.moving.column(Column::MovingAverage(Metric::Qty, 7)).is_some());
        assert!(a.sales.windows(2).all(|w| (w[0].tx_date, w[0].customer_id) <= (w[1].tx_date, w[1].customer_id)));
        for s in &a.sales {
            assert!((s.net_sales - (s.tot_rev - s.tot_cost)).abs() < 1e-9);
        }
    }

    #[test]
    fn exports_land_under_tables_dir() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        let config = config_for(dir.path());
        let a = analyze(&config).unwrap();
        let written = export_tables(&config, &a).unwrap();
        assert_eq!(written.len(), 12);
        assert!(written.iter().all(|p| p.starts_with(config.tables_dir())));
        assert!(config.tables_dir().join("moving_averages.csv").exists());
    }

    #[test]
    fn invalid_chart_is_skipped_other_errors_are_fatal() {
        let skipped = skip_invalid("x", Err(ChartError::Validation("mismatch".into()))).unwrap();
        assert_eq!(skipped, None);

        let err = skip_invalid("x", Err(ChartError::NotDrawn)).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_OUTPUT);
        assert!(err.message().starts_with("[charts] x:"));

        let first = skip_invalid("x", Ok(vec!["a.png".into(), "b.png".into()])).unwrap();
        assert_eq!(first, Some(PathBuf::from("a.png")));
    }

    #[test]
    fn deck_has_one_slide_per_artifact() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        let config = config_for(dir.path());
        let a = analyze(&config).unwrap();

        let png = |name: &str| Some(write_png(&dir.path().join(name), 300, 200));
        let artifacts = Artifacts {
            cost_distribution: png("boxplot.png"),
            top_classes: None,
            revenue_trend: png("ma.png"),
            net_sales_and_count: png("combo.png"),
            product_table: png("prods.png"),
            class_table: png("classes.png"),
        };
        let date = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();
        let report = compose_deck(&config, &a, &artifacts, date).unwrap();
        assert_eq!(report, dir.path().join("out").join("report_2021-12-31.pptx"));

        let mut archive = zip::ZipArchive::new(File::open(&report).unwrap()).unwrap();
        let mut presentation = String::new();
        archive
            .by_name("ppt/presentation.xml")
            .unwrap()
            .read_to_string(&mut presentation)
            .unwrap();
        // title, summary, three charts, tables
        assert_eq!(presentation.matches("<p:sldId ").count(), 6);

        let mut title = String::new();
        archive
            .by_name("ppt/slides/slide1.xml")
            .unwrap()
            .read_to_string(&mut title)
            .unwrap();
        assert!(title.contains("<a:t>2021 Profitability Report</a:t>"));
        assert!(title.contains("<a:t>Generated on - Dec 31, 2021</a:t>"));

        let mut summary = String::new();
        archive
            .by_name("ppt/slides/slide2.xml")
            .unwrap()
            .read_to_string(&mut summary)
            .unwrap();
        assert!(summary.contains("400 transactions"));
    }

    #[test]
    fn layout_problems_exit_with_input_code() {
        let err = deck_err(DeckError::UnknownLayout("x".into()));
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert_eq!(deck_err(DeckError::NoSlides).exit_code(), EXIT_OUTPUT);
    }

    #[test]
    fn full_run_writes_images_tables_and_report() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        let config = config_for(dir.path());
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();

        let out = run_report(&config, today).unwrap();
        assert_eq!(out.report, dir.path().join("out").join("report_2021-12-31.pptx"));
        assert_eq!(out.exports.len(), 12);
        for image in [
            &out.artifacts.cost_distribution,
            &out.artifacts.top_classes,
            &out.artifacts.revenue_trend,
            &out.artifacts.net_sales_and_count,
            &out.artifacts.product_table,
            &out.artifacts.class_table,
        ] {
            assert!(image.as_ref().is_some_and(|p| p.exists()));
        }

        let archive = zip::ZipArchive::new(File::open(&out.report).unwrap()).unwrap();
        let slides = archive
            .file_names()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .count();
        assert_eq!(slides, 7);
    }
}
