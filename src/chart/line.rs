//! Line charts over a key dimension: single series, one series per selector
//! value, or an explicit list of columns.

use std::path::PathBuf;

use plotters::prelude::*;

use crate::analysis::{AggregateTable, Column};
use crate::chart::axes::{Frame, LabelRoom, Layout, Scale, draw_spines, format_tick, value_range};
use crate::chart::{
    AxisLabels, Canvas, ChartError, FigureSize, LIGHT_GREY, OutputTargets, SaveOptions, SecondaryAxis, Spines, TABLEAU,
    draw_err, save_all,
};
use crate::domain::{Dimension, KeyValue};

/// Which series a line chart draws.
#[derive(Debug, Clone, PartialEq)]
pub enum LineMode {
    /// One unlabelled series.
    Single { column: Column, color: RGBColor, alpha: f64 },
    /// One series per selector value, opacity rising with position; the
    /// legend shows the selector values.
    BySelector {
        column: Column,
        selector: Dimension,
        selectors: Vec<KeyValue>,
    },
    /// Parallel lists of columns, colours and legend labels. Colours default
    /// to the Tableau palette.
    Explicit {
        columns: Option<Vec<Column>>,
        colors: Option<Vec<RGBColor>>,
        labels: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineOptions {
    pub labels: AxisLabels,
    pub mode: LineMode,
    pub spines: Spines,
    /// Format x ticks as dates and rotate them.
    pub time_axis: bool,
    /// Stroke width in points.
    pub line_width: f64,
}

impl LineOptions {
    pub fn new(mode: LineMode) -> Self {
        Self {
            labels: AxisLabels::default(),
            mode,
            spines: Spines::default(),
            time_axis: false,
            line_width: 1.5,
        }
    }
}

/// Opacity per selector series: `0.3 + i * 0.7 / n`.
pub fn alpha_ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.3 + i as f64 * 0.7 / n as f64).collect()
}

/// Zip explicit columns with colours and labels, or explain why not.
pub fn resolve_explicit(
    columns: Option<&[Column]>,
    colors: Option<&[RGBColor]>,
    labels: Option<&[String]>,
) -> Result<Vec<(Column, RGBColor, String)>, ChartError> {
    let (Some(columns), Some(labels)) = (columns, labels) else {
        return Err(ChartError::Validation(
            "explicit line series need both a column list and a legend label list".to_string(),
        ));
    };
    let colors: Vec<RGBColor> = match colors {
        Some(c) => c.to_vec(),
        None => TABLEAU.iter().copied().take(columns.len()).collect(),
    };
    if colors.len() != columns.len() || labels.len() != columns.len() {
        return Err(ChartError::Validation(format!(
            "columns ({}), colours ({}) and legend labels ({}) must have the same length",
            columns.len(),
            colors.len(),
            labels.len()
        )));
    }
    Ok(columns
        .iter()
        .zip(colors)
        .zip(labels)
        .map(|((col, color), label)| (*col, color, label.clone()))
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
struct Series {
    label: Option<String>,
    color: RGBColor,
    alpha: f64,
    points: Vec<(f64, f64)>,
}

impl Series {
    fn ys(series: &[Series]) -> impl Iterator<Item = f64> + '_ {
        series.iter().flat_map(|s| s.points.iter().map(|p| p.1))
    }
}

pub struct LineChart<'t> {
    size: FigureSize,
    table: &'t AggregateTable,
    targets: OutputTargets,
    canvas: Option<Canvas>,
}

impl<'t> LineChart<'t> {
    pub fn new(size: FigureSize, table: &'t AggregateTable, targets: OutputTargets) -> Self {
        Self {
            size,
            table,
            targets,
            canvas: None,
        }
    }

    pub fn plot(&mut self, x: Dimension, options: &LineOptions) -> Result<(), ChartError> {
        self.draw(x, options, false).map(|_| ())
    }

    /// Draw the lines with room for a right-hand axis and hand that axis back.
    pub fn plot_combo(&mut self, x: Dimension, options: &LineOptions) -> Result<SecondaryAxis<'_>, ChartError> {
        let frame = self.draw(x, options, true)?;
        let canvas = self.canvas.as_mut().ok_or(ChartError::NotDrawn)?;
        Ok(SecondaryAxis { canvas, frame })
    }

    /// Draw onto another chart's secondary y axis, sharing its x axis. This
    /// chart keeps no canvas of its own; the owner of `axis` saves the result.
    pub fn plot_on(&self, axis: &mut SecondaryAxis<'_>, x: Dimension, options: &LineOptions) -> Result<(), ChartError> {
        let series = self.series(x, &options.mode, axis.x_scale())?;
        let y_range = value_range(Series::ys(&series), false)
            .ok_or_else(|| ChartError::EmptyData("overlay has no finite values".to_string()))?;
        let frame = axis.frame.clone();
        let stroke = self.size.pt(options.line_width);

        let root = axis.canvas.backend().into_drawing_area();
        let mut chart = frame
            .layout
            .build(&root, frame.x_range.clone(), frame.y_range.clone())?
            .set_secondary_coord(frame.x_range.clone(), y_range);

        chart
            .configure_secondary_axes()
            .y_desc(options.labels.y.as_str())
            .y_label_formatter(&|v| format_tick(*v))
            .label_style(frame.layout.label_font())
            .axis_desc_style(frame.layout.desc_font())
            .draw()
            .map_err(draw_err)?;

        for s in &series {
            let (color, alpha) = (s.color, s.alpha);
            let anno = chart
                .draw_secondary_series(LineSeries::new(s.points.iter().copied(), color.mix(alpha).stroke_width(stroke)))
                .map_err(draw_err)?;
            if let Some(label) = &s.label {
                anno.label(label.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.mix(alpha).stroke_width(stroke))
                });
            }
        }
        if series.iter().any(|s| s.label.is_some()) {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(&WHITE.mix(0.8))
                .border_style(&LIGHT_GREY)
                .label_font(frame.layout.label_font())
                .draw()
                .map_err(draw_err)?;
        }
        root.present().map_err(draw_err)
    }

    pub fn save(self, options: &SaveOptions) -> Result<Vec<PathBuf>, ChartError> {
        let canvas = self.canvas.ok_or(ChartError::NotDrawn)?;
        save_all(&canvas, &self.targets, options)
    }

    fn draw(&mut self, x: Dimension, options: &LineOptions, secondary: bool) -> Result<Frame, ChartError> {
        self.canvas = None;

        let keys = self
            .table
            .key_column(x)
            .ok_or_else(|| ChartError::MissingColumn(x.name().to_string()))?;
        let scale = Scale::infer(&keys);
        let series = self.series(x, &options.mode, &scale)?;

        let xs: Vec<f64> = series.iter().flat_map(|s| s.points.iter().map(|p| p.0)).collect();
        let x_range = scale.range(&xs);
        let y_range = value_range(Series::ys(&series), false)
            .ok_or_else(|| ChartError::EmptyData(format!("no finite values to draw against `{}`", x.name())))?;

        let layout = Layout::new(
            self.size,
            LabelRoom {
                left_chars: 6,
                bottom_chars: scale.widest_label(),
                rotated_bottom: options.time_axis,
                secondary,
            },
        );
        let stroke = self.size.pt(options.line_width);

        let mut canvas = Canvas::new(self.size);
        {
            let root = canvas.backend().into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            let mut chart = layout.build(&root, x_range.clone(), y_range.clone())?;

            let x_style = if options.time_axis {
                layout.label_font().transform(FontTransform::Rotate90)
            } else {
                layout.label_font()
            };
            chart
                .configure_mesh()
                .disable_mesh()
                .x_desc(options.labels.x.as_str())
                .y_desc(options.labels.y.as_str())
                .x_labels(scale.tick_count())
                .y_labels(8)
                .x_label_formatter(&|v| scale.label(*v))
                .y_label_formatter(&|v| format_tick(*v))
                .label_style(layout.label_font())
                .x_label_style(x_style)
                .axis_desc_style(layout.desc_font())
                .axis_style(&BLACK)
                .draw()
                .map_err(draw_err)?;

            for s in &series {
                let (color, alpha) = (s.color, s.alpha);
                let anno = chart
                    .draw_series(LineSeries::new(s.points.iter().copied(), color.mix(alpha).stroke_width(stroke)))
                    .map_err(draw_err)?;
                if let Some(label) = &s.label {
                    anno.label(label.as_str()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.mix(alpha).stroke_width(stroke))
                    });
                }
            }
            if series.iter().any(|s| s.label.is_some()) {
                chart
                    .configure_series_labels()
                    .position(SeriesLabelPosition::UpperLeft)
                    .background_style(&WHITE.mix(0.8))
                    .border_style(&LIGHT_GREY)
                    .label_font(layout.label_font())
                    .draw()
                    .map_err(draw_err)?;
            }

            draw_spines(&root, chart.plotting_area().get_pixel_range(), options.spines)?;
            root.present().map_err(draw_err)?;
        }

        log::debug!("line chart: {} series against `{}`", series.len(), x.name());
        self.canvas = Some(canvas);
        Ok(Frame {
            layout,
            x: scale,
            x_range,
            y_range,
        })
    }

    /// Build every series before any canvas exists, so option errors leave
    /// nothing behind.
    fn series(&self, x: Dimension, mode: &LineMode, scale: &Scale) -> Result<Vec<Series>, ChartError> {
        let keys = self
            .table
            .key_column(x)
            .ok_or_else(|| ChartError::MissingColumn(x.name().to_string()))?;
        let values = |column: Column| {
            self.table
                .column(column)
                .ok_or_else(|| ChartError::MissingColumn(column.to_string()))
        };
        let series = match mode {
            LineMode::Single { column, color, alpha } => vec![Series {
                label: None,
                color: *color,
                alpha: *alpha,
                points: collect_points(&keys, values(*column)?, scale, |_| true),
            }],
            LineMode::BySelector {
                column,
                selector,
                selectors,
            } => {
                let vals = values(*column)?;
                let picked = self
                    .table
                    .key_column(*selector)
                    .ok_or_else(|| ChartError::MissingColumn(selector.name().to_string()))?;
                selectors
                    .iter()
                    .zip(alpha_ramp(selectors.len()))
                    .map(|(sel, alpha)| Series {
                        label: Some(sel.to_string()),
                        color: TABLEAU[0],
                        alpha,
                        points: collect_points(&keys, vals, scale, |i| picked[i] == sel),
                    })
                    .collect()
            }
            LineMode::Explicit { columns, colors, labels } => {
                let resolved = resolve_explicit(columns.as_deref(), colors.as_deref(), labels.as_deref())
                    .inspect_err(|e| log::error!("{e}"))?;
                let mut out = Vec::with_capacity(resolved.len());
                for (column, color, label) in resolved {
                    out.push(Series {
                        label: Some(label),
                        color,
                        alpha: 1.0,
                        points: collect_points(&keys, values(column)?, scale, |_| true),
                    });
                }
                out
            }
        };
        Ok(series)
    }
}

/// Finite `(x, y)` pairs for the kept rows, sorted by x.
fn collect_points(keys: &[&KeyValue], values: &[f64], scale: &Scale, keep: impl Fn(usize) -> bool) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = keys
        .iter()
        .zip(values)
        .enumerate()
        .filter(|(i, (_, v))| keep(*i) && v.is_finite())
        .filter_map(|(_, (k, v))| scale.position(k).map(|p| (p, *v)))
        .collect();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));
    pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Agg, aggregate, moving_averages};
    use crate::domain::{Metric, Sale};
    use chrono::NaiveDate;

    fn sale(day: u32, class: &str, qty: f64) -> Sale {
        Sale {
            tx_date: NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            year: 2021,
            month: 1,
            day,
            customer_id: 1,
            product_name: "p".into(),
            price: 2.0,
            purch_cost: 1.0,
            qty,
            tot_rev: 2.0 * qty,
            tot_cost: qty,
            net_sales: qty,
            product_class: Some(class.into()),
            product_category: None,
        }
    }

    fn by_date() -> AggregateTable {
        let sales: Vec<Sale> = (1..=5).map(|d| sale(d, "a", f64::from(d))).collect();
        aggregate(&sales, &[Dimension::TxDate], &[Metric::TotRev, Metric::Qty], Agg::Sum)
    }

    #[test]
    fn alpha_ramp_rises_from_point_three() {
        let alphas = alpha_ramp(3);
        assert_eq!(alphas.len(), 3);
        assert!((alphas[0] - 0.3).abs() < 1e-12);
        assert!((alphas[2] - (0.3 + 1.4 / 3.0)).abs() < 1e-12);
        assert!(alphas.windows(2).all(|w| w[0] < w[1]));
        assert!(alpha_ramp(0).is_empty());
    }

    #[test]
    fn explicit_defaults_colors_to_tableau() {
        let cols = [Column::Metric(Metric::TotRev), Column::MovingAverage(Metric::TotRev, 7)];
        let labels = vec!["daily".to_string(), "7 day".to_string()];
        let resolved = resolve_explicit(Some(&cols[..]), None, Some(labels.as_slice())).unwrap();
        assert_eq!(resolved[0].1, TABLEAU[0]);
        assert_eq!(resolved[1].1, TABLEAU[1]);
        assert_eq!(resolved[1].2, "7 day");
    }

    #[test]
    fn explicit_mismatch_is_rejected_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.png");
        let table = moving_averages(&by_date(), &[2]).unwrap();
        let mut chart = LineChart::new(FigureSize::new(2.0, 2.0, 50), &table, OutputTargets::single(&path));

        let options = LineOptions::new(LineMode::Explicit {
            columns: Some(vec![Column::Metric(Metric::TotRev), Column::MovingAverage(Metric::TotRev, 2)]),
            colors: Some(vec![TABLEAU[0]]),
            labels: Some(vec!["a".into(), "b".into()]),
        });
        let err = chart.plot(Dimension::TxDate, &options).unwrap_err();
        assert!(matches!(err, ChartError::Validation(_)));
        assert!(chart.canvas.is_none());
        assert!(matches!(chart.save(&SaveOptions::default()), Err(ChartError::NotDrawn)));
        assert!(!path.exists());
    }

    #[test]
    fn explicit_without_labels_is_rejected() {
        let cols = [Column::Metric(Metric::Qty)];
        assert!(matches!(resolve_explicit(Some(&cols[..]), None, None), Err(ChartError::Validation(_))));
    }

    #[test]
    fn selector_series_split_rows_and_skip_undefined_values() {
        let sales = vec![sale(1, "a", 1.0), sale(1, "b", 5.0), sale(2, "a", 2.0), sale(3, "b", 7.0)];
        let table = aggregate(&sales, &[Dimension::TxDate, Dimension::ProductClass], &[Metric::Qty], Agg::Sum);
        let chart = LineChart::new(FigureSize::new(2.0, 2.0, 50), &table, OutputTargets::none());
        let keys = table.key_column(Dimension::TxDate).unwrap();
        let scale = Scale::infer(&keys);

        let mode = LineMode::BySelector {
            column: Column::Metric(Metric::Qty),
            selector: Dimension::ProductClass,
            selectors: vec![KeyValue::Text("b".into()), KeyValue::Text("a".into())],
        };
        let series = chart.series(Dimension::TxDate, &mode, &scale).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label.as_deref(), Some("b"));
        assert_eq!(series[0].points.iter().map(|p| p.1).collect::<Vec<_>>(), vec![5.0, 7.0]);
        assert!(series[0].alpha < series[1].alpha);

        let ma = moving_averages(&by_date(), &[3]).unwrap();
        let chart = LineChart::new(FigureSize::new(2.0, 2.0, 50), &ma, OutputTargets::none());
        let keys = ma.key_column(Dimension::TxDate).unwrap();
        let single = LineMode::Single {
            column: Column::MovingAverage(Metric::Qty, 3),
            color: TABLEAU[1],
            alpha: 1.0,
        };
        let series = chart.series(Dimension::TxDate, &single, &Scale::infer(&keys)).unwrap();
        assert_eq!(series[0].points.len(), 3);
    }

    #[test]
    fn time_axis_chart_is_written_to_every_target() {
        let dir = tempfile::tempdir().unwrap();
        let targets = [dir.path().join("ma.png"), dir.path().join("mirror/ma.png")];
        let table = moving_averages(&by_date(), &[2]).unwrap();
        let mut chart = LineChart::new(FigureSize::new(6.0, 4.0, 100), &table, OutputTargets::many(targets.clone()));

        let options = LineOptions {
            labels: AxisLabels::new("Date", "Revenue"),
            time_axis: true,
            ..LineOptions::new(LineMode::Explicit {
                columns: Some(vec![Column::Metric(Metric::TotRev), Column::MovingAverage(Metric::TotRev, 2)]),
                colors: None,
                labels: Some(vec!["Revenue".into(), "Revenue (2-day)".into()]),
            })
        };
        chart.plot(Dimension::TxDate, &options).unwrap();
        let written = chart.save(&SaveOptions::default()).unwrap();

        assert_eq!(written, targets.to_vec());
        for path in &targets {
            // 0.1 in of padding on each side at 100 dpi.
            assert_eq!(image::image_dimensions(path).unwrap(), (620, 420));
        }
    }
}
