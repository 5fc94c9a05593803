//! Bar charts of one value column against one key dimension.

use std::path::PathBuf;

use plotters::prelude::*;

use crate::analysis::{AggregateTable, Column};
use crate::chart::axes::{Categories, Frame, LabelRoom, Layout, Scale, draw_spines, format_tick, value_range};
use crate::chart::{
    AxisLabels, Canvas, ChartError, FigureSize, Fill, Orientation, OutputTargets, SaveOptions, SecondaryAxis, Spines,
    draw_err, save_all,
};
use crate::domain::Dimension;

/// Bar appearance. Defaults: horizontal bars, viridis fill, 0.5 pt edges,
/// right/top spines hidden.
#[derive(Debug, Clone, PartialEq)]
pub struct BarOptions {
    pub labels: AxisLabels,
    pub orientation: Orientation,
    pub fill: Fill,
    /// Edge width in points; zero disables edges.
    pub line_width: f64,
    pub spines: Spines,
}

impl Default for BarOptions {
    fn default() -> Self {
        Self {
            labels: AxisLabels::default(),
            orientation: Orientation::Horizontal,
            fill: Fill::default(),
            line_width: 0.5,
            spines: Spines::default(),
        }
    }
}

const EDGE: RGBColor = RGBColor(64, 64, 64);
const HALF_BAR: f64 = 0.4;

pub struct BarChart<'t> {
    size: FigureSize,
    table: &'t AggregateTable,
    targets: OutputTargets,
    canvas: Option<Canvas>,
}

impl<'t> BarChart<'t> {
    pub fn new(size: FigureSize, table: &'t AggregateTable, targets: OutputTargets) -> Self {
        Self {
            size,
            table,
            targets,
            canvas: None,
        }
    }

    /// Draw one bar per row of the table, in row order.
    pub fn plot(&mut self, category: Dimension, value: Column, options: &BarOptions) -> Result<(), ChartError> {
        self.draw(category, value, options, false).map(|_| ())
    }

    /// Draw vertical bars and hand back a second y axis for an overlay.
    pub fn plot_combo(
        &mut self,
        category: Dimension,
        value: Column,
        options: &BarOptions,
    ) -> Result<SecondaryAxis<'_>, ChartError> {
        if options.orientation != Orientation::Vertical {
            return Err(ChartError::Validation(
                "a combo overlay shares the x axis, so the bars must be vertical".to_string(),
            ));
        }
        let frame = self.draw(category, value, options, true)?;
        let canvas = self.canvas.as_mut().ok_or(ChartError::NotDrawn)?;
        Ok(SecondaryAxis { canvas, frame })
    }

    /// Write the figure to every target and release the canvas.
    pub fn save(self, options: &SaveOptions) -> Result<Vec<PathBuf>, ChartError> {
        let canvas = self.canvas.ok_or(ChartError::NotDrawn)?;
        save_all(&canvas, &self.targets, options)
    }

    fn draw(&mut self, category: Dimension, value: Column, options: &BarOptions, secondary: bool) -> Result<Frame, ChartError> {
        self.canvas = None;

        let values = self
            .table
            .column(value)
            .ok_or_else(|| ChartError::MissingColumn(value.to_string()))?;
        let keys = self
            .table
            .key_column(category)
            .ok_or_else(|| ChartError::MissingColumn(category.name().to_string()))?;
        if keys.is_empty() {
            return Err(ChartError::EmptyData(format!("no rows for `{}`", category.name())));
        }

        let horizontal = options.orientation == Orientation::Horizontal;
        let cats = Categories::new(keys.iter().map(ToString::to_string).collect(), horizontal);
        let value_span = value_range(values.iter().copied(), true)
            .ok_or_else(|| ChartError::EmptyData(format!("`{value}` has no finite values")))?;

        let room = if horizontal {
            LabelRoom {
                left_chars: cats.widest(),
                secondary,
                ..LabelRoom::default()
            }
        } else {
            LabelRoom {
                left_chars: 6,
                bottom_chars: cats.widest(),
                rotated_bottom: cats.len() * cats.widest() > 80,
                secondary,
            }
        };
        let layout = Layout::new(self.size, room);
        let (x_range, y_range) = if horizontal {
            (value_span, cats.range())
        } else {
            (cats.range(), value_span)
        };

        let colors = options.fill.colors(cats.len());
        let edge_px = if options.line_width > 0.0 {
            Some(((options.line_width * f64::from(self.size.dpi) / 72.0).round() as u32).max(1))
        } else {
            None
        };

        let mut canvas = Canvas::new(self.size);
        {
            let root = canvas.backend().into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            let mut chart = layout.build(&root, x_range.clone(), y_range.clone())?;

            let cat_fmt = |v: &f64| cats.label(*v);
            let num_fmt = |v: &f64| format_tick(*v);
            let (x_fmt, y_fmt): (&dyn Fn(&f64) -> String, &dyn Fn(&f64) -> String) =
                if horizontal { (&num_fmt, &cat_fmt) } else { (&cat_fmt, &num_fmt) };
            let (x_ticks, y_ticks) = if horizontal { (8, cats.len()) } else { (cats.len(), 8) };
            let x_style = if room.rotated_bottom {
                layout.label_font().transform(FontTransform::Rotate90)
            } else {
                layout.label_font()
            };

            chart
                .configure_mesh()
                .disable_mesh()
                .x_desc(options.labels.x.as_str())
                .y_desc(options.labels.y.as_str())
                .x_labels(x_ticks)
                .y_labels(y_ticks)
                .x_label_formatter(x_fmt)
                .y_label_formatter(y_fmt)
                .label_style(layout.label_font())
                .x_label_style(x_style)
                .axis_desc_style(layout.desc_font())
                .axis_style(&BLACK)
                .draw()
                .map_err(draw_err)?;

            let bar = |i: usize, v: f64| {
                let p = cats.position_of(i);
                if horizontal {
                    [(0.0, p - HALF_BAR), (v, p + HALF_BAR)]
                } else {
                    [(p - HALF_BAR, 0.0), (p + HALF_BAR, v)]
                }
            };
            let finite = || values.iter().copied().enumerate().filter(|(_, v)| v.is_finite());

            chart
                .draw_series(finite().map(|(i, v)| Rectangle::new(bar(i, v), colors[i].filled())))
                .map_err(draw_err)?;
            if let Some(px) = edge_px {
                chart
                    .draw_series(finite().map(|(i, v)| Rectangle::new(bar(i, v), EDGE.stroke_width(px))))
                    .map_err(draw_err)?;
            }

            draw_spines(&root, chart.plotting_area().get_pixel_range(), options.spines)?;
            root.present().map_err(draw_err)?;
        }

        log::debug!("bar chart: {} bars of `{value}` by `{}`", cats.len(), category.name());
        self.canvas = Some(canvas);
        Ok(Frame {
            layout,
            x: Scale::Categories(cats),
            x_range,
            y_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Agg, aggregate};
    use crate::domain::{Metric, Sale};
    use chrono::NaiveDate;

    fn table() -> AggregateTable {
        let sale = |class: &str, qty: f64| Sale {
            tx_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            year: 2021,
            month: 1,
            day: 1,
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
        };
        aggregate(&[sale("a", 1.0), sale("b", 2.0)], &[Dimension::ProductClass], &[Metric::Qty], Agg::Sum)
    }

    #[test]
    fn saving_before_plot_is_not_drawn() {
        let dir = tempfile::tempdir().unwrap();
        let table = table();
        let chart = BarChart::new(
            FigureSize::new(1.0, 1.0, 50),
            &table,
            OutputTargets::single(dir.path().join("bar.png")),
        );
        assert!(matches!(chart.save(&SaveOptions::default()), Err(ChartError::NotDrawn)));
        assert!(!dir.path().join("bar.png").exists());
    }

    #[test]
    fn missing_column_allocates_nothing() {
        let table = table();
        let mut chart = BarChart::new(FigureSize::new(1.0, 1.0, 50), &table, OutputTargets::none());
        let err = chart
            .plot(Dimension::ProductClass, Column::Metric(Metric::NetSales), &BarOptions::default())
            .unwrap_err();
        assert!(matches!(err, ChartError::MissingColumn(ref c) if c == "NET_SALES"));
        assert!(chart.canvas.is_none());
    }

    #[test]
    fn combo_requires_vertical_bars() {
        let table = table();
        let mut chart = BarChart::new(FigureSize::new(1.0, 1.0, 50), &table, OutputTargets::none());
        let result = chart.plot_combo(Dimension::ProductClass, Column::Metric(Metric::Qty), &BarOptions::default());
        assert!(matches!(result, Err(ChartError::Validation(_))));
    }

    #[test]
    fn combo_overlay_writes_one_image_at_figure_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combo.png");
        let table = table();
        let size = FigureSize::new(6.0, 4.0, 100);

        let mut bars = BarChart::new(size, &table, OutputTargets::single(&path));
        let options = BarOptions {
            labels: AxisLabels::new("Class", "Quantity"),
            orientation: Orientation::Vertical,
            ..BarOptions::default()
        };
        let mut axis = bars
            .plot_combo(Dimension::ProductClass, Column::Metric(Metric::Qty), &options)
            .unwrap();

        let overlay = crate::chart::LineChart::new(size, &table, OutputTargets::none());
        let line = crate::chart::LineOptions {
            labels: AxisLabels::new("", "Count"),
            ..crate::chart::LineOptions::new(crate::chart::LineMode::Single {
                column: Column::Metric(Metric::Qty),
                color: RED,
                alpha: 1.0,
            })
        };
        overlay.plot_on(&mut axis, Dimension::ProductClass, &line).unwrap();

        let written = bars.save(&SaveOptions { pad_inches: 0.0 }).unwrap();
        assert_eq!(written, vec![path.clone()]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(image::image_dimensions(&path).unwrap(), (600, 400));
    }
}
