//! Box plots of raw per-category observations.

use std::ops::Range;
use std::path::PathBuf;

use plotters::prelude::*;

use crate::analysis::Distribution;
use crate::chart::axes::{Area, Categories, LabelRoom, Layout, draw_spines, format_tick, value_range};
use crate::chart::{
    AxisLabels, Canvas, ChartError, FigureSize, Fill, Orientation, OutputTargets, SaveOptions, Spines, draw_err,
    save_all,
};

/// Box appearance. Defaults: horizontal boxes, viridis fill, 0.5 pt lines,
/// right/top spines hidden.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxOptions {
    pub labels: AxisLabels,
    pub orientation: Orientation,
    pub fill: Fill,
    pub line_width: f64,
    pub spines: Spines,
}

impl Default for BoxOptions {
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

const HALF_BOX: f64 = 0.3;
const LINE: RGBColor = RGBColor(60, 60, 60);

/// Summary of one category, computed before any drawing.
struct BoxStats {
    quartiles: Quartiles,
    outliers: Vec<f64>,
}

impl BoxStats {
    fn new(values: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        let quartiles = Quartiles::new(&finite);
        let [lo, _, _, _, hi] = quartiles.values();
        let outliers = finite
            .iter()
            .copied()
            .filter(|v| *v < f64::from(lo) || *v > f64::from(hi))
            .collect();
        Some(Self { quartiles, outliers })
    }

    fn extent(&self) -> impl Iterator<Item = f64> + '_ {
        self.quartiles
            .values()
            .into_iter()
            .map(f64::from)
            .chain(self.outliers.iter().copied())
    }
}

pub struct BoxChart<'t> {
    size: FigureSize,
    data: &'t Distribution,
    targets: OutputTargets,
    canvas: Option<Canvas>,
}

impl<'t> BoxChart<'t> {
    pub fn new(size: FigureSize, data: &'t Distribution, targets: OutputTargets) -> Self {
        Self {
            size,
            data,
            targets,
            canvas: None,
        }
    }

    /// One box per category of the distribution, in its category order.
    pub fn plot(&mut self, options: &BoxOptions) -> Result<(), ChartError> {
        self.canvas = None;

        let mut names = Vec::new();
        let mut stats = Vec::new();
        for (key, values) in &self.data.groups {
            if let Some(s) = BoxStats::new(values) {
                names.push(key.to_string());
                stats.push(s);
            }
        }
        if stats.is_empty() {
            return Err(ChartError::EmptyData(format!(
                "no `{}` observations by `{}`",
                self.data.metric.name(),
                self.data.dimension.name()
            )));
        }

        let horizontal = options.orientation == Orientation::Horizontal;
        let cats = Categories::new(names, horizontal);
        let span = value_range(stats.iter().flat_map(BoxStats::extent), false)
            .ok_or_else(|| ChartError::EmptyData("no finite observations".to_string()))?;
        let span = (span.start as f32)..(span.end as f32);

        let room = if horizontal {
            LabelRoom {
                left_chars: cats.widest(),
                ..LabelRoom::default()
            }
        } else {
            LabelRoom {
                left_chars: 6,
                bottom_chars: cats.widest(),
                rotated_bottom: cats.len() * cats.widest() > 80,
                secondary: false,
            }
        };
        let layout = Layout::new(self.size, room);
        let colors = options.fill.colors(cats.len());
        let line_px = ((options.line_width * f64::from(self.size.dpi) / 72.0).round() as u32).max(1);

        let mut canvas = Canvas::new(self.size);
        {
            let root = canvas.backend().into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            let ctx = DrawCtx {
                layout: &layout,
                cats: &cats,
                stats: &stats,
                colors: &colors,
                line_px,
                options,
            };
            if horizontal {
                ctx.horizontal(&root, span)?;
            } else {
                ctx.vertical(&root, span)?;
            }
            root.present().map_err(draw_err)?;
        }

        log::debug!(
            "box plot: {} groups, {} observations",
            cats.len(),
            self.data.observation_count()
        );
        self.canvas = Some(canvas);
        Ok(())
    }

    pub fn save(self, options: &SaveOptions) -> Result<Vec<PathBuf>, ChartError> {
        let canvas = self.canvas.ok_or(ChartError::NotDrawn)?;
        save_all(&canvas, &self.targets, options)
    }
}

struct DrawCtx<'a> {
    layout: &'a Layout,
    cats: &'a Categories,
    stats: &'a [BoxStats],
    colors: &'a [RGBColor],
    line_px: u32,
    options: &'a BoxOptions,
}

impl DrawCtx<'_> {
    fn box_px(&self, extent_px: i32) -> u32 {
        let per_cat = f64::from(extent_px.max(1)) / self.cats.len() as f64;
        ((per_cat * 2.0 * HALF_BOX).round() as u32).max(2)
    }

    fn horizontal(&self, root: &Area<'_>, span: Range<f32>) -> Result<(), ChartError> {
        let l = self.layout;
        let mut chart = ChartBuilder::on(root)
            .margin(l.margin)
            .x_label_area_size(l.bottom)
            .y_label_area_size(l.left)
            .build_cartesian_2d(span, self.cats.range())
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(self.options.labels.x.as_str())
            .y_desc(self.options.labels.y.as_str())
            .y_labels(self.cats.len())
            .x_label_formatter(&|v| format_tick(f64::from(*v)))
            .y_label_formatter(&|v| self.cats.label(*v))
            .label_style(l.label_font())
            .axis_desc_style(l.desc_font())
            .draw()
            .map_err(draw_err)?;

        let (_, ys) = chart.plotting_area().get_pixel_range();
        let width = self.box_px(ys.end - ys.start);

        for (i, s) in self.stats.iter().enumerate() {
            let p = self.cats.position_of(i);
            let [_, q1, _, q3, _] = s.quartiles.values();
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(q1, p - HALF_BOX), (q3, p + HALF_BOX)],
                    self.colors[i].filled(),
                )))
                .map_err(draw_err)?;
            chart
                .draw_series(std::iter::once(
                    Boxplot::new_horizontal(p, &s.quartiles)
                        .width(width)
                        .whisker_width(0.5)
                        .style(LINE.stroke_width(self.line_px)),
                ))
                .map_err(draw_err)?;
            chart
                .draw_series(
                    s.outliers
                        .iter()
                        .map(|v| Circle::new((*v as f32, p), 2, LINE.stroke_width(1))),
                )
                .map_err(draw_err)?;
        }

        draw_spines(root, chart.plotting_area().get_pixel_range(), self.options.spines)
    }

    fn vertical(&self, root: &Area<'_>, span: Range<f32>) -> Result<(), ChartError> {
        let l = self.layout;
        let x_style = if self.cats.len() * self.cats.widest() > 80 {
            l.label_font().transform(FontTransform::Rotate90)
        } else {
            l.label_font()
        };
        let mut chart = ChartBuilder::on(root)
            .margin(l.margin)
            .x_label_area_size(l.bottom)
            .y_label_area_size(l.left)
            .build_cartesian_2d(self.cats.range(), span)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(self.options.labels.x.as_str())
            .y_desc(self.options.labels.y.as_str())
            .x_labels(self.cats.len())
            .x_label_formatter(&|v| self.cats.label(*v))
            .y_label_formatter(&|v| format_tick(f64::from(*v)))
            .label_style(l.label_font())
            .x_label_style(x_style)
            .axis_desc_style(l.desc_font())
            .draw()
            .map_err(draw_err)?;

        let (xs, _) = chart.plotting_area().get_pixel_range();
        let width = self.box_px(xs.end - xs.start);

        for (i, s) in self.stats.iter().enumerate() {
            let p = self.cats.position_of(i);
            let [_, q1, _, q3, _] = s.quartiles.values();
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(p - HALF_BOX, q1), (p + HALF_BOX, q3)],
                    self.colors[i].filled(),
                )))
                .map_err(draw_err)?;
            chart
                .draw_series(std::iter::once(
                    Boxplot::new_vertical(p, &s.quartiles)
                        .width(width)
                        .whisker_width(0.5)
                        .style(LINE.stroke_width(self.line_px)),
                ))
                .map_err(draw_err)?;
            chart
                .draw_series(
                    s.outliers
                        .iter()
                        .map(|v| Circle::new((p, *v as f32), 2, LINE.stroke_width(1))),
                )
                .map_err(draw_err)?;
        }

        draw_spines(root, chart.plotting_area().get_pixel_range(), self.options.spines)
    }
}
