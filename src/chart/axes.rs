//! Axis scales, figure layout and the combo-mode secondary axis.

use std::ops::Range;

use chrono::{Datelike, NaiveDate};
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::chart::{Canvas, ChartError, FigureSize, draw_err};
use crate::domain::KeyValue;

/// Which axis carries the categories of a bar or box chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Categories along x, values up the y axis.
    Vertical,
    /// Categories down the y axis (first category on top).
    #[default]
    Horizontal,
}

/// Optional right/top frame lines. Left and bottom are always drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Spines {
    pub right: bool,
    pub top: bool,
}

impl Spines {
    pub fn right_only() -> Self {
        Self { right: true, top: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisLabels {
    pub x: String,
    pub y: String,
}

impl AxisLabels {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self { x: x.into(), y: y.into() }
    }
}

pub(crate) type Area<'b> = DrawingArea<BitMapBackend<'b>, Shift>;
pub(crate) type Plane<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Pixel sizes for margins, label areas and fonts of one figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Layout {
    pub margin: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
    pub font: f64,
    pub desc_font: f64,
}

/// Space the tick labels of a figure need, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct LabelRoom {
    pub left_chars: usize,
    pub bottom_chars: usize,
    pub rotated_bottom: bool,
    pub secondary: bool,
}

const NUMERIC_CHARS: usize = 8;

impl Layout {
    pub fn new(size: FigureSize, room: LabelRoom) -> Self {
        let font = f64::from(size.pt(10.0));
        let desc_font = f64::from(size.pt(11.0));
        let char_w = font * 0.6;
        let text_w = |chars: usize| (chars as f64 * char_w).ceil() as u32;
        let desc = (desc_font * 2.0).ceil() as u32;

        let left = desc + text_w(room.left_chars.max(4)) + 8;
        let bottom = if room.rotated_bottom {
            desc + text_w(room.bottom_chars.max(4)) + 8
        } else {
            desc + (font * 1.8).ceil() as u32
        };
        let right = if room.secondary { desc + text_w(NUMERIC_CHARS) + 8 } else { 0 };

        Self {
            margin: size.pt(10.0),
            left,
            bottom,
            right,
            font,
            desc_font,
        }
    }

    pub fn label_font(&self) -> FontDesc<'static> {
        ("sans-serif", self.font).into_font()
    }

    pub fn desc_font(&self) -> FontDesc<'static> {
        ("sans-serif", self.desc_font).into_font()
    }

    /// Build a plain `f64 x f64` chart on `root` using this layout.
    pub fn build<'a, 'b>(&self, root: &'a Area<'b>, x: Range<f64>, y: Range<f64>) -> Result<Plane<'a, 'b>, ChartError> {
        let mut builder = ChartBuilder::on(root);
        builder
            .margin(self.margin)
            .margin_left(self.margin / 2)
            .x_label_area_size(self.bottom)
            .y_label_area_size(self.left);
        if self.right > 0 {
            builder.right_y_label_area_size(self.right);
        }
        builder.build_cartesian_2d(x, y).map_err(draw_err)
    }
}

/// Named categories placed at integer positions along an `f64` axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Categories {
    names: Vec<String>,
    reversed: bool,
}

impl Categories {
    pub fn new(names: Vec<String>, reversed: bool) -> Self {
        Self { names, reversed }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position_of(&self, index: usize) -> f64 {
        if self.reversed { (self.names.len() - 1 - index) as f64 } else { index as f64 }
    }

    pub fn range(&self) -> Range<f64> {
        -0.5..(self.names.len() as f64 - 0.5)
    }

    /// Tick text for an axis position; blank between categories.
    pub fn label(&self, v: f64) -> String {
        let i = v.round();
        if (v - i).abs() > 1e-6 || i < 0.0 || i as usize >= self.names.len() {
            return String::new();
        }
        let i = i as usize;
        let idx = if self.reversed { self.names.len() - 1 - i } else { i };
        self.names[idx].clone()
    }

    pub fn widest(&self) -> usize {
        self.names.iter().map(|n| n.chars().count()).max().unwrap_or(0)
    }
}

/// How key values map onto a continuous x axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Scale {
    Categories(Categories),
    Dates,
    Numbers,
}

impl Scale {
    /// Dates and integers stay continuous; anything else becomes categorical
    /// in order of first appearance.
    pub fn infer(keys: &[&KeyValue]) -> Self {
        if !keys.is_empty() && keys.iter().all(|k| matches!(k, KeyValue::Date(_))) {
            return Scale::Dates;
        }
        if !keys.is_empty() && keys.iter().all(|k| matches!(k, KeyValue::Int(_))) {
            return Scale::Numbers;
        }
        let mut names: Vec<String> = Vec::new();
        for k in keys {
            let name = k.to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Scale::Categories(Categories::new(names, false))
    }

    pub fn position(&self, key: &KeyValue) -> Option<f64> {
        match (self, key) {
            (Scale::Dates, KeyValue::Date(d)) => Some(f64::from(d.num_days_from_ce())),
            (Scale::Numbers, KeyValue::Int(v)) => Some(*v as f64),
            (Scale::Categories(c), k) => {
                let name = k.to_string();
                c.names().iter().position(|n| *n == name).map(|i| c.position_of(i))
            }
            _ => None,
        }
    }

    pub fn range(&self, positions: &[f64]) -> Range<f64> {
        match self {
            Scale::Categories(c) => c.range(),
            _ => {
                let lo = positions.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = positions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if !lo.is_finite() || !hi.is_finite() {
                    0.0..1.0
                } else if hi <= lo {
                    (lo - 1.0)..(hi + 1.0)
                } else {
                    lo..hi
                }
            }
        }
    }

    pub fn label(&self, v: f64) -> String {
        match self {
            Scale::Categories(c) => c.label(v),
            Scale::Dates => NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            Scale::Numbers => format_tick(v),
        }
    }

    pub fn tick_count(&self) -> usize {
        match self {
            Scale::Categories(c) => c.len().max(1),
            _ => 8,
        }
    }

    pub fn widest_label(&self) -> usize {
        match self {
            Scale::Categories(c) => c.widest(),
            Scale::Dates => 10,
            Scale::Numbers => NUMERIC_CHARS,
        }
    }
}

/// Compact numeric tick text.
pub(crate) fn format_tick(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let a = v.abs();
    if a >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if a >= 1e4 {
        format!("{:.0}k", v / 1e3)
    } else if (v - v.round()).abs() < 1e-9 {
        format!("{v:.0}")
    } else if a >= 1.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}

/// Data limits padded by 5% on both sides; `include_zero` pins bars to the baseline.
pub(crate) fn value_range<I: IntoIterator<Item = f64>>(values: I, include_zero: bool) -> Option<Range<f64>> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.into_iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() {
        return None;
    }
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    let span = if hi > lo { hi - lo } else { lo.abs().max(1.0) };
    let pad = span * 0.05;
    let lo = if include_zero && lo == 0.0 { 0.0 } else { lo - pad };
    let hi = if include_zero && hi == 0.0 { 0.0 } else { hi + pad };
    Some(lo..hi)
}

/// Frame lines that the mesh does not draw.
pub(crate) fn draw_spines(root: &Area<'_>, plot: (Range<i32>, Range<i32>), spines: Spines) -> Result<(), ChartError> {
    let (xs, ys) = plot;
    if spines.top {
        root.draw(&PathElement::new(vec![(xs.start, ys.start), (xs.end, ys.start)], BLACK.stroke_width(1)))
            .map_err(draw_err)?;
    }
    if spines.right {
        root.draw(&PathElement::new(vec![(xs.end, ys.start), (xs.end, ys.end)], BLACK.stroke_width(1)))
            .map_err(draw_err)?;
    }
    Ok(())
}

/// The shared geometry a primary chart hands to an overlay.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Frame {
    pub layout: Layout,
    pub x: Scale,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
}

/// A second value axis on the right of an already drawn chart.
///
/// Holds the primary chart's canvas mutably until the overlay is done; the
/// primary chart then saves the combined figure.
pub struct SecondaryAxis<'c> {
    pub(crate) canvas: &'c mut Canvas,
    pub(crate) frame: Frame,
}

impl SecondaryAxis<'_> {
    pub(crate) fn x_scale(&self) -> &Scale {
        &self.frame.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_label_integer_positions_only() {
        let cats = Categories::new(vec!["a".into(), "b".into(), "c".into()], false);
        assert_eq!(cats.range(), -0.5..2.5);
        assert_eq!(cats.label(1.0), "b");
        assert_eq!(cats.label(1.5), "");
        assert_eq!(cats.label(3.0), "");
    }

    #[test]
    fn reversed_categories_put_first_on_top() {
        let cats = Categories::new(vec!["first".into(), "second".into()], true);
        assert_eq!(cats.position_of(0), 1.0);
        assert_eq!(cats.label(1.0), "first");
        assert_eq!(cats.label(0.0), "second");
    }

    #[test]
    fn scale_inference_and_positions() {
        let d = KeyValue::Date(NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
        let scale = Scale::infer(&[&d]);
        assert_eq!(scale, Scale::Dates);
        let pos = scale.position(&d).unwrap();
        assert_eq!(scale.label(pos), "2021-01-02");

        let a = KeyValue::Text("x".into());
        let b = KeyValue::Text("y".into());
        let scale = Scale::infer(&[&b, &a, &b]);
        assert_eq!(scale.position(&b), Some(0.0));
        assert_eq!(scale.position(&a), Some(1.0));
        assert_eq!(scale.tick_count(), 2);
    }

    #[test]
    fn value_range_pads_and_pins_zero() {
        let r = value_range([10.0, 20.0], true).unwrap();
        assert_eq!(r.start, 0.0);
        assert!((r.end - 21.0).abs() < 1e-9);

        let r = value_range([10.0, 20.0, f64::NAN], false).unwrap();
        assert!((r.start - 9.5).abs() < 1e-9);
        assert!(value_range([f64::NAN], false).is_none());
    }

    #[test]
    fn ticks_are_compact() {
        assert_eq!(format_tick(2_500_000.0), "2.5M");
        assert_eq!(format_tick(12_000.0), "12k");
        assert_eq!(format_tick(42.0), "42");
        assert_eq!(format_tick(0.25), "0.25");
    }

    #[test]
    fn layout_reserves_secondary_area_only_when_asked() {
        let size = FigureSize::new(10.0, 5.0, 100);
        let plain = Layout::new(size, LabelRoom::default());
        let combo = Layout::new(size, LabelRoom { secondary: true, ..LabelRoom::default() });
        assert_eq!(plain.right, 0);
        assert!(combo.right > 0);
    }
}
