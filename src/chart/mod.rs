//! Chart and table images rendered with Plotters.
//!
//! Every chart follows the same lifecycle:
//!
//! 1. construct with a `FigureSize`, a borrowed source table and `OutputTargets`
//! 2. `plot(...)` allocates a fresh `Canvas` and draws into it
//! 3. `save(...)` writes the canvas to every target and releases it
//!
//! There is no ambient "current figure". The only sharing is the combo
//! overlay, where a `SecondaryAxis` borrows the first chart's canvas for the
//! second chart to draw on.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use thiserror::Error;

pub mod axes;
pub mod bar;
pub mod boxplot;
pub mod line;
pub mod table;

pub use axes::{AxisLabels, Orientation, SecondaryAxis, Spines};
pub use bar::{BarChart, BarOptions};
pub use boxplot::{BoxChart, BoxOptions};
pub use line::{LineChart, LineMode, LineOptions};
pub use table::{TableChart, TableStyle};

pub const LIGHT_GREY: RGBColor = RGBColor(211, 211, 211);
pub const HEADER_BLUE: RGBColor = RGBColor(0x40, 0x46, 0x6e);
pub const ROW_GREY: RGBColor = RGBColor(0xf1, 0xf1, 0xf2);

#[derive(Debug, Error)]
pub enum ChartError {
    /// Caller-supplied options are inconsistent; nothing was drawn.
    #[error("Invalid chart options: {0}")]
    Validation(String),
    #[error("Column `{0}` is not present in the source table.")]
    MissingColumn(String),
    #[error("Nothing to draw: {0}")]
    EmptyData(String),
    #[error("Chart was saved before a successful plot.")]
    NotDrawn,
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Failed to create image directory '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write image '{}': {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub(crate) fn draw_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Draw(e.to_string())
}

/// Figure dimensions in inches, rasterized at `dpi`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureSize {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl FigureSize {
    pub fn new(width_in: f64, height_in: f64, dpi: u32) -> Self {
        Self { width_in, height_in, dpi }
    }

    pub fn pixels(&self) -> (u32, u32) {
        let px = |inches: f64| ((inches * f64::from(self.dpi)).round() as u32).max(1);
        (px(self.width_in), px(self.height_in))
    }

    /// Convert a point size to pixels at this figure's resolution.
    pub fn pt(&self, points: f64) -> u32 {
        ((points * f64::from(self.dpi) / 72.0).round() as u32).max(1)
    }
}

/// Where a chart is written on save: zero, one or many paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTargets(Vec<PathBuf>);

impl OutputTargets {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self(vec![path.into()])
    }

    pub fn many<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Options shared by every save call of one chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveOptions {
    /// White border added around the canvas, in inches. Default 0.1.
    pub pad_inches: f64,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { pad_inches: 0.1 }
    }
}

/// An owned RGB drawing surface.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    dpi: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    /// A white canvas for the given figure.
    pub fn new(size: FigureSize) -> Self {
        let (width, height) = size.pixels();
        Self {
            width,
            height,
            dpi: size.dpi,
            pixels: vec![255; width as usize * height as usize * 3],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// A Plotters backend drawing straight into this canvas.
    pub fn backend(&mut self) -> BitMapBackend<'_> {
        BitMapBackend::with_buffer(&mut self.pixels, (self.width, self.height))
    }

    /// Encode the canvas (plus padding) to `path`; the format follows the extension.
    pub fn write_to(&self, path: &Path, options: &SaveOptions) -> Result<(), ChartError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ChartError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let image = image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| ChartError::Draw("canvas buffer does not match its size".to_string()))?;

        let pad = (options.pad_inches.max(0.0) * f64::from(self.dpi)).round() as u32;
        let padded = if pad == 0 {
            image
        } else {
            let mut out = image::RgbImage::from_pixel(
                self.width + 2 * pad,
                self.height + 2 * pad,
                image::Rgb([255, 255, 255]),
            );
            image::imageops::replace(&mut out, &image, i64::from(pad), i64::from(pad));
            out
        };

        padded.save(path).map_err(|source| ChartError::Save {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Write `canvas` to every target; shared by all chart kinds.
pub(crate) fn save_all(canvas: &Canvas, targets: &OutputTargets, options: &SaveOptions) -> Result<Vec<PathBuf>, ChartError> {
    let mut written = Vec::with_capacity(targets.paths().len());
    for path in targets.paths() {
        canvas.write_to(path, options)?;
        log::debug!("wrote {}", path.display());
        written.push(path.clone());
    }
    Ok(written)
}

/// Colour schemes for per-category fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Palette {
    #[default]
    Viridis,
    Muted,
    Tableau,
}

const VIRIDIS: [(f64, (u8, u8, u8)); 5] = [
    (0.0, (0x44, 0x01, 0x54)),
    (0.25, (0x3b, 0x52, 0x8b)),
    (0.5, (0x21, 0x91, 0x8c)),
    (0.75, (0x5e, 0xc9, 0x62)),
    (1.0, (0xfd, 0xe7, 0x25)),
];

const MUTED: [RGBColor; 10] = [
    RGBColor(0x48, 0x78, 0xd0),
    RGBColor(0xee, 0x85, 0x4a),
    RGBColor(0x6a, 0xcc, 0x64),
    RGBColor(0xd6, 0x5f, 0x5f),
    RGBColor(0x95, 0x6c, 0xb4),
    RGBColor(0x8c, 0x61, 0x3c),
    RGBColor(0xdc, 0x7e, 0xc0),
    RGBColor(0x79, 0x79, 0x79),
    RGBColor(0xd5, 0xbb, 0x67),
    RGBColor(0x82, 0xc6, 0xe2),
];

/// The ten Tableau colours, in order.
pub const TABLEAU: [RGBColor; 10] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0x7f, 0x7f, 0x7f),
    RGBColor(0xbc, 0xbd, 0x22),
    RGBColor(0x17, 0xbe, 0xcf),
];

impl Palette {
    /// `n` colours. Viridis samples the interior of the map evenly (the two
    /// extremes are skipped); the qualitative palettes cycle.
    pub fn colors(self, n: usize) -> Vec<RGBColor> {
        match self {
            Palette::Viridis => (0..n).map(|i| viridis((i + 1) as f64 / (n + 1) as f64)).collect(),
            Palette::Muted => MUTED.iter().copied().cycle().take(n).collect(),
            Palette::Tableau => TABLEAU.iter().copied().cycle().take(n).collect(),
        }
    }
}

fn viridis(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let upper = VIRIDIS.iter().position(|(stop, _)| *stop >= t).unwrap_or(VIRIDIS.len() - 1).max(1);
    let (t0, (r0, g0, b0)) = VIRIDIS[upper - 1];
    let (t1, (r1, g1, b1)) = VIRIDIS[upper];
    let f = (t - t0) / (t1 - t0);
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * f).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Fill for bars and boxes: one colour, or one palette entry per category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    Solid(RGBColor),
    Palette(Palette),
}

impl Fill {
    pub fn colors(self, n: usize) -> Vec<RGBColor> {
        match self {
            Fill::Solid(c) => vec![c; n],
            Fill::Palette(p) => p.colors(n),
        }
    }
}

impl Default for Fill {
    fn default() -> Self {
        Fill::Palette(Palette::Viridis)
    }
}
