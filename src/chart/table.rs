//! Styled table images.

use std::path::PathBuf;

use plotters::prelude::*;
use plotters::style::FontStyle;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::analysis::DisplayTable;
use crate::chart::{Canvas, ChartError, FigureSize, HEADER_BLUE, OutputTargets, ROW_GREY, SaveOptions, draw_err, save_all};

#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    /// Point size of every cell.
    pub font_size: f64,
    pub header_color: RGBColor,
    /// Body fills, cycled by row number (the header row counts as row 0).
    pub row_colors: Vec<RGBColor>,
    pub edge_color: RGBColor,
    /// `[x, y, width, height]` of the grid as fractions of the image, y from the bottom.
    pub bbox: [f64; 4],
    /// Leading columns styled like the header.
    pub header_columns: usize,
    pub dpi: u32,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            header_color: HEADER_BLUE,
            row_colors: vec![ROW_GREY, WHITE],
            edge_color: WHITE,
            bbox: [0.0, 0.0, 1.0, 1.0],
            header_columns: 0,
            dpi: 100,
        }
    }
}

/// Fill and text treatment of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub fill: RGBColor,
    pub header: bool,
}

/// Style of cell `(row, col)`, where row 0 is the header.
pub fn cell_style(style: &TableStyle, row: usize, col: usize) -> CellStyle {
    if row == 0 || col < style.header_columns {
        return CellStyle {
            fill: style.header_color,
            header: true,
        };
    }
    let fill = if style.row_colors.is_empty() {
        WHITE
    } else {
        style.row_colors[row % style.row_colors.len()]
    };
    CellStyle { fill, header: false }
}

pub struct TableChart<'t> {
    row_height: f64,
    col_width: f64,
    data: &'t DisplayTable,
    target: PathBuf,
    canvas: Option<Canvas>,
}

impl<'t> TableChart<'t> {
    /// `row_height` and `col_width` are in inches.
    pub fn new(row_height: f64, col_width: f64, data: &'t DisplayTable, path: impl Into<PathBuf>) -> Self {
        Self {
            row_height,
            col_width,
            data,
            target: path.into(),
            canvas: None,
        }
    }

    /// `(cols × col_width, (rows + 1) × row_height)` inches.
    pub fn figure_size(&self, dpi: u32) -> FigureSize {
        FigureSize::new(
            self.data.column_count() as f64 * self.col_width,
            (self.data.row_count() + 1) as f64 * self.row_height,
            dpi,
        )
    }

    pub fn plot(&mut self, style: &TableStyle) -> Result<(), ChartError> {
        self.canvas = None;
        let cols = self.data.column_count();
        if cols == 0 {
            return Err(ChartError::EmptyData("table has no columns".to_string()));
        }
        let rows = self.data.row_count() + 1;

        let size = self.figure_size(style.dpi);
        let mut canvas = Canvas::new(size);
        let (w, h) = canvas.size();
        let [bx, by, bw, bh] = style.bbox;
        let left = bx * f64::from(w);
        let top = (1.0 - by - bh) * f64::from(h);
        let cell_w = bw * f64::from(w) / cols as f64;
        let cell_h = bh * f64::from(h) / rows as f64;
        let font_px = f64::from(size.pt(style.font_size));
        let pad = (cell_w * 0.05).max(2.0);

        {
            let root = canvas.backend().into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            for r in 0..rows {
                for c in 0..cols {
                    let cell = cell_style(style, r, c);
                    let x0 = (left + c as f64 * cell_w).round() as i32;
                    let y0 = (top + r as f64 * cell_h).round() as i32;
                    let x1 = (left + (c + 1) as f64 * cell_w).round() as i32;
                    let y1 = (top + (r + 1) as f64 * cell_h).round() as i32;

                    root.draw(&Rectangle::new([(x0, y0), (x1, y1)], cell.fill.filled()))
                        .map_err(draw_err)?;
                    root.draw(&Rectangle::new([(x0, y0), (x1, y1)], style.edge_color.stroke_width(1)))
                        .map_err(draw_err)?;

                    let text = if r == 0 {
                        self.data.headers[c].as_str()
                    } else {
                        self.data.rows[r - 1].get(c).map_or("", String::as_str)
                    };
                    if text.is_empty() {
                        continue;
                    }

                    let y_mid = (y0 + y1) / 2;
                    let (anchor, x) = if cell.header {
                        (Pos::new(HPos::Center, VPos::Center), (x0 + x1) / 2)
                    } else {
                        (Pos::new(HPos::Right, VPos::Center), x1 - pad.round() as i32)
                    };
                    let font = ("sans-serif", font_px).into_font();
                    let font = if cell.header { font.style(FontStyle::Bold).color(&WHITE) } else { font.color(&BLACK) };
                    root.draw(&Text::new(text, (x, y_mid), font.pos(anchor)))
                        .map_err(draw_err)?;
                }
            }
            root.present().map_err(draw_err)?;
        }

        self.canvas = Some(canvas);
        Ok(())
    }

    /// Write the single target and release the canvas.
    pub fn save(self, options: &SaveOptions) -> Result<PathBuf, ChartError> {
        let canvas = self.canvas.ok_or(ChartError::NotDrawn)?;
        let mut written = save_all(&canvas, &OutputTargets::single(self.target), options)?;
        written.pop().ok_or(ChartError::NotDrawn)
    }
}
