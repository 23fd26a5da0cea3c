//! Chart Module - Bar chart rendering to PNG
//!
//! `ChartRenderer` is the seam the report layer talks to. `BitmapBarChart`
//! draws directly into an RGB buffer with the `image` crate: axes, gridlines,
//! one bar per label, tick and bar labels, and title text in a built-in
//! bitmap font.

pub mod font;

use std::io::Cursor;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

pub const PNG_CONTENT_TYPE: &str = "image/png";

pub const SKY_BLUE: [u8; 3] = [135, 206, 235];
pub const LIGHT_GREEN: [u8; 3] = [144, 238, 144];

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const TEXT: Rgb<u8> = Rgb([40, 40, 40]);

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Chart series mismatch: {labels} labels for {values} values")]
    MismatchedSeries { labels: usize, values: usize },
    #[error("Failed to encode chart: {0}")]
    Encode(String),
}

/// Everything needed to draw one bar chart.
#[derive(Clone, Debug, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub color: [u8; 3],
}

/// Turns a bar chart description into encoded image bytes.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, chart: &BarChart) -> Result<Vec<u8>, ChartError>;
    fn content_type(&self) -> &'static str {
        PNG_CONTENT_TYPE
    }
}

/// Plot area inside the canvas.
#[derive(Clone, Copy, Debug)]
struct Plot {
    left: u32,
    right: u32,
    top: u32,
    bottom: u32,
}

impl Plot {
    fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// Canvas size is clamped to at least 200x160 so the plot area never collapses.
#[derive(Clone, Debug)]
pub struct BitmapBarChart {
    width: u32,
    height: u32,
}

impl Default for BitmapBarChart {
    fn default() -> Self {
        Self { width: 800, height: 600 }
    }
}

impl BitmapBarChart {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width.max(200), height: height.max(160) }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn plot(&self) -> Plot {
        Plot {
            left: 90,
            right: self.width.saturating_sub(20),
            top: 60,
            bottom: self.height.saturating_sub(70),
        }
    }

    /// Draw the chart into a fresh buffer.
    pub fn draw(&self, chart: &BarChart) -> Result<RgbImage, ChartError> {
        if chart.labels.len() != chart.values.len() {
            return Err(ChartError::MismatchedSeries {
                labels: chart.labels.len(),
                values: chart.values.len(),
            });
        }

        let mut img = RgbImage::from_pixel(self.width, self.height, WHITE);
        let plot = self.plot();

        let title_w = font::text_width(&chart.title, 2);
        draw_text(&mut img, &chart.title, self.width.saturating_sub(title_w) / 2, 18, 2, TEXT);
        draw_text(&mut img, &chart.y_label, 10, plot.top - 22, 2, TEXT);
        let x_label_w = font::text_width(&chart.x_label, 2);
        draw_text(
            &mut img,
            &chart.x_label,
            plot.left + plot.width().saturating_sub(x_label_w) / 2,
            self.height - 26,
            2,
            TEXT,
        );

        let max = chart.values.iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        let scale_max = if max > 0.0 { max } else { 1.0 };

        // Gridlines and tick labels at quarters of the range
        for step in 0..=4u32 {
            let y = plot.bottom - plot.height() * step / 4;
            fill_rect(&mut img, plot.left, y, plot.right, y + 1, GRID);
            let label = compact_number(scale_max * step as f64 / 4.0);
            let w = font::text_width(&label, 1);
            draw_text(&mut img, &label, plot.left.saturating_sub(w + 6), y.saturating_sub(3), 1, TEXT);
        }

        let bar_color = Rgb(chart.color);
        let n = chart.values.len() as u32;
        if n > 0 {
            let slot = plot.width() / n;
            let bar_w = (slot * 7 / 10).max(1);
            for (i, (label, value)) in chart.labels.iter().zip(&chart.values).enumerate() {
                let slot_left = plot.left + slot * i as u32;
                let x0 = slot_left + slot.saturating_sub(bar_w) / 2;
                let v = if value.is_finite() && *value > 0.0 { *value } else { 0.0 };
                let bar_h = ((v / scale_max) * plot.height() as f64).round() as u32;
                let y0 = plot.bottom - bar_h.min(plot.height());
                fill_rect(&mut img, x0, y0, x0 + bar_w, plot.bottom, bar_color);

                let value_text = compact_number(*value);
                let vw = font::text_width(&value_text, 1);
                draw_text(&mut img, &value_text, slot_left + slot.saturating_sub(vw) / 2, y0.saturating_sub(10), 1, TEXT);

                let max_chars = (slot / font::ADVANCE).max(1) as usize;
                let shown: String = label.chars().take(max_chars).collect();
                let lw = font::text_width(&shown, 1);
                draw_text(&mut img, &shown, slot_left + slot.saturating_sub(lw) / 2, plot.bottom + 8, 1, TEXT);
            }
        }

        // Axes last so bars never cover them
        fill_rect(&mut img, plot.left, plot.top, plot.left + 1, plot.bottom + 1, BLACK);
        fill_rect(&mut img, plot.left, plot.bottom, plot.right, plot.bottom + 1, BLACK);

        Ok(img)
    }
}

impl ChartRenderer for BitmapBarChart {
    fn render(&self, chart: &BarChart) -> Result<Vec<u8>, ChartError> {
        let img = self.draw(chart)?;
        let mut output = Vec::new();
        let mut cursor = Cursor::new(&mut output);
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| ChartError::Encode(e.to_string()))?;
        Ok(output)
    }
}

/// Fill `[x0, x1) x [y0, y1)`, clipped to the image.
fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(img.width());
    let y1 = y1.min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}

fn draw_text(img: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let mut cursor_x = x;
    for c in text.chars() {
        let rows = font::glyph(c);
        for (row_idx, bits) in rows.iter().enumerate() {
            for col in 0..font::GLYPH_WIDTH {
                if bits & (1 << (font::GLYPH_WIDTH - 1 - col)) != 0 {
                    let px = cursor_x + col * scale;
                    let py = y + row_idx as u32 * scale;
                    fill_rect(img, px, py, px + scale, py + scale, color);
                }
            }
        }
        cursor_x += font::ADVANCE * scale;
    }
}

/// Short axis/bar label: `950`, `12.50`, `42.0K`, `1.5M`, `2.0B`.
pub fn compact_number(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    let a = v.abs();
    if a >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if a >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if a >= 1e4 {
        format!("{:.1}K", v / 1e3)
    } else if a >= 100.0 || v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}
