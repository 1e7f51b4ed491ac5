//! Text rasterization.
//!
//! Two backends:
//!
//! - **Bitmap** (default): the Spleen 12×24 bitmap font, scaled with
//!   nearest-neighbor sampling to the requested pixel height.
//! - **TrueType**: any TTF/OTF loaded at runtime, rendered anti-aliased with
//!   ab_glyph.
//!
//! Both produce a tight grayscale image of a single line (0 = black ink,
//! 255 = paper) that the rasterizer centers inside the element box.

use std::path::Path;

use ab_glyph::{Font, FontArc, ScaleFont};
use image::{GrayImage, Luma};
use spleen_font::{FONT_12X24, PSF2Font};

use crate::error::LabelError;

const SPLEEN_WIDTH: usize = 12;
const SPLEEN_HEIGHT: usize = 24;

/// Renders single-line strings to grayscale bitmaps.
#[derive(Clone, Default)]
pub enum TextRenderer {
    #[default]
    Bitmap,
    TrueType(FontArc),
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextRenderer::Bitmap => f.write_str("TextRenderer::Bitmap"),
            TextRenderer::TrueType(_) => f.write_str("TextRenderer::TrueType"),
        }
    }
}

impl TextRenderer {
    /// Load a TrueType/OpenType font from disk.
    pub fn from_font_file(path: &Path) -> Result<Self, LabelError> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            LabelError::Config(format!("Invalid font {}: {}", path.display(), e))
        })?;
        Ok(TextRenderer::TrueType(font))
    }

    /// Bitmap font unless a font file is configured.
    pub fn from_config(font_path: Option<&Path>) -> Result<Self, LabelError> {
        match font_path {
            Some(path) => Self::from_font_file(path),
            None => Ok(TextRenderer::Bitmap),
        }
    }

    /// Render `text` on one line with glyphs `pixel_height` tall.
    ///
    /// A line wider than `max_width` is cut to its middle `max_width` pixels,
    /// the part that stays visible once centered in the element box. Empty
    /// text yields `None`.
    pub fn render(
        &self,
        text: &str,
        pixel_height: f32,
        max_width: u32,
    ) -> Result<Option<GrayImage>, LabelError> {
        if text.is_empty() {
            return Ok(None);
        }
        let pixel_height = pixel_height.max(1.0);
        let max_width = max_width.max(1);
        match self {
            TextRenderer::Bitmap => render_bitmap(text, pixel_height, max_width).map(Some),
            TextRenderer::TrueType(font) => {
                render_ttf(font, text, pixel_height, max_width).map(Some)
            }
        }
    }
}

/// Left edge and width of the visible part of a `full`-wide line in a box
/// `max` wide, matching an even clip on both sides.
fn visible_window(full: u64, max: u32) -> (u64, u32) {
    if full <= max as u64 {
        (0, full as u32)
    } else {
        ((full - max as u64) / 2, max)
    }
}

fn text_too_large(what: &str) -> LabelError {
    LabelError::Image(format!("text {} exceeds the drawable range", what))
}

// ============================================================================
// BITMAP (SPLEEN)
// ============================================================================

fn render_bitmap(text: &str, pixel_height: f32, max_width: u32) -> Result<GrayImage, LabelError> {
    let mut spleen = PSF2Font::new(FONT_12X24)
        .map_err(|_| LabelError::Config("embedded Spleen font failed to load".into()))?;

    let dst_h = u32::try_from(pixel_height.round() as u64).map_err(|_| text_too_large("height"))?;
    let cell_w = ((SPLEEN_WIDTH as u64 * dst_h as u64) / SPLEEN_HEIGHT as u64).max(1);
    let full_w = cell_w
        .checked_mul(text.chars().count() as u64)
        .ok_or_else(|| text_too_large("width"))?;
    let (window_x, width) = visible_window(full_w, max_width);

    let dst_w = cell_w as usize;
    let dst_h_us = dst_h as usize;
    let mut img = GrayImage::from_pixel(width.max(1), dst_h.max(1), Luma([255]));

    // Only the cells overlapping the window are drawn.
    let first = (window_x / cell_w) as usize;
    let last = (window_x + width as u64).div_ceil(cell_w) as usize;

    for (i, ch) in text.chars().enumerate().skip(first).take(last - first) {
        let mut glyph = vec![0u8; SPLEEN_WIDTH * SPLEEN_HEIGHT];
        let utf8 = ch.to_string();

        if let Some(spleen_glyph) = spleen.glyph_for_utf8(utf8.as_bytes()) {
            for (row_y, row) in spleen_glyph.enumerate() {
                for (col_x, on) in row.enumerate() {
                    if row_y < SPLEEN_HEIGHT && col_x < SPLEEN_WIDTH && on {
                        glyph[row_y * SPLEEN_WIDTH + col_x] = 1;
                    }
                }
            }
        } else if !ch.is_whitespace() {
            draw_box(&mut glyph, SPLEEN_WIDTH, SPLEEN_HEIGHT);
        }

        let mut scaled = vec![0u8; dst_w * dst_h_us];
        scale_bitmap(&glyph, SPLEEN_WIDTH, SPLEEN_HEIGHT, &mut scaled, dst_w, dst_h_us);

        let origin_x = i as i64 * cell_w as i64 - window_x as i64;
        for y in 0..dst_h_us {
            for x in 0..dst_w {
                let tx = origin_x + x as i64;
                if scaled[y * dst_w + x] != 0 && tx >= 0 && tx < width as i64 {
                    img.put_pixel(tx as u32, y as u32, Luma([0]));
                }
            }
        }
    }

    Ok(img)
}

/// Nearest-neighbor scale of a 1-byte-per-pixel bitmap.
fn scale_bitmap(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src_w / dst_w;
            let sy = dy * src_h / dst_h;
            dst[dy * dst_w + dx] = src[sy * src_w + sx];
        }
    }
}

/// Outline box for characters missing from the font.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 2..width - 2 {
        glyph[4 * width + x] = 1;
        glyph[(height - 5) * width + x] = 1;
    }
    for y in 4..height - 4 {
        glyph[y * width + 2] = 1;
        glyph[y * width + width - 3] = 1;
    }
}

// ============================================================================
// TRUETYPE (AB_GLYPH)
// ============================================================================

fn render_ttf(
    font: &FontArc,
    text: &str,
    pixel_height: f32,
    max_width: u32,
) -> Result<GrayImage, LabelError> {
    let scaled = font.as_scaled(pixel_height);

    let full_w: f64 = text
        .chars()
        .map(|ch| scaled.h_advance(font.glyph_id(ch)) as f64)
        .sum();
    if !full_w.is_finite() || full_w > u64::MAX as f64 {
        return Err(text_too_large("width"));
    }
    let (window_x, width) = visible_window((full_w.ceil() as u64).max(1), max_width);
    let window_x = window_x as f64;
    let width = width.max(1) as usize;

    let ascent = scaled.ascent();
    let height = u32::try_from((ascent - scaled.descent()).ceil().max(1.0) as u64)
        .map_err(|_| text_too_large("height"))? as usize;

    let mut coverage = vec![0.0f32; width * height];
    let mut caret_x = 0.0f64;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        let advance = scaled.h_advance(glyph_id) as f64;
        let glyph_x = caret_x - window_x;
        caret_x += advance;

        // Side bearings can overhang the advance by a little.
        if glyph_x + advance + pixel_height as f64 <= 0.0 {
            continue;
        }
        if glyph_x - pixel_height as f64 >= width as f64 {
            break;
        }

        let glyph = glyph_id
            .with_scale_and_position(pixel_height, ab_glyph::point(glyph_x as f32, ascent));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, c| {
                let x = px as i64 + bounds.min.x as i64;
                let y = py as i64 + bounds.min.y as i64;
                if x >= 0 && x < width as i64 && y >= 0 && y < height as i64 {
                    let idx = y as usize * width + x as usize;
                    coverage[idx] = (coverage[idx] + c).min(1.0);
                }
            });
        }
    }

    Ok(GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let c = coverage[y as usize * width + x as usize];
        Luma([255 - (c * 255.0).round() as u8])
    }))
}
