//! # Page Rasterizer
//!
//! Renders a composed [`Page`] to a grayscale bitmap at `canvas size × scale`.
//!
//! ## Pipeline
//!
//! ```text
//! Page ──par_iter──▶ one layer per element ──in order──▶ darken onto white page
//!                    (encode, text, image)               (clipped to the page)
//! ```
//!
//! Elements are rasterized in parallel with rayon and composited afterwards in
//! render order. Layers blend with [`BlendMode::Darken`], so overlapping ink
//! stays visible and later elements never erase earlier ones.
//!
//! ## Failure isolation
//!
//! An element that fails to encode (unencodable value, box too small, missing
//! image) is replaced by a placeholder (outline with an X) and reported in
//! [`RenderedPage::placeholders`]. With `strict` set, the first such failure
//! aborts the page instead.

pub mod font;
pub mod images;

pub use self::font::TextRenderer;
pub use self::images::ImageStore;

use std::sync::Arc;

use image::{GrayImage, Luma};
use log::{trace, warn};
use rayon::prelude::*;

use crate::compose::{Instruction, Page, PlacedInstruction};
use crate::element::ElementId;
use crate::encode::{DefaultSymbolEncoder, SymbolEncoder, blank};
use crate::error::LabelError;

/// Largest page surface the rasterizer will allocate, in pixels.
pub const MAX_PAGE_PIXELS: u64 = 16_384 * 16_384;

/// Share of a barcode box taken by the human-readable caption.
const CAPTION_RATIO: f32 = 0.25;

/// Captions are dropped on barcode boxes shorter than this, in device pixels.
const MIN_CAPTION_BOX: u32 = 24;

/// How a layer combines with what is already on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Keep the darker of the two values.
    #[default]
    Darken,
    /// Layer replaces the page.
    Replace,
}

impl BlendMode {
    #[inline]
    pub fn apply(self, base: u8, layer: u8) -> u8 {
        match self {
            BlendMode::Darken => base.min(layer),
            BlendMode::Replace => layer,
        }
    }
}

/// An element that rendered as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub page: usize,
    pub element: ElementId,
    pub reason: String,
}

/// A rasterized page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub index: usize,
    pub bitmap: GrayImage,
    pub placeholders: Vec<Placeholder>,
}

/// Turns a composed page into pixels.
pub trait Rasterizer: Send + Sync {
    /// Rasterize `page` for a canvas of `width × height` layout pixels,
    /// multiplied by `scale`.
    fn rasterize(
        &self,
        page: &Page,
        width: f32,
        height: f32,
        scale: f32,
    ) -> Result<RenderedPage, LabelError>;
}

/// An element rendered into its own device-pixel box.
struct Layer {
    x: i64,
    y: i64,
    bitmap: GrayImage,
}

/// Device-pixel box of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeviceBox {
    x: i64,
    y: i64,
    width: u32,
    height: u32,
}

impl DeviceBox {
    fn of(item: &PlacedInstruction, scale: f32) -> Self {
        let g = item.geometry;
        Self {
            x: (g.x * scale).round() as i64,
            y: (g.y * scale).round() as i64,
            width: ((g.width * scale).round() as u32).max(1),
            height: ((g.height * scale).round() as u32).max(1),
        }
    }
}

/// Page surface size in device pixels, rejecting empty or oversized pages.
pub fn device_size(width: f32, height: f32, scale: f32) -> Option<(u32, u32)> {
    let w = (width * scale).round();
    let h = (height * scale).round();
    if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
        return None;
    }
    if (w as u64).saturating_mul(h as u64) > MAX_PAGE_PIXELS {
        return None;
    }
    Some((w as u32, h as u32))
}

/// CPU rasterizer built on the symbol encoders, the text renderer and an
/// image store.
#[derive(Clone)]
pub struct BitmapRasterizer {
    encoder: Arc<dyn SymbolEncoder>,
    text: TextRenderer,
    images: Arc<ImageStore>,
    strict: bool,
    barcode_caption: bool,
}

impl Default for BitmapRasterizer {
    fn default() -> Self {
        Self {
            encoder: Arc::new(DefaultSymbolEncoder),
            text: TextRenderer::default(),
            images: Arc::new(ImageStore::new()),
            strict: false,
            barcode_caption: true,
        }
    }
}

impl BitmapRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn SymbolEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_text_renderer(mut self, text: TextRenderer) -> Self {
        self.text = text;
        self
    }

    pub fn with_images(mut self, images: Arc<ImageStore>) -> Self {
        self.images = images;
        self
    }

    /// Abort on the first element failure instead of drawing a placeholder.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Draw the value as text under barcodes.
    pub fn barcode_caption(mut self, caption: bool) -> Self {
        self.barcode_caption = caption;
        self
    }

    fn render_item(&self, item: &PlacedInstruction, scale: f32) -> Result<Layer, String> {
        let b = DeviceBox::of(item, scale);

        let bitmap = match &item.instruction {
            Instruction::Barcode { value, .. } => self.render_barcode(value, b)?,
            Instruction::QrCode { value, size } => {
                let side = ((size * scale).round() as u32).clamp(1, b.width.min(b.height));
                let symbol = self.encoder.encode_qr(value, side).map_err(|e| e.to_string())?;
                centered(&symbol, b.width, b.height)
            }
            Instruction::Text { value, font_size } => {
                match self
                    .text
                    .render(value, font_size * scale, b.width)
                    .map_err(|e| e.to_string())?
                {
                    Some(text) => centered(&text, b.width, b.height),
                    None => blank(b.width, b.height),
                }
            }
            Instruction::Image { source_ref } => self
                .images
                .fitted(source_ref, b.width, b.height)
                .map_err(|e| e.to_string())?,
        };

        Ok(Layer {
            x: b.x,
            y: b.y,
            bitmap,
        })
    }

    fn render_barcode(&self, value: &str, b: DeviceBox) -> Result<GrayImage, String> {
        let caption_h = if self.barcode_caption && !value.is_empty() && b.height >= MIN_CAPTION_BOX
        {
            (b.height as f32 * CAPTION_RATIO).round() as u32
        } else {
            0
        };
        let bars_h = b.height - caption_h;

        let bars = self
            .encoder
            .encode_barcode(value, b.width, bars_h)
            .map_err(|e| e.to_string())?;

        if caption_h == 0 {
            return Ok(bars);
        }

        let mut out = blank(b.width, b.height);
        blit(&mut out, &bars, 0, 0, BlendMode::Replace);
        // leave a little air between bars and text
        let glyph_h = caption_h as f32 * 0.8;
        let caption = self
            .text
            .render(value, glyph_h, b.width)
            .map_err(|e| e.to_string())?;
        if let Some(caption) = caption {
            let band = centered(&caption, b.width, caption_h);
            blit(&mut out, &band, 0, bars_h as i64, BlendMode::Darken);
        }
        Ok(out)
    }
}

impl Rasterizer for BitmapRasterizer {
    fn rasterize(
        &self,
        page: &Page,
        width: f32,
        height: f32,
        scale: f32,
    ) -> Result<RenderedPage, LabelError> {
        let (page_w, page_h) =
            device_size(width, height, scale).ok_or_else(|| LabelError::Rasterize {
                page: page.index,
                reason: format!(
                    "cannot allocate a {}x{} px surface at scale {}",
                    width, height, scale
                ),
            })?;

        let layers: Vec<Result<Layer, String>> = page
            .items
            .par_iter()
            .map(|item| self.render_item(item, scale))
            .collect();

        let mut bitmap = GrayImage::from_pixel(page_w, page_h, Luma([255]));
        let mut placeholders = Vec::new();

        for (item, layer) in page.items.iter().zip(layers) {
            match layer {
                Ok(layer) => {
                    trace!(
                        "page {}: element {} at ({}, {})",
                        page.index, item.element, layer.x, layer.y
                    );
                    blit(&mut bitmap, &layer.bitmap, layer.x, layer.y, BlendMode::Darken);
                }
                Err(reason) if self.strict => {
                    return Err(LabelError::Encoding {
                        element: item.element,
                        reason,
                    });
                }
                Err(reason) => {
                    warn!(
                        "page {}: element {} rendered as placeholder: {}",
                        page.index, item.element, reason
                    );
                    draw_placeholder(&mut bitmap, DeviceBox::of(item, scale));
                    placeholders.push(Placeholder {
                        page: page.index,
                        element: item.element,
                        reason,
                    });
                }
            }
        }

        Ok(RenderedPage {
            index: page.index,
            bitmap,
            placeholders,
        })
    }
}

// ============================================================================
// COMPOSITING HELPERS
// ============================================================================

/// Copy `src` onto `dst` at `(x, y)`, clipped to `dst`.
fn blit(dst: &mut GrayImage, src: &GrayImage, x: i64, y: i64, mode: BlendMode) {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    for (sx, sy, px) in src.enumerate_pixels() {
        let tx = x + sx as i64;
        let ty = y + sy as i64;
        if tx < 0 || ty < 0 || tx >= dw || ty >= dh {
            continue;
        }
        let base = dst.get_pixel(tx as u32, ty as u32).0[0];
        dst.put_pixel(tx as u32, ty as u32, Luma([mode.apply(base, px.0[0])]));
    }
}

/// `src` centered on a white `width × height` box. Oversized sources are
/// clipped evenly on both sides.
fn centered(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let mut out = blank(width, height);
    let x = (width as i64 - src.width() as i64) / 2;
    let y = (height as i64 - src.height() as i64) / 2;
    blit(&mut out, src, x, y, BlendMode::Replace);
    out
}

/// Outline with both diagonals, clipped to the page.
fn draw_placeholder(dst: &mut GrayImage, b: DeviceBox) {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let mut set = |x: i64, y: i64| {
        if x >= 0 && y >= 0 && x < dw && y < dh {
            dst.put_pixel(x as u32, y as u32, Luma([0]));
        }
    };

    let (w, h) = (b.width as i64, b.height as i64);
    for i in 0..w {
        set(b.x + i, b.y);
        set(b.x + i, b.y + h - 1);
    }
    for i in 0..h {
        set(b.x, b.y + i);
        set(b.x + w - 1, b.y + i);
    }

    let steps = w.max(h);
    for i in 0..steps {
        let dx = i * (w - 1) / steps.max(1);
        let dy = i * (h - 1) / steps.max(1);
        set(b.x + dx, b.y + dy);
        set(b.x + w - 1 - dx, b.y + dy);
    }
}
