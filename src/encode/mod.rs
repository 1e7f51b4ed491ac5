//! # Symbol Encoders
//!
//! Pluggable encoders that turn a string into a symbol raster sized to a box.
//!
//! | Symbol | Crate | Empty value |
//! |--------|-------|-------------|
//! | Code 128 (set B) | `barcoders` | blank box |
//! | QR | `qrcode` | blank box |
//!
//! Encoders only draw bars and modules. Captions and placement are the
//! rasterizer's job. Output is 8-bit grayscale, 0 = black, 255 = white.
//!
//! ## Example
//!
//! ```
//! use labelpress::encode::{DefaultSymbolEncoder, SymbolEncoder};
//!
//! let encoder = DefaultSymbolEncoder;
//! let qr = encoder.encode_qr("https://example.com", 200).unwrap();
//! assert_eq!(qr.dimensions(), (200, 200));
//! ```

mod barcode;
mod qr;

pub use barcode::{code128_modules, render_code128};
pub use qr::render_qr;

use image::{GrayImage, Luma};
use thiserror::Error;

/// Errors produced by symbol encoders.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value contains characters the symbology cannot encode
    #[error("{symbology} cannot encode {value:?}: {reason}")]
    InvalidData {
        symbology: &'static str,
        value: String,
        reason: String,
    },

    /// The target box is too small to hold a single module
    #[error("{symbology} needs at least {needed} px, box is {available} px")]
    TooSmall {
        symbology: &'static str,
        needed: u32,
        available: u32,
    },
}

/// Symbol generation seam used by the rasterizer.
///
/// Sizes are in device pixels. Implementations must be thread-safe: pages
/// encode their elements in parallel.
pub trait SymbolEncoder: Send + Sync {
    /// Encode `value` as a Code 128 barcode filling `width × height`.
    fn encode_barcode(&self, value: &str, width: u32, height: u32)
    -> Result<GrayImage, EncodeError>;

    /// Encode `value` as a QR code with side `size`.
    fn encode_qr(&self, value: &str, size: u32) -> Result<GrayImage, EncodeError>;
}

/// Encoder backed by `barcoders` and `qrcode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSymbolEncoder;

impl SymbolEncoder for DefaultSymbolEncoder {
    fn encode_barcode(
        &self,
        value: &str,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, EncodeError> {
        if value.is_empty() {
            return Ok(blank(width, height));
        }
        render_code128(value, width, height)
    }

    fn encode_qr(&self, value: &str, size: u32) -> Result<GrayImage, EncodeError> {
        if value.is_empty() {
            return Ok(blank(size, size));
        }
        render_qr(value, size)
    }
}

/// White image of the given size (at least 1×1).
pub fn blank(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width.max(1), height.max(1), Luma([255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values_are_blank() {
        let enc = DefaultSymbolEncoder;
        let bar = enc.encode_barcode("", 120, 40).unwrap();
        assert_eq!(bar.dimensions(), (120, 40));
        assert!(bar.pixels().all(|p| p.0[0] == 255));

        let qr = enc.encode_qr("", 50).unwrap();
        assert_eq!(qr.dimensions(), (50, 50));
        assert!(qr.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_encoder_is_object_safe() {
        let enc: Box<dyn SymbolEncoder> = Box::new(DefaultSymbolEncoder);
        let img = enc.encode_barcode("ABC-123", 200, 60).unwrap();
        assert!(img.pixels().any(|p| p.0[0] == 0));
    }

    #[test]
    fn test_error_display() {
        let err = EncodeError::TooSmall {
            symbology: "QR",
            needed: 21,
            available: 10,
        };
        assert_eq!(err.to_string(), "QR needs at least 21 px, box is 10 px");
    }
}
