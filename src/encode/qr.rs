//! QR encoding via the qrcode crate.

use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};

use super::EncodeError;

const SYMBOLOGY: &str = "QR";

/// Render `data` as a `size × size` QR symbol.
///
/// Each module is a whole-pixel square, the largest that fits, and the symbol
/// is centered in the square. Error correction is level M.
pub fn render_qr(data: &str, size: u32) -> Result<GrayImage, EncodeError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M).map_err(|e| {
        EncodeError::InvalidData {
            symbology: SYMBOLOGY,
            value: data.to_string(),
            reason: e.to_string(),
        }
    })?;

    let modules = code.width() as u32;
    if size < modules {
        return Err(EncodeError::TooSmall {
            symbology: SYMBOLOGY,
            needed: modules,
            available: size,
        });
    }

    let cell_size = size / modules.max(1);
    let offset = (size - cell_size * modules) / 2;

    let mut img = GrayImage::from_pixel(size, size, Luma([255]));
    for qy in 0..modules {
        for qx in 0..modules {
            if code[(qx as usize, qy as usize)] != qrcode::Color::Dark {
                continue;
            }
            let (x0, y0) = (offset + qx * cell_size, offset + qy * cell_size);
            for py in y0..y0 + cell_size {
                for px in x0..x0 + cell_size {
                    img.put_pixel(px, py, Luma([0]));
                }
            }
        }
    }

    Ok(img)
}
