//! Code 128 encoding via the barcoders crate.

use barcoders::sym::code128::Code128;
use image::{GrayImage, Luma};

use super::EncodeError;

const SYMBOLOGY: &str = "Code 128";

/// Encode `data` as Code 128 modules (1 = bar, 0 = space).
pub fn code128_modules(data: &str) -> Result<Vec<u8>, EncodeError> {
    // Code128 requires a character set prefix:
    // - Character Set A (Ā): uppercase, control chars, digits
    // - Character Set B (Ɓ): uppercase, lowercase, digits, special chars
    // - Character Set C (Ć): digit pairs only (high density)
    // Set B covers the widest range of printable characters.
    let prefixed = format!("\u{0181}{}", data);

    let barcode = Code128::new(&prefixed).map_err(|e| EncodeError::InvalidData {
        symbology: SYMBOLOGY,
        value: data.to_string(),
        reason: e.to_string(),
    })?;

    Ok(barcode.encode())
}

/// Render `data` as full-height bars centered in `width × height`.
///
/// Every module is the same whole number of pixels wide, the largest that
/// fits. Fails when the box is narrower than the module count.
pub fn render_code128(data: &str, width: u32, height: u32) -> Result<GrayImage, EncodeError> {
    let modules = code128_modules(data)?;
    let module_count = modules.len() as u32;

    if width < module_count {
        return Err(EncodeError::TooSmall {
            symbology: SYMBOLOGY,
            needed: module_count,
            available: width,
        });
    }

    let height = height.max(1);
    let mut img = GrayImage::from_pixel(width, height, Luma([255]));

    let module_w = width / module_count.max(1);
    let left = (width - module_w * module_count) / 2;

    for (i, _) in modules.iter().enumerate().filter(|(_, m)| **m == 1) {
        let x0 = left + i as u32 * module_w;
        for x in x0..x0 + module_w {
            for y in 0..height {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code128_modules() {
        let modules = code128_modules("Hello").unwrap();
        assert!(!modules.is_empty());
        assert!(modules.iter().any(|&m| m == 1));
        // start + 5 chars + checksum are 11 modules each, stop is 13
        assert_eq!(modules.len(), 11 * 7 + 13);
    }

    #[test]
    fn test_render_centers_whole_modules() {
        // 101 modules at 2 px each, 49 px quiet zone on each side
        let img = render_code128("SKU-42", 300, 80).unwrap();
        assert_eq!(img.dimensions(), (300, 80));
        assert_eq!(img.get_pixel(48, 0).0[0], 255);
        // first module of every Code 128 symbol is a bar
        assert_eq!(img.get_pixel(49, 0).0[0], 0);
        assert_eq!(img.get_pixel(50, 79).0[0], 0);
        assert_eq!(img.get_pixel(251, 0).0[0], 255);
    }

    #[test]
    fn test_bar_widths_are_module_multiples() {
        let modules = code128_modules("SKU-42").unwrap();
        let img = render_code128("SKU-42", 300, 1).unwrap();
        for (i, &m) in modules.iter().enumerate() {
            let x = 49 + i as u32 * 2;
            let want = if m == 1 { 0 } else { 255 };
            assert_eq!(img.get_pixel(x, 0).0[0], want);
            assert_eq!(img.get_pixel(x + 1, 0).0[0], want);
        }
    }

    #[test]
    fn test_exact_fit_has_one_pixel_modules() {
        let modules = code128_modules("SKU-42").unwrap();
        let img = render_code128("SKU-42", modules.len() as u32, 1).unwrap();
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_rows_identical() {
        let img = render_code128("row", 200, 10).unwrap();
        for x in 0..200 {
            let top = img.get_pixel(x, 0).0[0];
            assert_eq!(img.get_pixel(x, 9).0[0], top);
        }
    }

    #[test]
    fn test_too_narrow() {
        let err = render_code128("a long barcode value", 20, 50).unwrap_err();
        assert!(matches!(err, EncodeError::TooSmall { .. }));
    }

    #[test]
    fn test_non_ascii_rejected() {
        let err = code128_modules("naïve ☃").unwrap_err();
        assert!(matches!(err, EncodeError::InvalidData { .. }));
    }
}
