//! Canvas size presets.
//!
//! Physical label stock is laid out at 96 px/in, the resolution the layout
//! editor works in:
//!
//! | Preset | Physical | Pixels |
//! |--------|----------|--------|
//! | `three_by_two` | 3 × 2 in | 288 × 192 |
//! | `four_by_six` | 4 × 6 in | 384 × 576 |
//! | `letter` | 8.5 × 11 in | 816 × 1056 |
//! | `custom` | any | any positive |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LabelError;
use crate::units::CSS_DPI;

/// Canvas dimensions in layout pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub fn validate(&self) -> Result<(), LabelError> {
        // A canvas must hold at least one minimum-size element.
        if !(self.width.is_finite() && self.width >= 1.0)
            || !(self.height.is_finite() && self.height >= 1.0)
        {
            return Err(LabelError::InvalidGeometry(format!(
                "canvas size must be at least 1x1 px, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Label stock the canvas represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSize {
    /// 3 × 2 in shipping/asset label.
    #[default]
    ThreeByTwo,
    /// 4 × 6 in shipping label.
    FourBySix,
    /// 8.5 × 11 in sheet.
    Letter,
    /// Arbitrary size in layout pixels.
    Custom { width: f32, height: f32 },
}

impl LabelSize {
    /// Built-in presets, for listing in front ends.
    pub const PRESETS: [LabelSize; 3] =
        [LabelSize::ThreeByTwo, LabelSize::FourBySix, LabelSize::Letter];

    /// Physical size in inches, for presets.
    pub fn inches(self) -> Option<(f32, f32)> {
        match self {
            LabelSize::ThreeByTwo => Some((3.0, 2.0)),
            LabelSize::FourBySix => Some((4.0, 6.0)),
            LabelSize::Letter => Some((8.5, 11.0)),
            LabelSize::Custom { .. } => None,
        }
    }

    /// Canvas dimensions in layout pixels.
    pub fn pixels(self) -> CanvasSize {
        match self {
            LabelSize::Custom { width, height } => CanvasSize { width, height },
            preset => {
                let (w, h) = preset.inches().unwrap_or((1.0, 1.0));
                CanvasSize {
                    width: w * CSS_DPI,
                    height: h * CSS_DPI,
                }
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LabelSize::ThreeByTwo => "three_by_two",
            LabelSize::FourBySix => "four_by_six",
            LabelSize::Letter => "letter",
            LabelSize::Custom { .. } => "custom",
        }
    }
}

impl fmt::Display for LabelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inches() {
            Some((w, h)) => write!(f, "{}x{} in", w, h),
            None => {
                let px = self.pixels();
                write!(f, "{}x{} px", px.width, px.height)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_pixels() {
        assert_eq!(
            LabelSize::ThreeByTwo.pixels(),
            CanvasSize {
                width: 288.0,
                height: 192.0
            }
        );
        assert_eq!(LabelSize::FourBySix.pixels().height, 576.0);
        assert_eq!(LabelSize::Letter.pixels().width, 816.0);
    }

    #[test]
    fn test_custom_validation() {
        let ok = LabelSize::Custom {
            width: 500.0,
            height: 300.0,
        };
        assert!(ok.pixels().validate().is_ok());

        let bad = LabelSize::Custom {
            width: 0.0,
            height: 300.0,
        };
        assert!(bad.pixels().validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(LabelSize::Letter.to_string(), "8.5x11 in");
        assert_eq!(
            LabelSize::Custom {
                width: 100.0,
                height: 50.0
            }
            .to_string(),
            "100x50 px"
        );
    }

    #[test]
    fn test_serde() {
        let size: LabelSize = serde_json::from_str("\"four_by_six\"").unwrap();
        assert_eq!(size, LabelSize::FourBySix);
        let size: LabelSize =
            serde_json::from_str(r#"{"custom": {"width": 400, "height": 200}}"#).unwrap();
        assert_eq!(size.pixels().width, 400.0);
    }
}
