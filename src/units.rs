//! # Physical Units
//!
//! Layouts are edited in screen pixels; printed output is sized in a physical
//! unit. Every conversion goes through a single DPI so the page box and the
//! page image placed on it always agree.
//!
//! ```
//! use labelpress::units::{PhysicalUnit, px_to_unit};
//!
//! // 288 px at 96 px/in is 3 inches, or 216 points
//! assert_eq!(px_to_unit(288.0, 96.0, PhysicalUnit::Inch), 3.0);
//! assert_eq!(px_to_unit(288.0, 96.0, PhysicalUnit::Point), 216.0);
//! ```

use serde::{Deserialize, Serialize};

/// Screen resolution assumed for layout pixels.
pub const CSS_DPI: f32 = 96.0;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Millimeters per inch.
pub const MM_PER_INCH: f32 = 25.4;

/// Unit for physical page dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalUnit {
    #[default]
    Inch,
    #[serde(alias = "mm")]
    Millimeter,
    #[serde(alias = "pt")]
    Point,
}

impl PhysicalUnit {
    /// How many of this unit make up one inch.
    pub fn per_inch(self) -> f32 {
        match self {
            PhysicalUnit::Inch => 1.0,
            PhysicalUnit::Millimeter => MM_PER_INCH,
            PhysicalUnit::Point => POINTS_PER_INCH,
        }
    }

    /// Short suffix used in log output.
    pub fn suffix(self) -> &'static str {
        match self {
            PhysicalUnit::Inch => "in",
            PhysicalUnit::Millimeter => "mm",
            PhysicalUnit::Point => "pt",
        }
    }
}

/// Convert a pixel length to `unit` at `dpi` pixels per inch.
#[inline]
pub fn px_to_unit(px: f32, dpi: f32, unit: PhysicalUnit) -> f32 {
    px / dpi * unit.per_inch()
}

/// Convert a physical length back to pixels at `dpi`.
#[inline]
pub fn unit_to_px(value: f32, dpi: f32, unit: PhysicalUnit) -> f32 {
    value / unit.per_inch() * dpi
}

/// Convert a physical length to PDF points.
#[inline]
pub fn to_points(value: f32, unit: PhysicalUnit) -> f32 {
    value / unit.per_inch() * POINTS_PER_INCH
}

/// Physical page dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
    pub unit: PhysicalUnit,
}

impl PageSize {
    /// US Letter, 8.5 × 11 in.
    pub const LETTER: PageSize = PageSize {
        width: 8.5,
        height: 11.0,
        unit: PhysicalUnit::Inch,
    };

    /// Page size for a pixel canvas at `dpi`.
    pub fn from_pixels(width_px: f32, height_px: f32, dpi: f32, unit: PhysicalUnit) -> Self {
        Self {
            width: px_to_unit(width_px, dpi, unit),
            height: px_to_unit(height_px, dpi, unit),
            unit,
        }
    }

    /// Width and height in PDF points.
    pub fn in_points(&self) -> (f32, f32) {
        (to_points(self.width, self.unit), to_points(self.height, self.unit))
    }
}
