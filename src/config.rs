//! Export configuration.
//!
//! All fields are optional in JSON; missing ones take the defaults below.
//!
//! | Field | Default | Meaning |
//! |-------|---------|---------|
//! | `dpi` | 96 | layout pixels per inch |
//! | `scale` | 2 | oversampling factor for page bitmaps |
//! | `unit` | `inch` | physical unit of the page box |
//! | `file_name` | `labels.pdf` | output file name |
//! | `strict_encoding` | false | abort instead of drawing placeholders |
//! | `barcode_caption` | true | print the value under barcodes |
//! | `font_path` | none | TTF/OTF for text (bitmap font otherwise) |
//! | `image_dir` | none | base directory for image references |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LabelError;
use crate::units::{CSS_DPI, PhysicalUnit};

pub const DEFAULT_FILE_NAME: &str = "labels.pdf";

fn default_dpi() -> f32 {
    CSS_DPI
}

fn default_scale() -> f32 {
    2.0
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

fn default_true() -> bool {
    true
}

/// Settings for one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_dpi")]
    pub dpi: f32,

    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default)]
    pub unit: PhysicalUnit,

    #[serde(default = "default_file_name")]
    pub file_name: String,

    #[serde(default)]
    pub strict_encoding: bool,

    #[serde(default = "default_true")]
    pub barcode_caption: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            scale: default_scale(),
            unit: PhysicalUnit::default(),
            file_name: default_file_name(),
            strict_encoding: false,
            barcode_caption: true,
            font_path: None,
            image_dir: None,
        }
    }
}

impl ExportConfig {
    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self, LabelError> {
        let config: ExportConfig = serde_json::from_str(json)
            .map_err(|e| LabelError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, LabelError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), LabelError> {
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            return Err(LabelError::Config(format!("dpi must be positive, got {}", self.dpi)));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(LabelError::Config(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if self.file_name.trim().is_empty() {
            return Err(LabelError::Config("file_name must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ExportConfig::from_json("{}").unwrap();
        assert_eq!(config, ExportConfig::default());
        assert_eq!(config.dpi, 96.0);
        assert_eq!(config.scale, 2.0);
        assert_eq!(config.file_name, "labels.pdf");
        assert!(config.barcode_caption);
        assert!(!config.strict_encoding);
    }

    #[test]
    fn test_partial_override() {
        let config =
            ExportConfig::from_json(r#"{"unit": "mm", "scale": 3, "strict_encoding": true}"#)
                .unwrap();
        assert_eq!(config.unit, PhysicalUnit::Millimeter);
        assert_eq!(config.scale, 3.0);
        assert!(config.strict_encoding);
        assert_eq!(config.dpi, 96.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ExportConfig::from_json(r#"{"scale": 0}"#).is_err());
        assert!(ExportConfig::from_json(r#"{"dpi": -1}"#).is_err());
        assert!(ExportConfig::from_json(r#"{"file_name": " "}"#).is_err());
    }
}
