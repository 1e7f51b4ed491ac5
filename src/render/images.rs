//! Image sources for image elements.
//!
//! An image element references its bitmap by key. Keys are looked up among
//! registered images first, then loaded as files relative to the store's base
//! directory. Loading happens up front so rasterization never touches disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use log::{debug, warn};

use crate::element::{Content, Element};
use crate::error::LabelError;

/// Decoded images keyed by source reference.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    base_dir: Option<PathBuf>,
    images: HashMap<String, DynamicImage>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative file references against `dir`.
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
            images: HashMap::new(),
        }
    }

    /// Register an already-decoded image.
    pub fn insert(&mut self, key: impl Into<String>, image: DynamicImage) {
        self.images.insert(key.into(), image);
    }

    /// Decode and register encoded image bytes (PNG, JPEG, ...).
    pub fn insert_bytes(&mut self, key: impl Into<String>, bytes: &[u8]) -> Result<(), LabelError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| LabelError::Image(format!("Failed to decode image: {}", e)))?;
        self.insert(key, image);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.images.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Load a file reference into the store, unless already registered.
    pub fn load(&mut self, key: &str) -> Result<(), LabelError> {
        if self.contains(key) {
            return Ok(());
        }
        let path = self.path_for(key);
        let image = image::open(&path)
            .map_err(|e| LabelError::Image(format!("Failed to open {}: {}", path.display(), e)))?;
        debug!(
            "loaded image {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.insert(key, image);
        Ok(())
    }

    /// Load every image referenced by `elements`. Failures are logged and
    /// left for the rasterizer to report as placeholders.
    pub fn preload<'a>(&mut self, elements: impl IntoIterator<Item = &'a Element>) {
        for element in elements {
            if let Content::Image { source_ref } = element.content() {
                if let Err(e) = self.load(source_ref) {
                    warn!("image element {}: {}", element.id(), e);
                }
            }
        }
    }

    /// Grayscale copy of `key` scaled to exactly `width × height`.
    pub fn fitted(&self, key: &str, width: u32, height: u32) -> Result<GrayImage, LabelError> {
        let image = self
            .images
            .get(key)
            .ok_or_else(|| LabelError::Image(format!("image '{}' is not loaded", key)))?;

        let width = width.max(1);
        let height = height.max(1);
        if image.width() == width && image.height() == height {
            return Ok(image.to_luma8());
        }
        Ok(image
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_luma8())
    }
}
