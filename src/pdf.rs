//! # Document Writer
//!
//! Accumulates rasterized pages and emits a multi-page PDF.
//!
//! Every page has the same MediaBox (the canvas size in points) and draws
//! exactly one full-page grayscale image:
//!
//! ```text
//! q  W 0 0 H 0 0 cm  /Im0 Do  Q
//! ```
//!
//! Image data is stored as 8-bit DeviceGray, Flate-compressed. Saving writes a
//! temporary file next to the destination and renames it into place, so a
//! failed export never leaves a partial document behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::GrayImage;
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::error::LabelError;
use crate::units::PageSize;

/// Sink for rendered pages.
pub trait DocumentWriter {
    /// Discard any pages and start a new document whose pages are `size`.
    fn new_document(&mut self, size: PageSize) -> Result<(), LabelError>;

    /// Append one page showing `bitmap` stretched over the full page.
    fn add_page(&mut self, bitmap: &GrayImage) -> Result<(), LabelError>;

    /// Number of pages added so far.
    fn page_count(&self) -> usize;

    /// Serialize the document.
    fn to_bytes(&mut self) -> Result<Vec<u8>, LabelError>;

    /// Serialize and write to `path` atomically.
    fn save(&mut self, path: &Path) -> Result<(), LabelError> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)
    }
}

const DEFAULT_TITLE: &str = "Labels";

/// PDF document writer backed by lopdf.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    width_pt: f32,
    height_pt: f32,
    title: String,
}

impl PdfWriter {
    /// Start an empty document whose pages are `size`.
    pub fn new(size: PageSize) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let (width_pt, height_pt) = size.in_points();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            width_pt,
            height_pt,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Page size in points.
    pub fn page_size_pt(&self) -> (f32, f32) {
        (self.width_pt, self.height_pt)
    }

    fn image_stream(bitmap: &GrayImage) -> Result<Stream, LabelError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(bitmap.as_raw())
            .and_then(|_| encoder.finish())
            .map(|data| {
                Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => bitmap.width() as i64,
                        "Height" => bitmap.height() as i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                        "Filter" => "FlateDecode",
                    },
                    data,
                )
                .with_compression(false)
            })
            .map_err(|e| LabelError::DocumentWrite(format!("image compression failed: {}", e)))
    }

    fn finalize(&mut self) {
        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            self.width_pt.into(),
            self.height_pt.into(),
        ];
        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.kids.len() as i64,
            "Kids" => self.kids.clone(),
            "MediaBox" => media_box,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let date = Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal(self.title.clone()),
            "Producer" => Object::string_literal(concat!("labelpress ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(date),
        });
        self.doc.trailer.set("Info", info_id);
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new(PageSize::LETTER)
    }
}

impl DocumentWriter for PdfWriter {
    fn new_document(&mut self, size: PageSize) -> Result<(), LabelError> {
        let (w, h) = size.in_points();
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(LabelError::DocumentWrite(format!(
                "invalid page size {}x{} pt",
                w, h
            )));
        }
        let title = std::mem::take(&mut self.title);
        *self = Self::new(size).with_title(title);
        Ok(())
    }

    fn add_page(&mut self, bitmap: &GrayImage) -> Result<(), LabelError> {
        let image_id = self.doc.add_object(Self::image_stream(bitmap)?);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        self.width_pt.into(),
                        0.into(),
                        0.into(),
                        self.height_pt.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| LabelError::DocumentWrite(format!("content stream: {}", e)))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        self.kids.push(page_id.into());
        debug!(
            "pdf: page {} ({}x{} px)",
            self.kids.len(),
            bitmap.width(),
            bitmap.height()
        );
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn to_bytes(&mut self) -> Result<Vec<u8>, LabelError> {
        self.finalize();
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| LabelError::DocumentWrite(e.to_string()))?;
        Ok(buffer)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "labels.pdf".to_string());
    path.with_file_name(format!(".{}.part", name))
}

/// Write `bytes` to a sibling temp file, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LabelError> {
    let tmp = temp_path(path);
    let result = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(LabelError::DocumentWrite(format!(
            "cannot write {}: {}",
            path.display(),
            e
        )));
    }
    Ok(())
}
