//! # Document Assembler
//!
//! Drives one batch export: resolve bindings, then for each page compose,
//! rasterize and append to the document, then save.
//!
//! ## Flow
//!
//! ```text
//! snapshot ──resolve──▶ page_count
//!    │
//!    └─ for page in 0..page_count:
//!         cancelled? ──▶ abort (nothing written)
//!         compose ──▶ rasterize (canvas px × scale) ──▶ add_page
//!    save (temp file + rename)
//! ```
//!
//! Pages are processed strictly in order. A rasterize or write failure aborts
//! the export and no artifact is left behind. Element-level encoding failures
//! become placeholders unless `strict_encoding` is set.
//!
//! ## Hooks
//!
//! [`ExportHooks::on_generate_start`] and [`ExportHooks::on_generate_end`]
//! bracket every export; the end hook also runs when the export fails.
//!
//! ## Example
//!
//! ```no_run
//! use labelpress::config::ExportConfig;
//! use labelpress::element::{Element, Geometry, ValueSource};
//! use labelpress::export::Exporter;
//! use labelpress::layout::{Canvas, LabelSize};
//! use labelpress::table::ImportedTable;
//!
//! let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
//! canvas.place(Element::qr_code(
//!     ValueSource::column("Name"),
//!     Geometry::new(10.0, 10.0, 100.0, 100.0),
//! )?);
//! let table = ImportedTable::from_rows(
//!     vec!["Name".into()],
//!     vec![vec!["Alice".into()], vec!["Bob".into()]],
//! );
//!
//! let mut exporter = Exporter::new(ExportConfig::default())?;
//! let report = exporter.export(&canvas, &table)?;
//! assert_eq!(report.pages, 2);
//! # Ok::<(), labelpress::LabelError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info};

use crate::binding::{BindingIssue, Resolution, resolve};
use crate::compose::PageComposer;
use crate::config::ExportConfig;
use crate::encode::{DefaultSymbolEncoder, SymbolEncoder};
use crate::error::LabelError;
use crate::layout::Canvas;
use crate::pdf::{DocumentWriter, PdfWriter};
use crate::render::{
    BitmapRasterizer, ImageStore, Placeholder, Rasterizer, RenderedPage, TextRenderer,
};
use crate::table::ImportedTable;
use crate::units::PageSize;

/// Shared flag for aborting an export between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the exporter can run again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Lifecycle callbacks around an export.
pub trait ExportHooks: Send {
    fn on_generate_start(&mut self, _page_count: usize) {}

    /// Called after each page is appended.
    fn on_page(&mut self, _index: usize, _page_count: usize) {}

    fn on_generate_end(&mut self, _result: Result<&ExportReport, &LabelError>) {}
}

/// Outcome of a successful export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub pages: usize,
    pub page_size: PageSize,
    pub placeholders: Vec<Placeholder>,
    pub issues: Vec<BindingIssue>,
    pub path: PathBuf,
}

/// Runs batch exports with one configuration.
pub struct Exporter {
    config: ExportConfig,
    encoder: Arc<dyn SymbolEncoder>,
    text: TextRenderer,
    images: Arc<ImageStore>,
    rasterizer: Option<Box<dyn Rasterizer>>,
    writer: Box<dyn DocumentWriter>,
    hooks: Option<Box<dyn ExportHooks>>,
    cancel: CancelToken,
}

impl Exporter {
    /// Build an exporter with the default encoder, rasterizer and PDF writer.
    pub fn new(config: ExportConfig) -> Result<Self, LabelError> {
        config.validate()?;
        let text = TextRenderer::from_config(config.font_path.as_deref())?;
        let images = match &config.image_dir {
            Some(dir) => ImageStore::with_base_dir(dir),
            None => ImageStore::new(),
        };
        Ok(Self {
            config,
            encoder: Arc::new(DefaultSymbolEncoder),
            text,
            images: Arc::new(images),
            rasterizer: None,
            writer: Box::new(PdfWriter::default()),
            hooks: None,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Replace the symbol encoder used by the default rasterizer.
    pub fn with_encoder(mut self, encoder: Arc<dyn SymbolEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Use a custom rasterizer instead of [`BitmapRasterizer`].
    pub fn with_rasterizer(mut self, rasterizer: Box<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_writer(mut self, writer: Box<dyn DocumentWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn ExportHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Token that cancels this exporter's running export.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Images available to image elements, keyed by source reference.
    pub fn images_mut(&mut self) -> &mut ImageStore {
        Arc::make_mut(&mut self.images)
    }

    /// Export to `config.file_name` in the working directory.
    pub fn export(
        &mut self,
        canvas: &Canvas,
        table: &ImportedTable,
    ) -> Result<ExportReport, LabelError> {
        let path = PathBuf::from(&self.config.file_name);
        self.export_to(canvas, table, &path)
    }

    /// Export every page to a single document at `path`.
    ///
    /// The canvas is snapshotted on entry; edits made while the export runs
    /// are not observed.
    pub fn export_to(
        &mut self,
        canvas: &Canvas,
        table: &ImportedTable,
        path: &Path,
    ) -> Result<ExportReport, LabelError> {
        let snapshot = canvas.snapshot();
        let resolution = resolve(snapshot.elements(), table);
        let page_count = resolution.page_count();

        info!(
            "export: {} element(s), {} page(s) -> {}",
            snapshot.elements().len(),
            page_count,
            path.display()
        );
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_generate_start(page_count);
        }

        let result = self.generate(&snapshot, &resolution, path);

        match &result {
            Ok(report) => info!(
                "export: wrote {} page(s), {} placeholder(s)",
                report.pages,
                report.placeholders.len()
            ),
            Err(e) => error!("export failed: {}", e),
        }
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_generate_end(result.as_ref());
        }
        result
    }

    /// Render a single page without writing a document.
    pub fn preview(
        &mut self,
        canvas: &Canvas,
        table: &ImportedTable,
        page: usize,
    ) -> Result<RenderedPage, LabelError> {
        let resolution = resolve(canvas.elements(), table);
        if page >= resolution.page_count() {
            return Err(LabelError::Config(format!(
                "page {} out of range ({} page(s))",
                page + 1,
                resolution.page_count()
            )));
        }

        self.images_mut().preload(canvas.elements());
        let default;
        let rasterizer: &dyn Rasterizer = match &self.rasterizer {
            Some(r) => r.as_ref(),
            None => {
                default = self.bitmap_rasterizer();
                &default
            }
        };

        let composed = PageComposer::new(canvas.elements(), &resolution).compose(page);
        rasterizer.rasterize(&composed, canvas.width(), canvas.height(), self.config.scale)
    }

    fn bitmap_rasterizer(&self) -> BitmapRasterizer {
        BitmapRasterizer::new()
            .with_encoder(Arc::clone(&self.encoder))
            .with_text_renderer(self.text.clone())
            .with_images(Arc::clone(&self.images))
            .strict(self.config.strict_encoding)
            .barcode_caption(self.config.barcode_caption)
    }

    fn generate(
        &mut self,
        snapshot: &Canvas,
        resolution: &Resolution,
        path: &Path,
    ) -> Result<ExportReport, LabelError> {
        let size = snapshot.size();
        let page_size =
            PageSize::from_pixels(size.width, size.height, self.config.dpi, self.config.unit);
        let page_count = resolution.page_count();
        let scale = self.config.scale;

        self.images_mut().preload(snapshot.elements());
        let default;
        let rasterizer: &dyn Rasterizer = match &self.rasterizer {
            Some(r) => r.as_ref(),
            None => {
                default = self.bitmap_rasterizer();
                &default
            }
        };

        self.writer.new_document(page_size)?;
        let composer = PageComposer::new(snapshot.elements(), resolution);
        let mut placeholders = Vec::new();

        for index in 0..page_count {
            if self.cancel.is_cancelled() {
                return Err(LabelError::Cancelled(index));
            }

            let page = composer.compose(index);
            let rendered = rasterizer.rasterize(&page, size.width, size.height, scale)?;
            debug!(
                "page {}/{}: {}x{} px",
                index + 1,
                page_count,
                rendered.bitmap.width(),
                rendered.bitmap.height()
            );

            self.writer.add_page(&rendered.bitmap)?;
            placeholders.extend(rendered.placeholders);
            if let Some(hooks) = self.hooks.as_mut() {
                hooks.on_page(index, page_count);
            }
        }

        self.writer.save(path)?;

        Ok(ExportReport {
            pages: page_count,
            page_size,
            placeholders,
            issues: resolution.issues().to_vec(),
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Geometry, ValueSource};
    use crate::layout::LabelSize;

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!clone.is_cancelled());
    }

    #[test]
    fn test_preview_page_out_of_range() {
        let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
        canvas.place(
            Element::text(ValueSource::fixed("HQ"), Geometry::new(0.0, 0.0, 100.0, 40.0)).unwrap(),
        );
        let mut exporter = Exporter::new(ExportConfig::default()).unwrap();
        let err = exporter
            .preview(&canvas, &ImportedTable::new(), 1)
            .unwrap_err();
        assert!(matches!(err, LabelError::Config(_)));
    }

    #[test]
    fn test_preview_dimensions() {
        let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
        canvas.place(
            Element::text(ValueSource::fixed("HQ"), Geometry::new(0.0, 0.0, 100.0, 40.0)).unwrap(),
        );
        let mut exporter = Exporter::new(ExportConfig::default()).unwrap();
        let page = exporter.preview(&canvas, &ImportedTable::new(), 0).unwrap();
        assert_eq!(page.bitmap.dimensions(), (576, 384));
    }
}
