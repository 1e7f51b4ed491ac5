//! # Export Tests
//!
//! End-to-end batch exports: layout + table in, PDF out.
//!
//! PDFs are re-read with lopdf to check page count and page box. Exports go
//! to a temporary directory per test.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::GrayImage;
use lopdf::Document;
use pretty_assertions::assert_eq;

use labelpress::binding::BindingIssue;
use labelpress::element::{ColumnRef, Element, Geometry, ValueSource};
use labelpress::export::{ExportHooks, ExportReport};
use labelpress::layout::{Encodings, ResizeHandle};
use labelpress::pdf::DocumentWriter;
use labelpress::table::Column;
use labelpress::units::{PageSize, PhysicalUnit};
use labelpress::{Canvas, ExportConfig, Exporter, ImportedTable, LabelError, LabelSize};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn table(columns: &[(&str, &[&str])]) -> ImportedTable {
    ImportedTable::from_columns(
        columns
            .iter()
            .map(|(name, values)| Column::new(*name, strings(values))),
    )
}

fn exporter() -> Exporter {
    Exporter::new(ExportConfig::default()).unwrap()
}

/// Page count and first page's MediaBox of a saved PDF.
fn inspect(path: &Path) -> (usize, Vec<f32>) {
    let doc = Document::load(path).unwrap();
    let pages = doc.get_pages();
    let first = *pages.values().next().unwrap();
    let media_box = doc
        .get_dictionary(first)
        .ok()
        .and_then(|page| page.get(b"MediaBox").ok().cloned())
        .or_else(|| {
            // inherited from the page tree root
            let root = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
            doc.get_dictionary(root)
                .unwrap()
                .get(b"MediaBox")
                .ok()
                .cloned()
        })
        .unwrap();
    let dims = media_box
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_float().unwrap())
        .collect();
    (pages.len(), dims)
}

fn dark_pixels(img: &GrayImage) -> usize {
    img.pixels().filter(|p| p.0[0] < 128).count()
}

#[derive(Default)]
struct HookCounts {
    start: AtomicUsize,
    end: AtomicUsize,
    pages: AtomicUsize,
    last_ok: Mutex<Option<bool>>,
}

struct CountingHooks(Arc<HookCounts>);

impl ExportHooks for CountingHooks {
    fn on_generate_start(&mut self, _page_count: usize) {
        self.0.start.fetch_add(1, Ordering::SeqCst);
    }

    fn on_page(&mut self, _index: usize, _page_count: usize) {
        self.0.pages.fetch_add(1, Ordering::SeqCst);
    }

    fn on_generate_end(&mut self, result: Result<&ExportReport, &LabelError>) {
        self.0.end.fetch_add(1, Ordering::SeqCst);
        *self.0.last_ok.lock().unwrap() = Some(result.is_ok());
    }
}

/// Writer that fails on a given page.
struct FailingWriter {
    fail_on: usize,
    pages: usize,
}

impl DocumentWriter for FailingWriter {
    fn new_document(&mut self, _size: PageSize) -> Result<(), LabelError> {
        self.pages = 0;
        Ok(())
    }

    fn add_page(&mut self, _bitmap: &GrayImage) -> Result<(), LabelError> {
        if self.pages == self.fail_on {
            return Err(LabelError::DocumentWrite("disk full".into()));
        }
        self.pages += 1;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages
    }

    fn to_bytes(&mut self) -> Result<Vec<u8>, LabelError> {
        Ok(b"%PDF-1.5\n".to_vec())
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_bound_qr_one_page_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    canvas.place(
        Element::qr_code(ValueSource::column("Name"), Geometry::new(10.0, 10.0, 100.0, 100.0))
            .unwrap(),
    );
    let table = table(&[("Name", &["Alice", "Bob"])]);

    let report = exporter().export_to(&canvas, &table, &path).unwrap();
    assert_eq!(report.pages, 2);
    assert!(report.placeholders.is_empty());
    assert!(report.issues.is_empty());
    assert_eq!(report.page_size.unit, PhysicalUnit::Inch);
    assert_eq!((report.page_size.width, report.page_size.height), (3.0, 2.0));

    let (pages, media_box) = inspect(&path);
    assert_eq!(pages, 2);
    assert_eq!(media_box, vec![0.0, 0.0, 216.0, 144.0]);
}

#[test]
fn test_bound_pages_differ() {
    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    canvas.place(
        Element::qr_code(ValueSource::column("Name"), Geometry::new(10.0, 10.0, 100.0, 100.0))
            .unwrap(),
    );
    let table = table(&[("Name", &["Alice", "Bob"])]);

    let mut exporter = exporter();
    let first = exporter.preview(&canvas, &table, 0).unwrap();
    let second = exporter.preview(&canvas, &table, 1).unwrap();
    assert_eq!(first.bitmap.dimensions(), (576, 384));
    assert!(dark_pixels(&first.bitmap) > 0);
    assert_ne!(first.bitmap.as_raw(), second.bitmap.as_raw());
}

#[test]
fn test_static_text_single_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    canvas.place(
        Element::text(ValueSource::fixed("Warehouse A"), Geometry::new(20.0, 20.0, 200.0, 50.0))
            .unwrap(),
    );

    let report = exporter()
        .export_to(&canvas, &ImportedTable::new(), &path)
        .unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(inspect(&path).0, 1);
}

#[test]
fn test_static_ignores_unrelated_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    canvas.place(
        Element::text(ValueSource::fixed("HQ"), Geometry::new(0.0, 0.0, 100.0, 40.0)).unwrap(),
    );
    let table = table(&[("Name", &["a", "b", "c"])]);

    let report = exporter().export_to(&canvas, &table, &path).unwrap();
    assert_eq!(report.pages, 1);
}

#[test]
fn test_mismatched_columns_render_blank() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::FourBySix);
    let short = canvas.place(
        Element::text(ValueSource::column("Short"), Geometry::new(10.0, 10.0, 200.0, 50.0))
            .unwrap(),
    );
    canvas.place(
        Element::barcode(ValueSource::column("Long"), Geometry::new(10.0, 100.0, 300.0, 80.0))
            .unwrap(),
    );
    let table = table(&[
        ("Short", &["1", "2", "3"]),
        ("Long", &["A1", "B2", "C3", "D4", "E5"]),
    ]);

    let report = exporter().export_to(&canvas, &table, &path).unwrap();
    assert_eq!(report.pages, 5);
    assert_eq!(inspect(&path).0, 5);
    assert_eq!(
        report.issues,
        vec![BindingIssue::ColumnLengthMismatch {
            column: ColumnRef::new("Short"),
            len: 3,
            page_count: 5,
        }]
    );

    // page 4: the short column's text box is blank
    let page = exporter().preview(&canvas, &table, 3).unwrap();
    let g = *canvas.get(short).unwrap().geometry();
    let ink = (0..(g.width as u32 * 2))
        .flat_map(|x| (0..(g.height as u32 * 2)).map(move |y| (x, y)))
        .filter(|&(x, y)| {
            page.bitmap
                .get_pixel(x + g.x as u32 * 2, y + g.y as u32 * 2)
                .0[0]
                < 128
        })
        .count();
    assert_eq!(ink, 0);
}

#[test]
fn test_missing_column_is_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    canvas.place(
        Element::text(ValueSource::column("Nope"), Geometry::new(0.0, 0.0, 100.0, 40.0)).unwrap(),
    );
    canvas.place(
        Element::text(ValueSource::column("Name"), Geometry::new(0.0, 50.0, 100.0, 40.0))
            .unwrap(),
    );
    let table = table(&[("Name", &["x", "y"])]);

    let report = exporter().export_to(&canvas, &table, &path).unwrap();
    assert_eq!(report.pages, 2);
    assert!(matches!(
        report.issues.as_slice(),
        [BindingIssue::MissingBinding { .. }]
    ));
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_unencodable_value_becomes_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::FourBySix);
    let barcode = canvas.place(
        Element::barcode(ValueSource::column("Code"), Geometry::new(10.0, 10.0, 300.0, 80.0))
            .unwrap(),
    );
    let table = table(&[("Code", &["OK-1", "snow ☃"])]);

    let report = exporter().export_to(&canvas, &table, &path).unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.placeholders.len(), 1);
    assert_eq!(report.placeholders[0].page, 1);
    assert_eq!(report.placeholders[0].element, barcode);
    assert!(path.exists());
}

#[test]
fn test_very_long_bound_text_exports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::Letter);
    canvas.place(
        Element::text(ValueSource::column("Note"), Geometry::new(0.0, 0.0, 816.0, 1056.0))
            .unwrap(),
    );
    let long = "X".repeat(200_000);
    let table = table(&[("Note", &["short", long.as_str()])]);

    let report = exporter().export_to(&canvas, &table, &path).unwrap();
    assert_eq!(report.pages, 2);
    assert!(report.placeholders.is_empty());
    assert_eq!(inspect(&path).0, 2);
}

#[test]
fn test_strict_encoding_aborts_without_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::FourBySix);
    canvas.place(
        Element::barcode(ValueSource::column("Code"), Geometry::new(10.0, 10.0, 300.0, 80.0))
            .unwrap(),
    );
    let table = table(&[("Code", &["OK-1", "snow ☃"])]);

    let config = ExportConfig {
        strict_encoding: true,
        ..Default::default()
    };
    let err = Exporter::new(config)
        .unwrap()
        .export_to(&canvas, &table, &path)
        .unwrap_err();
    assert!(matches!(err, LabelError::Encoding { .. }));
    assert!(!path.exists());
}

#[test]
fn test_writer_failure_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    canvas.place(
        Element::text(ValueSource::column("Name"), Geometry::new(0.0, 0.0, 100.0, 40.0)).unwrap(),
    );
    let table = table(&[("Name", &["a", "b", "c"])]);

    let counts = Arc::new(HookCounts::default());
    let mut exporter = exporter()
        .with_writer(Box::new(FailingWriter {
            fail_on: 1,
            pages: 0,
        }))
        .with_hooks(Box::new(CountingHooks(Arc::clone(&counts))));

    let err = exporter.export_to(&canvas, &table, &path).unwrap_err();
    assert!(err.is_export_failure());
    assert!(!path.exists());
    assert_eq!(counts.end.load(Ordering::SeqCst), 1);
    assert_eq!(*counts.last_ok.lock().unwrap(), Some(false));
}

#[test]
fn test_cancel_before_first_page_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    canvas.place(
        Element::qr_code(ValueSource::column("Name"), Geometry::new(0.0, 0.0, 80.0, 80.0))
            .unwrap(),
    );
    let table = table(&[("Name", &["a", "b"])]);

    let counts = Arc::new(HookCounts::default());
    let mut exporter = exporter().with_hooks(Box::new(CountingHooks(Arc::clone(&counts))));
    let token = exporter.cancel_token();
    token.cancel();

    let err = exporter.export_to(&canvas, &table, &path).unwrap_err();
    assert!(matches!(err, LabelError::Cancelled(0)));
    assert!(!path.exists());
    assert_eq!(counts.start.load(Ordering::SeqCst), 1);
    assert_eq!(counts.end.load(Ordering::SeqCst), 1);
    assert_eq!(counts.pages.load(Ordering::SeqCst), 0);

    token.reset();
    exporter.export_to(&canvas, &table, &path).unwrap();
    assert!(path.exists());
}

// ============================================================================
// HOOKS & SNAPSHOT
// ============================================================================

#[test]
fn test_hooks_fire_once_each() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    canvas.import_column("Name", Encodings::TEXT);
    let table = table(&[("Name", &["a", "b", "c"])]);

    let counts = Arc::new(HookCounts::default());
    let mut exporter = exporter().with_hooks(Box::new(CountingHooks(Arc::clone(&counts))));
    exporter.export_to(&canvas, &table, &path).unwrap();

    assert_eq!(counts.start.load(Ordering::SeqCst), 1);
    assert_eq!(counts.end.load(Ordering::SeqCst), 1);
    assert_eq!(counts.pages.load(Ordering::SeqCst), 3);
    assert_eq!(*counts.last_ok.lock().unwrap(), Some(true));
}

#[test]
fn test_clamped_tiny_barcode_becomes_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
    let id = canvas.place(
        Element::barcode(ValueSource::fixed("SKU-1"), Geometry::new(0.0, 0.0, 150.0, 60.0))
            .unwrap(),
    );
    canvas.move_by(id, 10_000.0, 10_000.0);
    canvas.resize(id, 0.0, 0.0, ResizeHandle::BottomRight);
    let g = *canvas.get(id).unwrap().geometry();
    assert!(g.width >= 1.0 && g.height >= 1.0);
    assert!(g.right() <= canvas.width() && g.bottom() <= canvas.height());

    // a 1x1 px barcode box cannot hold the symbol: placeholder, not failure
    let report = exporter()
        .export_to(&canvas, &ImportedTable::new(), &path)
        .unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(report.placeholders.len(), 1);
}

#[test]
fn test_millimeter_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let mut canvas = Canvas::preset(LabelSize::FourBySix);
    canvas.place(
        Element::text(ValueSource::fixed("mm"), Geometry::new(0.0, 0.0, 100.0, 40.0)).unwrap(),
    );
    let config = ExportConfig {
        unit: PhysicalUnit::Millimeter,
        ..Default::default()
    };
    let report = Exporter::new(config)
        .unwrap()
        .export_to(&canvas, &ImportedTable::new(), &path)
        .unwrap();

    assert!((report.page_size.width - 101.6).abs() < 1e-3);
    let (_, media_box) = inspect(&path);
    assert!((media_box[2] - 288.0).abs() < 1e-2);
    assert!((media_box[3] - 432.0).abs() < 1e-2);
}

#[test]
fn test_layout_and_table_json_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.pdf");

    let canvas = Canvas::from_json(
        r#"{
            "size": "three_by_two",
            "elements": [
                {"kind": "qrcode", "source": {"bound": "Sku"},
                 "geometry": {"x": 8, "y": 8, "width": 90, "height": 90}},
                {"kind": "text", "source": {"static": "Asset"},
                 "geometry": {"x": 110, "y": 20, "width": 160, "height": 40}}
            ]
        }"#,
    )
    .unwrap();
    let table = ImportedTable::from_json(
        r#"{"headers": ["Sku", "Qty"], "rows": [["A-1", 3], ["B-2", 1], ["C-3", null]]}"#,
    )
    .unwrap();

    let report = exporter().export_to(&canvas, &table, &path).unwrap();
    assert_eq!(report.pages, 3);
    assert_eq!(inspect(&path).0, 3);
}
