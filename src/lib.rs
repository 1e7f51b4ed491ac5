//! # labelpress - Data-Driven Label Layouts
//!
//! labelpress composes a label from placeable elements (barcode, QR code,
//! text, image), binds elements to columns of an imported spreadsheet, and
//! renders the layout once per data row into a single multi-page PDF.
//!
//! - **Layout**: place, move and resize elements on a fixed-size canvas with
//!   boundary clamping
//! - **Binding**: static elements repeat on every page, bound elements take
//!   one column value per page
//! - **Rendering**: Code 128 and QR encoding, bitmap or TrueType text, images,
//!   composited per page at 2× oversampling
//! - **Output**: one PDF page per row, sized to the physical label
//!
//! ## Quick Start
//!
//! ```no_run
//! use labelpress::{
//!     config::ExportConfig,
//!     element::{Element, Geometry, ValueSource},
//!     export::Exporter,
//!     layout::{Canvas, LabelSize},
//!     table::ImportedTable,
//! };
//!
//! // 3 x 2 in label: 288 x 192 layout pixels
//! let mut canvas = Canvas::preset(LabelSize::ThreeByTwo);
//! canvas.place(Element::qr_code(
//!     ValueSource::column("Sku"),
//!     Geometry::new(10.0, 10.0, 120.0, 120.0),
//! )?);
//! canvas.place(Element::text(
//!     ValueSource::fixed("Warehouse A"),
//!     Geometry::new(140.0, 60.0, 140.0, 40.0),
//! )?);
//!
//! let table = ImportedTable::from_rows(
//!     vec!["Sku".into()],
//!     vec![vec!["A-1".into()], vec!["B-2".into()], vec!["C-3".into()]],
//! );
//!
//! // Three pages, written atomically to labels.pdf
//! let mut exporter = Exporter::new(ExportConfig::default())?;
//! let report = exporter.export(&canvas, &table)?;
//! assert_eq!(report.pages, 3);
//!
//! # Ok::<(), labelpress::LabelError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`element`] | Element model: kinds, geometry, value sources |
//! | [`table`] | Imported column data |
//! | [`binding`] | Per-element value sequences and page count |
//! | [`layout`] | Live canvas: placement, clamping, bound objects |
//! | [`compose`] | Page descriptions (render instructions) |
//! | [`encode`] | Code 128 and QR symbol encoders |
//! | [`render`] | Page rasterizer, text and images |
//! | [`pdf`] | Multi-page PDF writer |
//! | [`export`] | Batch export driver |
//! | [`config`] | Export settings |
//! | [`units`] | Pixel and physical unit conversion |
//! | [`error`] | Error types |

pub mod binding;
pub mod compose;
pub mod config;
pub mod element;
pub mod encode;
pub mod error;
pub mod export;
pub mod layout;
pub mod pdf;
pub mod render;
pub mod table;
pub mod units;

// Re-exports for convenience
pub use config::ExportConfig;
pub use element::{Element, ElementId, ElementKind, Geometry, ValueSource};
pub use error::LabelError;
pub use export::{CancelToken, ExportReport, Exporter};
pub use layout::{Canvas, LabelSize};
pub use table::ImportedTable;
