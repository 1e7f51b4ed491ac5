//! # Layout Engine
//!
//! Owns the live canvas: its size and the placed elements in render order.
//! Every operation is total. Out-of-range input is clamped, unknown ids are
//! ignored, and geometry is recomputed from the current state on each call, so
//! replaying the same pointer event never compounds.
//!
//! ## Clamping
//!
//! ```text
//! (0,0) ┌──────────────── canvas ────────────────┐
//!       │                                        │
//!       │      ┌──────┐        move_by(+500, 0)  │
//!       │      │  el  │  ───────────────▶ ┌──────┤ x = width - el.width
//!       │      └──────┘                   │  el  │
//!       │                                 └──────┤
//!       └────────────────────────────────────────┘
//! ```
//!
//! - Position: the box is kept inside `[0, width] × [0, height]`. A box larger
//!   than the canvas (possible after shrinking the canvas) is pinned at 0.
//! - Size: never below 1×1, never beyond the canvas edge on the dragged side.
//!
//! ## Bound objects
//!
//! Elements can be spawned from a bound object (a static value or an imported
//! column) with one element per selected encoding. Removing the object removes
//! the elements it owns.

mod size;

pub use size::{CanvasSize, LabelSize};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::element::{Content, Element, ElementId, ElementKind, Geometry, ObjectId, ValueSource};
use crate::error::LabelError;
use crate::table::ImportedTable;

/// Smallest width/height an element can be resized to.
pub const MIN_ELEMENT_SIZE: f32 = 1.0;

/// The edge or corner being dragged during a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeHandle {
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    /// Dragging the left edge keeps the right edge fixed.
    fn from_left(self) -> bool {
        matches!(
            self,
            ResizeHandle::Left | ResizeHandle::TopLeft | ResizeHandle::BottomLeft
        )
    }

    /// Dragging the top edge keeps the bottom edge fixed.
    fn from_top(self) -> bool {
        matches!(
            self,
            ResizeHandle::Top | ResizeHandle::TopLeft | ResizeHandle::TopRight
        )
    }
}

/// Which encodings a bound object is rendered as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encodings {
    #[serde(default)]
    pub qr: bool,
    #[serde(default)]
    pub barcode: bool,
    #[serde(default)]
    pub text: bool,
}

impl Encodings {
    pub const QR: Encodings = Encodings {
        qr: true,
        barcode: false,
        text: false,
    };
    pub const BARCODE: Encodings = Encodings {
        qr: false,
        barcode: true,
        text: false,
    };
    pub const TEXT: Encodings = Encodings {
        qr: false,
        barcode: false,
        text: true,
    };

    /// Selected kinds in spawn order (QR, barcode, text).
    pub fn kinds(self) -> impl Iterator<Item = ElementKind> {
        [
            (self.qr, ElementKind::QrCode),
            (self.barcode, ElementKind::Barcode),
            (self.text, ElementKind::Text),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
    }

    fn set(&mut self, kind: ElementKind, enabled: bool) {
        match kind {
            ElementKind::QrCode => self.qr = enabled,
            ElementKind::Barcode => self.barcode = enabled,
            ElementKind::Text => self.text = enabled,
            ElementKind::Image => {}
        }
    }
}

/// Object-list entry that spawns elements.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundObject {
    id: ObjectId,
    source: ValueSource,
    encodings: Encodings,
}

impl BoundObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn source(&self) -> &ValueSource {
        &self.source
    }

    pub fn encodings(&self) -> Encodings {
        self.encodings
    }
}

/// Initial box for a newly spawned element of `kind`.
pub fn default_geometry(kind: ElementKind) -> Geometry {
    match kind {
        ElementKind::QrCode => Geometry::new(50.0, 50.0, 100.0, 100.0),
        ElementKind::Barcode => Geometry::new(100.0, 100.0, 150.0, 60.0),
        ElementKind::Text => Geometry::new(150.0, 150.0, 200.0, 50.0),
        ElementKind::Image => Geometry::new(50.0, 50.0, 150.0, 150.0),
    }
}

/// Clamp one axis of a box's origin into `[0, extent - len]`, pinning at 0
/// when the box does not fit.
fn clamp_origin(pos: f32, len: f32, extent: f32) -> f32 {
    if !(pos.is_finite() && extent.is_finite()) || len >= extent {
        0.0
    } else {
        pos.clamp(0.0, extent - len)
    }
}

/// Shrink a length to `[MIN_ELEMENT_SIZE, extent]`.
fn clamp_len(len: f32, extent: f32) -> f32 {
    if len.is_finite() {
        len.clamp(MIN_ELEMENT_SIZE, extent.max(MIN_ELEMENT_SIZE))
    } else {
        MIN_ELEMENT_SIZE
    }
}

/// Resize one axis. `from_start` means the start edge is dragged and the end
/// edge stays where it is (as far as the canvas allows).
fn resize_axis(pos: f32, len: f32, new_len: f32, from_start: bool, extent: f32) -> (f32, f32) {
    let new_len = if new_len.is_finite() { new_len } else { len };
    if from_start {
        let end = (pos + len).clamp(MIN_ELEMENT_SIZE, extent.max(MIN_ELEMENT_SIZE));
        let new_len = new_len.clamp(MIN_ELEMENT_SIZE, end);
        (end - new_len, new_len)
    } else {
        let pos = pos.clamp(0.0, (extent - MIN_ELEMENT_SIZE).max(0.0));
        let new_len = new_len.clamp(MIN_ELEMENT_SIZE, (extent - pos).max(MIN_ELEMENT_SIZE));
        (pos, new_len)
    }
}

/// The live label canvas.
#[derive(Debug, Clone)]
pub struct Canvas {
    label: LabelSize,
    size: CanvasSize,
    elements: Vec<Element>,
    objects: Vec<BoundObject>,
}

impl Canvas {
    /// Create an empty canvas, rejecting sizes smaller than 1×1 px.
    pub fn new(label: LabelSize) -> Result<Self, LabelError> {
        let size = label.pixels();
        size.validate()?;
        Ok(Self {
            label,
            size,
            elements: Vec::new(),
            objects: Vec::new(),
        })
    }

    /// Create a canvas from a preset. A `Custom` size that fails validation
    /// falls back to the default 3 × 2 in label; use [`Canvas::new`] to get
    /// the error instead.
    pub fn preset(label: LabelSize) -> Self {
        Self::new(label).unwrap_or_else(|e| {
            warn!("{}; using {}", e, LabelSize::default());
            let label = LabelSize::default();
            Self {
                label,
                size: label.pixels(),
                elements: Vec::new(),
                objects: Vec::new(),
            }
        })
    }

    pub fn label(&self) -> LabelSize {
        self.label
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    /// Live elements in render (insertion) order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    pub fn objects(&self) -> &[BoundObject] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Change the canvas size. Existing elements keep their geometry until
    /// they are next moved or resized.
    pub fn set_size(&mut self, label: LabelSize) -> Result<(), LabelError> {
        let size = label.pixels();
        size.validate()?;
        self.label = label;
        self.size = size;
        Ok(())
    }

    /// Fit a box inside the canvas: size clamped to `[1, canvas]`, origin
    /// clamped so the box stays inside.
    pub fn fit(&self, geometry: Geometry) -> Geometry {
        let width = clamp_len(geometry.width, self.size.width);
        let height = clamp_len(geometry.height, self.size.height);
        let x = if geometry.x.is_finite() { geometry.x } else { 0.0 };
        let y = if geometry.y.is_finite() { geometry.y } else { 0.0 };
        Geometry {
            x: clamp_origin(x, width, self.size.width),
            y: clamp_origin(y, height, self.size.height),
            width,
            height,
        }
    }

    /// Insert an element, clamping its geometry to the canvas. An element
    /// whose id is already present replaces the existing one in place.
    pub fn place(&mut self, mut element: Element) -> ElementId {
        let fitted = self.fit(*element.geometry());
        *element.geometry_mut() = fitted;
        let id = element.id();
        match self.get_mut(id) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
        id
    }

    /// Translate an element by `(dx, dy)`, clamped to the canvas.
    pub fn move_by(&mut self, id: ElementId, dx: f32, dy: f32) {
        let size = self.size;
        let Some(element) = self.get_mut(id) else {
            return;
        };
        let g = element.geometry_mut();
        let dx = if dx.is_finite() { dx } else { 0.0 };
        let dy = if dy.is_finite() { dy } else { 0.0 };
        g.x = clamp_origin(g.x + dx, g.width, size.width);
        g.y = clamp_origin(g.y + dy, g.height, size.height);
    }

    /// Move an element's origin to `(x, y)`, clamped to the canvas.
    pub fn move_to(&mut self, id: ElementId, x: f32, y: f32) {
        let Some(current) = self.get(id).map(|e| *e.geometry()) else {
            return;
        };
        self.move_by(id, x - current.x, y - current.y);
    }

    /// Resize an element by dragging `handle`. Left/top handles keep the
    /// opposite edge fixed. Sizes are floored at 1×1 and capped at the canvas.
    pub fn resize(&mut self, id: ElementId, width: f32, height: f32, handle: ResizeHandle) {
        let size = self.size;
        let Some(element) = self.get_mut(id) else {
            return;
        };
        let g = element.geometry_mut();
        let (x, w) = resize_axis(g.x, g.width, width, handle.from_left(), size.width);
        let (y, h) = resize_axis(g.y, g.height, height, handle.from_top(), size.height);
        g.x = clamp_origin(x, w, size.width);
        g.y = clamp_origin(y, h, size.height);
        g.width = w;
        g.height = h;
    }

    /// Replace an element's geometry wholesale, clamped like [`Canvas::place`].
    pub fn set_geometry(&mut self, id: ElementId, geometry: Geometry) {
        let fitted = self.fit(geometry);
        if let Some(element) = self.get_mut(id) {
            *element.geometry_mut() = fitted;
        }
    }

    /// Remove an element. No-op if absent.
    pub fn remove(&mut self, id: ElementId) {
        self.elements.retain(|e| e.id() != id);
    }

    /// Edit the content of a static element. Returns `false` if the element
    /// is missing, bound, or an image.
    pub fn set_static_content(&mut self, id: ElementId, content: impl Into<String>) -> bool {
        self.get_mut(id)
            .map(|e| e.set_static_content(content))
            .unwrap_or(false)
    }

    /// Switch an element's value source. Returns `false` for missing ids and images.
    pub fn set_value_source(&mut self, id: ElementId, source: ValueSource) -> bool {
        self.get_mut(id)
            .map(|e| e.set_value_source(source))
            .unwrap_or(false)
    }

    /// Bind an element to an imported column.
    pub fn bind(&mut self, id: ElementId, column: &str) -> bool {
        self.set_value_source(id, ValueSource::column(column))
    }

    /// Place an image at the default image box.
    pub fn place_image(&mut self, source_ref: impl Into<String>) -> Result<ElementId, LabelError> {
        let element = Element::image(source_ref, default_geometry(ElementKind::Image))?;
        Ok(self.place(element))
    }

    // ========================================================================
    // BOUND OBJECTS
    // ========================================================================

    /// Add a bound object and spawn one element per selected encoding.
    pub fn add_object(&mut self, source: ValueSource, encodings: Encodings) -> ObjectId {
        let object = BoundObject {
            id: ObjectId::new(),
            source,
            encodings,
        };
        let id = object.id;
        for kind in encodings.kinds() {
            self.spawn(&object, kind);
        }
        self.objects.push(object);
        id
    }

    /// Add a bound object for an imported column.
    pub fn import_column(&mut self, column: &str, encodings: Encodings) -> ObjectId {
        self.add_object(ValueSource::column(column), encodings)
    }

    /// Add one bound object per table column, all with the same encodings.
    pub fn import_table(&mut self, table: &ImportedTable, encodings: Encodings) -> Vec<ObjectId> {
        table
            .column_names()
            .map(|name| self.import_column(name, encodings))
            .collect()
    }

    /// Toggle one encoding of a bound object, spawning or removing its element.
    pub fn set_encoding(&mut self, object_id: ObjectId, kind: ElementKind, enabled: bool) {
        let Some(index) = self.objects.iter().position(|o| o.id == object_id) else {
            return;
        };
        let existing = self
            .elements
            .iter()
            .find(|e| e.owner() == Some(object_id) && e.kind() == kind)
            .map(Element::id);

        match (enabled, existing) {
            (true, None) => {
                let object = self.objects[index].clone();
                self.spawn(&object, kind);
            }
            (false, Some(id)) => self.remove(id),
            _ => {}
        }
        self.objects[index].encodings.set(kind, enabled);
    }

    /// Remove a bound object and every element it owns.
    pub fn remove_object(&mut self, object_id: ObjectId) {
        self.objects.retain(|o| o.id != object_id);
        self.elements.retain(|e| e.owner() != Some(object_id));
    }

    fn spawn(&mut self, object: &BoundObject, kind: ElementKind) {
        let Some(content) = Content::for_kind(kind, object.source.clone()) else {
            return;
        };
        if let Ok(element) = Element::new(content, default_geometry(kind)) {
            self.place(element.with_owner(object.id));
        }
    }

    // ========================================================================
    // SNAPSHOT & FILES
    // ========================================================================

    /// Read-only copy of the current state, for exports that must not observe
    /// later edits.
    pub fn snapshot(&self) -> Canvas {
        self.clone()
    }

    /// Build a canvas from a layout file, validating and clamping every element.
    pub fn from_layout(layout: LayoutFile) -> Result<Self, LabelError> {
        let mut canvas = Canvas::new(layout.size)?;
        for element in layout.elements {
            element.validate()?;
            if canvas.get(element.id()).is_some() {
                return Err(LabelError::Config(format!(
                    "Invalid layout file: duplicate element id {}",
                    element.id()
                )));
            }
            canvas.place(element);
        }
        Ok(canvas)
    }

    /// Parse a JSON layout file.
    pub fn from_json(json: &str) -> Result<Self, LabelError> {
        let layout: LayoutFile = serde_json::from_str(json)
            .map_err(|e| LabelError::Config(format!("Invalid layout file: {}", e)))?;
        Self::from_layout(layout)
    }

    pub fn to_layout(&self) -> LayoutFile {
        LayoutFile {
            size: self.label,
            elements: self.elements.clone(),
        }
    }
}

/// On-disk layout format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutFile {
    #[serde(default)]
    pub size: LabelSize,
    #[serde(default)]
    pub elements: Vec<Element>,
}
