//! # Element Model
//!
//! A label layout is a flat list of placeable elements. Each element has a
//! stable id, a box in layout pixels, and a kind-specific body:
//!
//! | Kind | Body | Bindable |
//! |------|------|----------|
//! | `barcode` | [`ValueSource`] | yes |
//! | `qrcode` | [`ValueSource`] | yes |
//! | `text` | [`ValueSource`] | yes |
//! | `image` | source reference | no |
//!
//! ## JSON
//!
//! ```json
//! {"kind": "qrcode", "source": {"bound": "Name"},
//!  "geometry": {"x": 10, "y": 10, "width": 100, "height": 100}}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::LabelError;

/// Stable identifier of a placed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a bound object (the object-list entry elements are spawned from).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned box in layout pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Geometry {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (x + width).
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (y + height).
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Reject non-positive or non-finite sizes and non-finite positions.
    pub fn validate(&self) -> Result<(), LabelError> {
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(LabelError::InvalidGeometry(format!(
                "position ({}, {}) is not finite",
                self.x, self.y
            )));
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(LabelError::InvalidGeometry(format!(
                "width must be positive, got {}",
                self.width
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(LabelError::InvalidGeometry(format!(
                "height must be positive, got {}",
                self.height
            )));
        }
        Ok(())
    }
}

/// Name of an imported column an element is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnRef(pub String);

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an element's displayed value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Fixed content, identical on every page.
    Static(String),
    /// One value per page, taken from an imported column.
    Bound(ColumnRef),
}

impl ValueSource {
    pub fn fixed(content: impl Into<String>) -> Self {
        ValueSource::Static(content.into())
    }

    pub fn column(name: impl Into<String>) -> Self {
        ValueSource::Bound(ColumnRef::new(name))
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, ValueSource::Bound(_))
    }
}

/// Element kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Barcode,
    #[serde(rename = "qrcode")]
    QrCode,
    Text,
    Image,
}

impl ElementKind {
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Barcode => "barcode",
            ElementKind::QrCode => "qrcode",
            ElementKind::Text => "text",
            ElementKind::Image => "image",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific body of an element. Only the bindable kinds carry a
/// [`ValueSource`]; images carry a reference resolved by the rasterizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Content {
    Barcode {
        source: ValueSource,
    },
    #[serde(rename = "qrcode")]
    QrCode {
        source: ValueSource,
    },
    Text {
        source: ValueSource,
    },
    Image {
        source_ref: String,
    },
}

impl Content {
    pub fn kind(&self) -> ElementKind {
        match self {
            Content::Barcode { .. } => ElementKind::Barcode,
            Content::QrCode { .. } => ElementKind::QrCode,
            Content::Text { .. } => ElementKind::Text,
            Content::Image { .. } => ElementKind::Image,
        }
    }

    /// Body for a bindable kind. Returns `None` for [`ElementKind::Image`].
    pub fn for_kind(kind: ElementKind, source: ValueSource) -> Option<Self> {
        match kind {
            ElementKind::Barcode => Some(Content::Barcode { source }),
            ElementKind::QrCode => Some(Content::QrCode { source }),
            ElementKind::Text => Some(Content::Text { source }),
            ElementKind::Image => None,
        }
    }

    pub fn value_source(&self) -> Option<&ValueSource> {
        match self {
            Content::Barcode { source } | Content::QrCode { source } | Content::Text { source } => {
                Some(source)
            }
            Content::Image { .. } => None,
        }
    }

    fn value_source_mut(&mut self) -> Option<&mut ValueSource> {
        match self {
            Content::Barcode { source } | Content::QrCode { source } | Content::Text { source } => {
                Some(source)
            }
            Content::Image { .. } => None,
        }
    }
}

/// A placeable unit on the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    id: ElementId,
    geometry: Geometry,
    #[serde(flatten)]
    content: Content,
    /// Bound object that spawned this element, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<ObjectId>,
}

impl Element {
    /// Create an element, rejecting non-positive sizes.
    pub fn new(content: Content, geometry: Geometry) -> Result<Self, LabelError> {
        geometry.validate()?;
        Ok(Self {
            id: ElementId::new(),
            geometry,
            content,
            owner: None,
        })
    }

    pub fn barcode(source: ValueSource, geometry: Geometry) -> Result<Self, LabelError> {
        Self::new(Content::Barcode { source }, geometry)
    }

    pub fn qr_code(source: ValueSource, geometry: Geometry) -> Result<Self, LabelError> {
        Self::new(Content::QrCode { source }, geometry)
    }

    pub fn text(source: ValueSource, geometry: Geometry) -> Result<Self, LabelError> {
        Self::new(Content::Text { source }, geometry)
    }

    pub fn image(source_ref: impl Into<String>, geometry: Geometry) -> Result<Self, LabelError> {
        Self::new(
            Content::Image {
                source_ref: source_ref.into(),
            },
            geometry,
        )
    }

    pub(crate) fn with_owner(mut self, owner: ObjectId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.content.kind()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Raw geometry access. Callers outside the layout engine should go
    /// through [`crate::layout::Canvas`] so the canvas bounds are enforced.
    pub(crate) fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    pub fn value_source(&self) -> Option<&ValueSource> {
        self.content.value_source()
    }

    /// Column this element is bound to, if any.
    pub fn column(&self) -> Option<&ColumnRef> {
        match self.value_source() {
            Some(ValueSource::Bound(col)) => Some(col),
            _ => None,
        }
    }

    /// Replace the content of a static element. Returns `false` (and changes
    /// nothing) for bound elements and images.
    pub fn set_static_content(&mut self, content: impl Into<String>) -> bool {
        match self.content.value_source_mut() {
            Some(ValueSource::Static(current)) => {
                *current = content.into();
                true
            }
            _ => false,
        }
    }

    /// Point a bound element at another column. Returns `false` for static
    /// elements and images.
    pub fn set_column(&mut self, column: ColumnRef) -> bool {
        match self.content.value_source_mut() {
            Some(ValueSource::Bound(current)) => {
                *current = column;
                true
            }
            _ => false,
        }
    }

    /// Swap the value source entirely (static ↔ bound). Images are never bound.
    pub fn set_value_source(&mut self, source: ValueSource) -> bool {
        match self.content.value_source_mut() {
            Some(current) => {
                *current = source;
                true
            }
            None => false,
        }
    }

    /// Re-check the size invariant. Deserialized elements skip [`Element::new`].
    pub fn validate(&self) -> Result<(), LabelError> {
        self.geometry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn geom() -> Geometry {
        Geometry::new(10.0, 20.0, 100.0, 50.0)
    }

    #[test]
    fn test_new_element_has_unique_id() {
        let a = Element::text(ValueSource::fixed("A"), geom()).unwrap();
        let b = Element::text(ValueSource::fixed("A"), geom()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), ElementKind::Text);
    }

    #[test]
    fn test_rejects_zero_width() {
        let err = Element::barcode(ValueSource::fixed("X"), Geometry::new(0.0, 0.0, 0.0, 10.0))
            .unwrap_err();
        assert!(matches!(err, LabelError::InvalidGeometry(_)));
    }

    #[test]
    fn test_rejects_negative_height() {
        let err = Element::qr_code(ValueSource::fixed("X"), Geometry::new(0.0, 0.0, 10.0, -1.0))
            .unwrap_err();
        assert!(matches!(err, LabelError::InvalidGeometry(_)));
    }

    #[test]
    fn test_rejects_nan_size() {
        let err = Element::image("logo.png", Geometry::new(0.0, 0.0, f32::NAN, 10.0)).unwrap_err();
        assert!(matches!(err, LabelError::InvalidGeometry(_)));
    }

    #[test]
    fn test_static_content_edit() {
        let mut el = Element::text(ValueSource::fixed("old"), geom()).unwrap();
        assert!(el.set_static_content("new"));
        assert_eq!(el.value_source(), Some(&ValueSource::fixed("new")));
    }

    #[test]
    fn test_static_edit_ignored_for_bound() {
        let mut el = Element::qr_code(ValueSource::column("Name"), geom()).unwrap();
        assert!(!el.set_static_content("nope"));
        assert_eq!(el.column(), Some(&ColumnRef::new("Name")));
        assert!(el.set_column(ColumnRef::new("Sku")));
        assert_eq!(el.column().map(ColumnRef::name), Some("Sku"));
    }

    #[test]
    fn test_image_cannot_be_bound() {
        let mut el = Element::image("logo.png", geom()).unwrap();
        assert!(!el.set_value_source(ValueSource::column("Name")));
        assert!(el.value_source().is_none());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "kind": "qrcode",
            "source": {"bound": "Name"},
            "geometry": {"x": 1, "y": 2, "width": 30, "height": 40}
        }"#;
        let el: Element = serde_json::from_str(json).unwrap();
        assert_eq!(el.kind(), ElementKind::QrCode);
        assert_eq!(el.column().map(ColumnRef::name), Some("Name"));
        assert_eq!(el.geometry().height, 40.0);
        assert!(el.owner().is_none());
    }

    #[test]
    fn test_json_image() {
        let json = r#"{"kind": "image", "source_ref": "logo.png",
            "geometry": {"x": 0, "y": 0, "width": 5, "height": 5}}"#;
        let el: Element = serde_json::from_str(json).unwrap();
        assert_eq!(
            el.content(),
            &Content::Image {
                source_ref: "logo.png".into()
            }
        );
    }
}
