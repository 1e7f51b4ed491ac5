//! # Page Composer
//!
//! Turns (element set, resolution, page index) into a [`Page`]: one draw
//! instruction per element, in render order, with the element's geometry
//! copied unchanged.
//!
//! | Element | Instruction |
//! |---------|-------------|
//! | barcode | Code 128 of the page value, sized to the box |
//! | qrcode | QR of the page value, side `min(width, height)` centered |
//! | text | page value centered in the box, font size from box height |
//! | image | the element's source reference |
//!
//! Composition is pure: the same inputs always produce the same page.

use crate::binding::Resolution;
use crate::element::{Content, Element, ElementId, Geometry};

/// Smallest font size a text box renders at, in layout pixels.
pub const MIN_FONT_SIZE: f32 = 6.0;

/// Font size for a text box of height `height`: half the box, never below
/// [`MIN_FONT_SIZE`].
pub fn text_font_size(height: f32) -> f32 {
    (height * 0.5).max(MIN_FONT_SIZE)
}

/// Linear symbology for barcode elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Symbology {
    #[default]
    Code128,
}

/// What to draw for one element on one page.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Barcode {
        value: String,
        width: f32,
        height: f32,
        symbology: Symbology,
    },
    QrCode {
        value: String,
        size: f32,
    },
    Text {
        value: String,
        font_size: f32,
    },
    Image {
        source_ref: String,
    },
}

impl Instruction {
    /// The value being encoded or drawn, if the instruction carries one.
    pub fn value(&self) -> Option<&str> {
        match self {
            Instruction::Barcode { value, .. }
            | Instruction::QrCode { value, .. }
            | Instruction::Text { value, .. } => Some(value),
            Instruction::Image { .. } => None,
        }
    }
}

/// An instruction positioned on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedInstruction {
    pub element: ElementId,
    pub geometry: Geometry,
    pub instruction: Instruction,
}

/// One composed page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub index: usize,
    pub items: Vec<PlacedInstruction>,
}

/// Composes pages from an element snapshot and its resolution.
pub struct PageComposer<'a> {
    elements: &'a [Element],
    resolution: &'a Resolution,
}

impl<'a> PageComposer<'a> {
    pub fn new(elements: &'a [Element], resolution: &'a Resolution) -> Self {
        Self {
            elements,
            resolution,
        }
    }

    pub fn page_count(&self) -> usize {
        self.resolution.page_count()
    }

    /// Compose page `index`. Indices past the page count yield blank values
    /// for bound elements.
    pub fn compose(&self, index: usize) -> Page {
        let items = self
            .elements
            .iter()
            .map(|element| PlacedInstruction {
                element: element.id(),
                geometry: *element.geometry(),
                instruction: self.instruction_for(element, index),
            })
            .collect();

        Page { index, items }
    }

    fn instruction_for(&self, element: &Element, page: usize) -> Instruction {
        let g = element.geometry();
        let value = || self.resolution.value(element.id(), page).to_string();

        match element.content() {
            Content::Barcode { .. } => Instruction::Barcode {
                value: value(),
                width: g.width,
                height: g.height,
                symbology: Symbology::Code128,
            },
            Content::QrCode { .. } => Instruction::QrCode {
                value: value(),
                size: g.width.min(g.height),
            },
            Content::Text { .. } => Instruction::Text {
                value: value(),
                font_size: text_font_size(g.height),
            },
            Content::Image { source_ref } => Instruction::Image {
                source_ref: source_ref.clone(),
            },
        }
    }
}
