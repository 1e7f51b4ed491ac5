//! # Error Types
//!
//! This module defines error types used throughout the labelpress library.
//!
//! Interactive layout operations never return errors (they clamp or no-op).
//! Binding problems are diagnostics, see [`crate::binding::BindingIssue`].
//! Everything else that can fail surfaces as a [`LabelError`].

use thiserror::Error;

use crate::element::ElementId;

/// Main error type for labelpress operations
#[derive(Debug, Error)]
pub enum LabelError {
    /// Element constructed with a non-positive or non-finite size
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A symbol encoder or image decoder rejected an element's value
    #[error("Encoding failed for element {element}: {reason}")]
    Encoding { element: ElementId, reason: String },

    /// Page rasterization failed; aborts the export
    #[error("Rasterize error on page {page}: {reason}")]
    Rasterize { page: usize, reason: String },

    /// The document writer failed; aborts the export
    #[error("Document write error: {0}")]
    DocumentWrite(String),

    /// Export aborted through its cancel token
    #[error("Export cancelled before page {0}")]
    Cancelled(usize),

    /// Image loading or processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Invalid configuration, layout or table input
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LabelError {
    /// Whether this error belongs to the export-failure class (abort, no artifact).
    pub fn is_export_failure(&self) -> bool {
        matches!(
            self,
            LabelError::Rasterize { .. } | LabelError::DocumentWrite(_) | LabelError::Io(_)
        )
    }
}
