pub mod converter;
pub mod docx;
pub mod placeholder;
pub mod render;

use thiserror::Error;

use crate::conversion::render::RenderError;

/// Reasons structured conversion gave up. Never leaves the conversion stage:
/// `DocumentConverter` turns every variant into a placeholder document.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("DOCX conversion failed: {0}")]
    Docx(String),

    #[error("No readable text found in DOC file")]
    Unreadable,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Conversion I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Placeholder PDF could not be written: {0}")]
    Pdf(#[from] lopdf::Error),
}
