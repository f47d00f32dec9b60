pub mod fallback;
pub mod images;
pub mod ocr;
pub mod text;

use thiserror::Error;

/// Failures of the PDF parsing backends. Caught inside `TextExtractor`, which
/// moves on to the next backend.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF could not be parsed: {0}")]
    Parse(String),

    #[error("PDF backend panicked while extracting text")]
    Panicked,
}
