//! Text Extractor: PDF bytes in, `ExtractedText` out.
//!
//! Backends, first success wins:
//!   1. lopdf content streams, page by page, joined with blank lines
//!   2. pdf-extract over the whole buffer
//!   3. byte-level pattern fallback (`extraction::fallback`)
//!
//! Only a backend *error* moves on to the next one. A PDF that parses but has
//! almost no text (a scan) comes back short and the caller escalates to OCR.

use std::panic;

use lopdf::Document;
use tracing::{debug, warn};

use crate::extraction::{fallback, ExtractionError};
use crate::models::resume::{ExtractedText, Provenance};

/// Below this many characters the text is considered missing and OCR is
/// attempted.
pub const MIN_TEXT_LENGTH: usize = 100;

const PAGE_BREAK: &str = "\n\n";

pub fn is_too_short(text: &ExtractedText) -> bool {
    text.length < MIN_TEXT_LENGTH
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Blocking; run it on a blocking thread from async code.
    pub fn extract(&self, pdf: &[u8]) -> ExtractedText {
        match extract_pages(pdf) {
            Ok(text) => return ExtractedText::new(text, Provenance::Direct),
            Err(e) => debug!("lopdf extraction failed: {}", e),
        }

        match extract_whole(pdf) {
            Ok(text) => return ExtractedText::new(text, Provenance::Direct),
            Err(e) => warn!("pdf-extract failed, scanning raw bytes: {}", e),
        }

        let text = fallback::scan(pdf);
        debug!("Byte fallback recovered {} chars", text.chars().count());
        ExtractedText::new(text, Provenance::Fallback)
    }
}

fn extract_pages(pdf: &[u8]) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(pdf).map_err(|e| ExtractionError::Parse(e.to_string()))?;
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ExtractionError::Parse("document has no pages".to_string()));
    }

    let mut texts = Vec::with_capacity(pages.len());
    for page_num in pages.keys() {
        let text = doc
            .extract_text(&[*page_num])
            .map_err(|e| ExtractionError::Parse(format!("page {page_num}: {e}")))?;
        let text = text.trim();
        if !text.is_empty() {
            texts.push(text.to_string());
        }
    }
    debug!("lopdf read {} pages, {} with text", pages.len(), texts.len());
    Ok(texts.join(PAGE_BREAK))
}

fn extract_whole(pdf: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs.
    let result = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(pdf))
        .map_err(|_| ExtractionError::Panicked)?;
    result
        .map(|text| text.trim().to_string())
        .map_err(|e| ExtractionError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::placeholder::text_pdf;

    #[test]
    fn test_reads_pages_in_order() {
        let body = (0..60).map(|i| format!("row {i}")).collect::<Vec<_>>().join("\n");
        let pdf = text_pdf(&body).unwrap();
        let text = TextExtractor::new().extract(&pdf);

        assert_eq!(text.provenance, Provenance::Direct);
        let first = text.content.find("row 0").unwrap();
        let last = text.content.find("row 59").unwrap();
        assert!(first < last);
        assert!(text.content.contains(PAGE_BREAK));
        assert!(!is_too_short(&text));
    }

    #[test]
    fn test_empty_pdf_is_too_short() {
        let pdf = text_pdf("").unwrap();
        let text = TextExtractor::new().extract(&pdf);
        assert_eq!(text.provenance, Provenance::Direct);
        assert!(is_too_short(&text));
    }

    #[test]
    fn test_garbage_uses_byte_fallback() {
        let bytes = b"%PDF-1.4 broken beyond repair (Jane Doe) Tj (Rust Engineer) Tj";
        let text = TextExtractor::new().extract(bytes);
        assert_eq!(text.provenance, Provenance::Fallback);
        assert!(text.content.contains("Jane Doe"));
        assert!(text.content.contains("Rust Engineer"));
    }

    #[test]
    fn test_empty_input_never_panics() {
        let text = TextExtractor::new().extract(&[]);
        assert_eq!(text.provenance, Provenance::Fallback);
        assert_eq!(text.content, "");
        assert_eq!(text.length, 0);
    }
}
