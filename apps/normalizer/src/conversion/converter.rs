//! Document Converter: turns DOC/DOCX uploads into PDF bytes so the text
//! extractor only ever sees one format.
//!
//! Order of attempts:
//!   1. PDF input is passed through untouched.
//!   2. DOCX: paragraphs → HTML → rendering capability.
//!   3. DOC: printable-text scan → HTML with a conversion note → renderer.
//!   4. Anything that failed: placeholder notice with recovered text, rendered
//!      if possible, otherwise written directly as a plain PDF. The original
//!      bytes are kept in the scratch area next to it.
//!
//! `convert` never returns an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::conversion::docx::{escape_html, DocxBody};
use crate::conversion::placeholder::{
    html_document, placeholder_html, printable_runs, text_pdf, unconverted_notice,
};
use crate::conversion::render::{HtmlRenderer, RenderError};
use crate::conversion::ConversionError;
use crate::models::resume::{DocumentExtension, RawDocument};

/// DOC files whose text scan recovers fewer characters go straight to the
/// placeholder.
const MIN_DOC_PROBE_CHARS: usize = 100;

const DOC_NOTE: &str =
    "This document was converted from a DOC file. Some formatting may be lost.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMethod {
    Passthrough,
    Rendered,
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub pdf: Vec<u8>,
    pub method: ConversionMethod,
    /// Where the original bytes were kept when the placeholder path ran.
    pub preserved_original: Option<PathBuf>,
    /// Why structured conversion failed, if it did.
    pub failure: Option<String>,
}

pub struct DocumentConverter {
    renderer: Option<Arc<dyn HtmlRenderer>>,
    scratch_dir: Option<PathBuf>,
}

impl DocumentConverter {
    pub fn new(renderer: Option<Arc<dyn HtmlRenderer>>, scratch_dir: Option<PathBuf>) -> Self {
        Self {
            renderer,
            scratch_dir,
        }
    }

    pub async fn convert(&self, doc: &RawDocument) -> ConvertedDocument {
        if !doc.extension.needs_conversion() {
            return ConvertedDocument {
                pdf: doc.bytes.to_vec(),
                method: ConversionMethod::Passthrough,
                preserved_original: None,
                failure: None,
            };
        }

        let attempt = match doc.extension {
            DocumentExtension::Docx => self.convert_docx(&doc.bytes).await,
            _ => self.convert_doc(&doc.bytes).await,
        };

        match attempt {
            Ok(pdf) => {
                info!(
                    "Converted {} ({}) to {} bytes of PDF",
                    doc.original_name,
                    doc.extension.as_str(),
                    pdf.len()
                );
                ConvertedDocument {
                    pdf,
                    method: ConversionMethod::Rendered,
                    preserved_original: None,
                    failure: None,
                }
            }
            Err(e) => {
                warn!(
                    "Conversion of {} failed, using placeholder: {}",
                    doc.original_name, e
                );
                self.placeholder(doc, e.to_string()).await
            }
        }
    }

    async fn convert_docx(&self, bytes: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let body = DocxBody::parse(bytes)?;
        if body.is_empty() {
            return Err(ConversionError::Docx("document has no text".to_string()));
        }
        debug!("DOCX body has {} paragraphs", body.paragraphs.len());
        Ok(self.render(&html_document(&body.to_html(), None)).await?)
    }

    async fn convert_doc(&self, bytes: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let text = printable_runs(bytes);
        if text.chars().count() <= MIN_DOC_PROBE_CHARS {
            return Err(ConversionError::Unreadable);
        }
        let body = format!("<pre>{}</pre>", escape_html(&text));
        Ok(self.render(&html_document(&body, Some(DOC_NOTE))).await?)
    }

    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        match &self.renderer {
            Some(renderer) => renderer.render(html).await,
            None => Err(RenderError::Unavailable),
        }
    }

    async fn placeholder(&self, doc: &RawDocument, failure: String) -> ConvertedDocument {
        let recovered = printable_runs(&doc.bytes);
        let preserved_original = self.preserve_original(doc).await;

        let rendered = match self.render(&placeholder_html(&doc.original_name, &recovered)).await {
            Ok(pdf) => Some(pdf),
            Err(RenderError::Unavailable) => None,
            Err(e) => {
                warn!("Placeholder render failed for {}: {}", doc.original_name, e);
                None
            }
        };

        let pdf = match rendered {
            Some(pdf) => pdf,
            None => {
                let text = format!("{}\n\n{}", unconverted_notice(&doc.original_name), recovered);
                text_pdf(&text).unwrap_or_else(|e| {
                    warn!("Could not write placeholder PDF for {}: {}", doc.original_name, e);
                    Vec::new()
                })
            }
        };

        ConvertedDocument {
            pdf,
            method: ConversionMethod::Placeholder,
            preserved_original,
            failure: Some(failure),
        }
    }

    /// Copies the upload to `<scratch>/<id>/<stem>.original.<ext>`.
    async fn preserve_original(&self, doc: &RawDocument) -> Option<PathBuf> {
        let scratch = self.scratch_dir.as_ref()?;
        let dir = scratch.join(&doc.id);
        let path = dir.join(original_file_name(&doc.original_name, doc.extension));

        let result = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, &doc.bytes).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!("Preserved original bytes at {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not preserve original {}: {}", doc.original_name, e);
                None
            }
        }
    }
}

fn original_file_name(original_name: &str, extension: DocumentExtension) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{stem}.original.{}", extension.as_str())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;

    use super::*;

    /// Records every HTML page and answers with a fixed PDF.
    struct StubRenderer {
        pages: Mutex<Vec<String>>,
    }

    impl StubRenderer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HtmlRenderer for StubRenderer {
        async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
            self.pages.lock().unwrap().push(html.to_string());
            Ok(b"%PDF-stub".to_vec())
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl HtmlRenderer for BrokenRenderer {
        async fn render(&self, _html: &str) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::EmptyOutput)
        }
    }

    fn raw(name: &str, extension: DocumentExtension, bytes: Vec<u8>) -> RawDocument {
        RawDocument {
            id: "doc-1".to_string(),
            original_name: name.to_string(),
            bytes: Bytes::from(bytes),
            extension,
            uploaded_at: Utc::now(),
        }
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            writer
                .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn test_pdf_is_passed_through() {
        let converter = DocumentConverter::new(None, None);
        let out = converter
            .convert(&raw("cv.pdf", DocumentExtension::Pdf, b"%PDF-1.4 body".to_vec()))
            .await;
        assert_eq!(out.method, ConversionMethod::Passthrough);
        assert_eq!(out.pdf, b"%PDF-1.4 body");
        assert!(out.failure.is_none());
    }

    #[tokio::test]
    async fn test_docx_is_rendered_from_html() {
        let renderer = StubRenderer::new();
        let converter = DocumentConverter::new(Some(renderer.clone()), None);
        let xml = r#"<w:document><w:body><w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Jane Doe</w:t></w:r></w:p></w:body></w:document>"#;
        let out = converter
            .convert(&raw("cv.docx", DocumentExtension::Docx, docx_bytes(xml)))
            .await;

        assert_eq!(out.method, ConversionMethod::Rendered);
        assert_eq!(out.pdf, b"%PDF-stub");
        let pages = renderer.pages.lock().unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("<h1>Jane Doe</h1>"));
        assert!(pages[0].contains("font-family: Arial"));
    }

    #[tokio::test]
    async fn test_doc_text_scan_renders_with_note() {
        let renderer = StubRenderer::new();
        let converter = DocumentConverter::new(Some(renderer.clone()), None);
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0x00];
        for _ in 0..10 {
            bytes.extend_from_slice(b"Senior Rust Engineer at Example Corp\x00\x01");
        }
        let out = converter
            .convert(&raw("cv.doc", DocumentExtension::Doc, bytes))
            .await;

        assert_eq!(out.method, ConversionMethod::Rendered);
        let pages = renderer.pages.lock().unwrap();
        assert!(pages[0].contains("converted from a DOC file"));
        assert!(pages[0].contains("Senior Rust Engineer at Example Corp"));
    }

    #[tokio::test]
    async fn test_unreadable_docx_without_renderer_gets_plain_placeholder_pdf() {
        let scratch = tempfile::tempdir().unwrap();
        let converter = DocumentConverter::new(None, Some(scratch.path().to_path_buf()));
        let doc = raw("Jane_Doe.docx", DocumentExtension::Docx, b"not a zip at all".to_vec());
        let out = converter.convert(&doc).await;

        assert_eq!(out.method, ConversionMethod::Placeholder);
        assert!(out.failure.as_deref().unwrap().contains("DOCX"));
        let loaded = lopdf::Document::load_mem(&out.pdf).unwrap();
        let text = loaded.extract_text(&[1]).unwrap();
        assert!(text.contains("could not be converted"));

        let preserved = out.preserved_original.unwrap();
        assert!(preserved.ends_with("doc-1/Jane_Doe.original.docx"));
        assert_eq!(std::fs::read(preserved).unwrap(), b"not a zip at all");
    }

    #[tokio::test]
    async fn test_short_doc_falls_back_to_rendered_placeholder() {
        let renderer = StubRenderer::new();
        let converter = DocumentConverter::new(Some(renderer.clone()), None);
        let out = converter
            .convert(&raw("tiny.doc", DocumentExtension::Doc, b"\x00\x01hello there\x00".to_vec()))
            .await;

        assert_eq!(out.method, ConversionMethod::Placeholder);
        assert!(out.preserved_original.is_none());
        let pages = renderer.pages.lock().unwrap();
        assert!(pages[0].contains("tiny.doc"));
        assert!(pages[0].contains("hello there"));
    }

    #[tokio::test]
    async fn test_failing_renderer_still_yields_pdf() {
        let converter = DocumentConverter::new(Some(Arc::new(BrokenRenderer)), None);
        let xml = r#"<w:document><w:body><w:p><w:r><w:t>Body</w:t></w:r></w:p></w:body></w:document>"#;
        let out = converter
            .convert(&raw("cv.docx", DocumentExtension::Docx, docx_bytes(xml)))
            .await;

        assert_eq!(out.method, ConversionMethod::Placeholder);
        assert!(out.pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_original_file_name_strips_directories() {
        assert_eq!(
            original_file_name("../../etc/cv.doc", DocumentExtension::Doc),
            "cv.original.doc"
        );
        assert_eq!(original_file_name("", DocumentExtension::Pdf), "document.original.pdf");
    }
}
