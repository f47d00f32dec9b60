//! Extraction Orchestrator: one `RawDocument` in, one `NormalizedResume` out.
//!
//! Stages run strictly in sequence: convert, extract text, escalate to OCR
//! when the text is too short, structured extraction, experience total. No
//! stage error escapes; each one is recorded in a `FailureLog` and the run
//! continues with whatever the stage managed to produce. The record is
//! assembled in one step at the end.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::conversion::converter::{ConversionMethod, DocumentConverter};
use crate::experience::calculator::{ExperienceCalculator, UNKNOWN};
use crate::extraction::images::page_images;
use crate::extraction::ocr::OcrFallback;
use crate::extraction::text::{is_too_short, TextExtractor, MIN_TEXT_LENGTH};
use crate::models::resume::{
    ExtractedText, NormalizedResume, ParsingMethod, ProcessingStatus, Provenance, RawDocument,
    StructuredResumeDraft,
};
use crate::pipeline::{FailureLog, Stage};
use crate::sanitize::clean;
use crate::structured::extractor::StructuredExtractor;

pub const NOT_SPECIFIED: &str = "Not specified";
const ERROR_SUMMARY_PREFIX: &str = "Error during resume processing. ";

static FILE_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^/.]+$").unwrap());

pub struct ExtractionOrchestrator {
    converter: DocumentConverter,
    text: TextExtractor,
    ocr: OcrFallback,
    structured: StructuredExtractor,
    today: Option<NaiveDate>,
}

impl ExtractionOrchestrator {
    pub fn new(converter: DocumentConverter, ocr: OcrFallback, structured: StructuredExtractor) -> Self {
        Self {
            converter,
            text: TextExtractor::new(),
            ocr,
            structured,
            today: None,
        }
    }

    /// Pins the date open-ended durations are measured against.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn calculator(&self) -> ExperienceCalculator {
        match self.today {
            Some(today) => ExperienceCalculator::with_today(today),
            None => ExperienceCalculator::new(),
        }
    }

    /// Never fails. Degraded stages show up in `diagnostics`; only unusable
    /// input bytes produce `ProcessingStatus::Error`.
    pub async fn process(&self, doc: &RawDocument) -> NormalizedResume {
        let started = Utc::now();
        let mut failures = FailureLog::default();
        info!(
            "Processing {} ({}, {} bytes)",
            doc.original_name,
            doc.extension.as_str(),
            doc.bytes.len()
        );

        if doc.bytes.is_empty() {
            failures.record(Stage::Input, "uploaded file is empty");
        }
        if failures.is_fatal() {
            warn!("Unusable input for {}", doc.original_name);
            return error_record(doc, failures, started);
        }

        let converted = self.converter.convert(doc).await;
        if let Some(reason) = &converted.failure {
            failures.record(Stage::Conversion, reason.clone());
        }
        if converted.method == ConversionMethod::Placeholder {
            debug!("Continuing {} with a placeholder PDF", doc.original_name);
        }

        let extractor = self.text;
        let pdf = converted.pdf;
        let (pdf, mut extracted) =
            match tokio::task::spawn_blocking(move || {
                let text = extractor.extract(&pdf);
                (pdf, text)
            })
            .await
            {
                Ok(result) => result,
                Err(e) => {
                    failures.record(Stage::Extraction, format!("extraction task failed: {e}"));
                    (Vec::new(), ExtractedText::new(String::new(), Provenance::Fallback))
                }
            };
        if extracted.provenance == Provenance::Fallback {
            failures.record(Stage::Extraction, "PDF could not be parsed, used byte-pattern scan");
        }
        debug!(
            "Extracted {} chars from {} ({:?})",
            extracted.length, doc.original_name, extracted.provenance
        );

        if is_too_short(&extracted) {
            info!(
                "Only {} chars extracted from {}, trying OCR",
                extracted.length, doc.original_name
            );
            let images = tokio::task::spawn_blocking(move || page_images(&pdf))
                .await
                .unwrap_or_else(|e| {
                    warn!("Page image extraction task failed: {}", e);
                    Vec::new()
                });
            let output = self.ocr.recognize(images).await;
            for page in &output.failed_pages {
                failures.record(Stage::Recognition, format!("page {page} could not be recognized"));
            }
            let recognized = ExtractedText::new(output.text, Provenance::Ocr);
            if recognized.length > extracted.length {
                extracted = recognized;
            }
        }

        let text = contextualize(doc, &extracted);

        let structured = self.structured.extract(&text).await;
        if let Some(reason) = structured.failure {
            failures.record(Stage::StructuredExtraction, reason);
        }

        let mut draft = structured.draft.sanitized();
        let total_experience = self.calculator().calculate(&draft.experience);
        if draft.name.is_empty() {
            draft.name = name_from_filename(&doc.original_name);
        }
        if draft.experience_level.is_empty() {
            draft.experience_level = NOT_SPECIFIED.to_string();
        }

        let diagnostics = failures.into_diagnostics();
        info!(
            "Processed {}: {} via {:?}, total experience {}, {} degraded stages",
            doc.original_name,
            draft.name,
            structured.method,
            total_experience,
            diagnostics.len()
        );

        NormalizedResume {
            id: doc.id.clone(),
            original_name: doc.original_name.clone(),
            draft,
            total_experience,
            status: ProcessingStatus::Processed,
            extracted_text: text,
            provenance: extracted.provenance,
            parsing_method: structured.method,
            diagnostics,
            uploaded_at: doc.uploaded_at,
            processing_started_at: started,
            processing_completed_at: Utc::now(),
        }
    }
}

/// Appends the file information block. Text still under the threshold is
/// replaced by a placeholder sentence first.
fn contextualize(doc: &RawDocument, extracted: &ExtractedText) -> String {
    let body = if extracted.length < MIN_TEXT_LENGTH {
        unparsed_sentence(doc)
    } else {
        extracted.content.clone()
    };
    clean(&format!("{}{}", body, file_information(doc)))
}

fn unparsed_sentence(doc: &RawDocument) -> String {
    format!(
        "This appears to be a {} document that couldn't be fully parsed.",
        doc.extension.as_str().to_uppercase()
    )
}

fn file_information(doc: &RawDocument) -> String {
    format!(
        "\n\nFile Information:\nFilename: {}\nFile type: {}\nUploaded: {}\n",
        doc.original_name,
        doc.extension.as_str(),
        doc.uploaded_at.to_rfc3339()
    )
}

/// "jane_doe-resume.pdf" → "Jane Doe Resume".
pub fn name_from_filename(filename: &str) -> String {
    let stem = FILE_EXTENSION.replace(filename, "");
    stem.replace(['_', '-'], " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Error record for a run that died before `process` could return one.
pub fn aborted_record(doc: &RawDocument, reason: impl Into<String>) -> NormalizedResume {
    let mut failures = FailureLog::default();
    failures.record(Stage::Aborted, reason);
    error_record(doc, failures, Utc::now())
}

fn error_record(
    doc: &RawDocument,
    failures: FailureLog,
    started: DateTime<Utc>,
) -> NormalizedResume {
    let reason = failures
        .fatal()
        .map(|f| f.reason.clone())
        .unwrap_or_default();

    let draft = StructuredResumeDraft {
        name: name_from_filename(&doc.original_name),
        summary: format!("{ERROR_SUMMARY_PREFIX}{reason}"),
        experience_level: UNKNOWN.to_string(),
        ..Default::default()
    };

    NormalizedResume {
        id: doc.id.clone(),
        original_name: doc.original_name.clone(),
        draft,
        total_experience: UNKNOWN.to_string(),
        status: ProcessingStatus::Error,
        extracted_text: reason,
        provenance: Provenance::Fallback,
        parsing_method: ParsingMethod::Regex,
        diagnostics: failures.into_diagnostics(),
        uploaded_at: doc.uploaded_at,
        processing_started_at: started,
        processing_completed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::TimeZone;

    use super::*;
    use crate::conversion::placeholder::text_pdf;
    use crate::extraction::images::fixtures::scanned_pdf;
    use crate::extraction::ocr::{NoOcr, OcrEngine, RecognitionError};
    use crate::llm_client::stub::StubCompletion;
    use crate::llm_client::CompletionClient;
    use crate::models::resume::DocumentExtension;

    const OCR_TEXT: &str = "Jane Doe\njane.doe@example.com\nSenior Software Engineer\n\
        Experience\nAcme Corp - Backend Engineer - 01/2018 - 12/2020\n\
        Skills: Rust, PostgreSQL, Docker";

    /// Shared event log so tests can assert call order across capabilities.
    type Events = Arc<Mutex<Vec<&'static str>>>;

    struct RecordingOcr {
        events: Events,
    }

    #[async_trait]
    impl OcrEngine for RecordingOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String, RecognitionError> {
            self.events.lock().unwrap().push("ocr");
            Ok(OCR_TEXT.to_string())
        }
    }

    struct RecordingCompletion {
        events: Events,
        inner: Arc<StubCompletion>,
    }

    #[async_trait]
    impl CompletionClient for RecordingCompletion {
        async fn complete(&self, prompt: &str, system: &str) -> Result<String, crate::llm_client::LlmError> {
            self.events.lock().unwrap().push("complete");
            self.inner.complete(prompt, system).await
        }
    }

    fn document(name: &str, extension: DocumentExtension, bytes: Vec<u8>) -> RawDocument {
        RawDocument {
            id: "doc-1".to_string(),
            original_name: name.to_string(),
            bytes: Bytes::from(bytes),
            extension,
            uploaded_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn orchestrator(
        ocr: Arc<dyn OcrEngine>,
        completion: Option<Arc<dyn CompletionClient>>,
    ) -> ExtractionOrchestrator {
        ExtractionOrchestrator::new(
            DocumentConverter::new(None, None),
            OcrFallback::new(ocr, 2),
            StructuredExtractor::new(completion, Duration::from_secs(5)),
        )
        .with_today(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn resume_text() -> String {
        [
            "Jane Doe",
            "jane.doe@example.com | (555) 123-4567",
            "Senior Software Engineer",
            "Experience",
            "Acme Corp - Backend Engineer - 01/2018 - 12/2020",
            "Skills: Rust, PostgreSQL, Kubernetes, Docker",
            "Education",
            "B.S. Computer Science, State University, 2015",
        ]
        .join("\n")
    }

    #[tokio::test]
    async fn test_scanned_pdf_goes_through_ocr_before_structured_extraction() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let stub = StubCompletion::replying(r#"{"name": "Jane Doe"}"#);
        let completion = Arc::new(RecordingCompletion {
            events: Arc::clone(&events),
            inner: Arc::clone(&stub),
        });
        let orchestrator = orchestrator(
            Arc::new(RecordingOcr {
                events: Arc::clone(&events),
            }),
            Some(completion),
        );

        let doc = document("scan.pdf", DocumentExtension::Pdf, scanned_pdf(600, 800));
        let record = orchestrator.process(&doc).await;

        assert_eq!(*events.lock().unwrap(), vec!["ocr", "complete"]);
        assert_eq!(record.provenance, Provenance::Ocr);
        assert_eq!(record.status, ProcessingStatus::Processed);
        assert!(stub.prompts()[0].contains("Senior Software Engineer"));
        assert!(record.extracted_text.contains("Filename: scan.pdf"));
    }

    #[tokio::test]
    async fn test_malformed_completion_still_produces_record() {
        let stub = StubCompletion::replying(r#"{"name": "Jane Doe", "skills": ["Ru"#);
        let orchestrator = orchestrator(Arc::new(NoOcr), Some(stub.clone()));
        let doc = document(
            "jane.pdf",
            DocumentExtension::Pdf,
            text_pdf(&resume_text()).unwrap(),
        );

        let record = orchestrator.process(&doc).await;

        assert_eq!(record.status, ProcessingStatus::Processed);
        assert_eq!(record.parsing_method, ParsingMethod::Regex);
        assert_eq!(record.provenance, Provenance::Direct);
        assert_eq!(record.draft.name, "Jane Doe");
        assert_eq!(record.draft.email, "jane.doe@example.com");
        assert!(record
            .diagnostics
            .iter()
            .any(|d| d.starts_with("structured_extraction:")));

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.as_object().unwrap().values().all(|v| !v.is_null()));
        assert_eq!(stub.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_text_pdf_does_not_invoke_ocr() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = orchestrator(
            Arc::new(RecordingOcr {
                events: Arc::clone(&events),
            }),
            None,
        );
        let doc = document(
            "jane.pdf",
            DocumentExtension::Pdf,
            text_pdf(&resume_text()).unwrap(),
        );

        let record = orchestrator.process(&doc).await;

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(record.provenance, Provenance::Direct);
        assert_eq!(record.total_experience, "2 years 11 months");
        assert!(record.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_empty_upload_yields_error_record() {
        let orchestrator = orchestrator(Arc::new(NoOcr), None);
        let doc = document("john_smith-cv.pdf", DocumentExtension::Pdf, Vec::new());

        let record = orchestrator.process(&doc).await;

        assert_eq!(record.status, ProcessingStatus::Error);
        assert_eq!(record.total_experience, "Unknown");
        assert_eq!(record.draft.name, "John Smith Cv");
        assert!(record
            .draft
            .summary
            .starts_with("Error during resume processing. "));
        assert!(!record.extracted_text.is_empty());
        assert_eq!(record.diagnostics, vec!["input: uploaded file is empty"]);
    }

    #[test]
    fn test_aborted_record_carries_reason() {
        let doc = document("jane_doe.pdf", DocumentExtension::Pdf, b"%PDF-1.4".to_vec());

        let record = aborted_record(&doc, "task panicked");

        assert_eq!(record.status, ProcessingStatus::Error);
        assert_eq!(record.draft.name, "Jane Doe");
        assert_eq!(record.draft.summary, "Error during resume processing. task panicked");
        assert_eq!(record.diagnostics, vec!["aborted: task panicked"]);
    }

    #[tokio::test]
    async fn test_unreadable_docx_gets_placeholder_text_and_defaults() {
        let orchestrator = orchestrator(Arc::new(NoOcr), None);
        let doc = document("mary-ann_lee.docx", DocumentExtension::Docx, b"PK\x03\x04".to_vec());

        let record = orchestrator.process(&doc).await;

        assert_eq!(record.status, ProcessingStatus::Processed);
        assert!(record
            .extracted_text
            .starts_with("This appears to be a DOCX document that couldn't be fully parsed."));
        assert!(record.extracted_text.contains("File type: docx"));
        assert_eq!(record.draft.experience_level, NOT_SPECIFIED);
        assert_eq!(record.total_experience, "0 years");
        assert!(record.diagnostics.iter().any(|d| d.starts_with("conversion:")));
    }

    #[test]
    fn test_name_from_filename() {
        assert_eq!(name_from_filename("jane_doe-resume.pdf"), "Jane Doe Resume");
        assert_eq!(name_from_filename("JOHN SMITH.docx"), "John Smith");
        assert_eq!(name_from_filename("no_extension"), "No Extension");
    }
}
