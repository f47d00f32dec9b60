use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sanitize::{clean, clean_all};

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// Source formats accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentExtension {
    Pdf,
    Doc,
    Docx,
}

impl DocumentExtension {
    /// Parses a bare extension (`"PDF"`, `"docx"`, `".doc"`).
    pub fn parse(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Extension taken from the last `.` segment of a filename.
    pub fn from_filename(name: &str) -> Option<Self> {
        name.rsplit_once('.').and_then(|(_, ext)| Self::parse(ext))
    }

    /// Maps the MIME types browsers send for the accepted formats.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "application/msword" => Some(Self::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
        }
    }

    pub fn needs_conversion(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// The uploaded file plus minimal metadata. Owned by the caller; the pipeline
/// only borrows it.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: String,
    pub original_name: String,
    pub bytes: Bytes,
    pub extension: DocumentExtension,
    pub uploaded_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Intermediate values
// ────────────────────────────────────────────────────────────────────────────

/// Which extraction path produced a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Direct,
    Ocr,
    Fallback,
}

/// Text pulled out of a document. `content` is always present; a failed
/// extraction carries a diagnostic placeholder instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedText {
    pub content: String,
    pub provenance: Provenance,
    /// Length in characters.
    pub length: usize,
}

impl ExtractedText {
    pub fn new(content: String, provenance: Provenance) -> Self {
        let length = content.chars().count();
        Self {
            content,
            provenance,
            length,
        }
    }
}

/// One work-history duration after parsing. `months` is `None` when no
/// matcher accepted the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperiencePeriod {
    pub raw_duration: String,
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationDetail {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

/// Structured fields before experience aggregation. Every field defaults to
/// an empty string or empty list, whichever path produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructuredResumeDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub title: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<String>,
    pub education_details: Vec<EducationDetail>,
    pub certifications: Vec<String>,
    pub languages: Vec<String>,
    pub experience_level: String,
}

impl StructuredResumeDraft {
    /// Runs every string field through the sanitizer.
    pub fn sanitized(self) -> Self {
        Self {
            name: clean(&self.name),
            email: clean(&self.email),
            phone: clean(&self.phone),
            location: clean(&self.location),
            title: clean(&self.title),
            summary: clean(&self.summary),
            skills: clean_all(&self.skills),
            experience: self
                .experience
                .into_iter()
                .map(|e| Experience {
                    title: clean(&e.title),
                    company: clean(&e.company),
                    duration: clean(&e.duration),
                    description: clean(&e.description),
                })
                .collect(),
            education: clean_all(&self.education),
            education_details: self
                .education_details
                .into_iter()
                .map(|e| EducationDetail {
                    degree: clean(&e.degree),
                    institution: clean(&e.institution),
                    year: clean(&e.year),
                })
                .collect(),
            certifications: clean_all(&self.certifications),
            languages: clean_all(&self.languages),
            experience_level: clean(&self.experience_level),
        }
    }

    /// Fills every empty field of `self` from `other`. Non-empty fields win.
    pub fn or_fill_from(mut self, other: StructuredResumeDraft) -> Self {
        fn fill(target: &mut String, source: String) {
            if target.trim().is_empty() {
                *target = source;
            }
        }
        fn fill_vec<T>(target: &mut Vec<T>, source: Vec<T>) {
            if target.is_empty() {
                *target = source;
            }
        }

        fill(&mut self.name, other.name);
        fill(&mut self.email, other.email);
        fill(&mut self.phone, other.phone);
        fill(&mut self.location, other.location);
        fill(&mut self.title, other.title);
        fill(&mut self.summary, other.summary);
        fill_vec(&mut self.skills, other.skills);
        fill_vec(&mut self.experience, other.experience);
        fill_vec(&mut self.education, other.education);
        fill_vec(&mut self.education_details, other.education_details);
        fill_vec(&mut self.certifications, other.certifications);
        fill_vec(&mut self.languages, other.languages);
        fill(&mut self.experience_level, other.experience_level);
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Processed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsingMethod {
    Llm,
    Regex,
}

/// The pipeline's sole output: the draft plus computed total experience and
/// status, handed to the persistence collaborator as one value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResume {
    pub id: String,
    pub original_name: String,
    #[serde(flatten)]
    pub draft: StructuredResumeDraft,
    pub total_experience: String,
    pub status: ProcessingStatus,
    pub extracted_text: String,
    pub provenance: Provenance,
    pub parsing_method: ParsingMethod,
    /// Degraded stages, in the order they occurred. Empty on a clean run.
    pub diagnostics: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
    pub processing_started_at: DateTime<Utc>,
    pub processing_completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_parsing() {
        assert_eq!(DocumentExtension::parse("PDF"), Some(DocumentExtension::Pdf));
        assert_eq!(DocumentExtension::parse(".docx"), Some(DocumentExtension::Docx));
        assert_eq!(DocumentExtension::parse("txt"), None);
        assert_eq!(
            DocumentExtension::from_filename("Jane_Doe.CV.doc"),
            Some(DocumentExtension::Doc)
        );
        assert_eq!(DocumentExtension::from_filename("no_extension"), None);
    }

    #[test]
    fn test_extension_from_mime() {
        assert_eq!(
            DocumentExtension::from_mime("application/msword"),
            Some(DocumentExtension::Doc)
        );
        assert_eq!(DocumentExtension::from_mime("text/plain"), None);
    }

    #[test]
    fn test_draft_deserializes_with_missing_fields_as_empty() {
        let draft: StructuredResumeDraft =
            serde_json::from_str(r#"{"name": "Jane Doe", "experience": [{"title": "Dev"}]}"#)
                .unwrap();
        assert_eq!(draft.name, "Jane Doe");
        assert_eq!(draft.email, "");
        assert!(draft.skills.is_empty());
        assert_eq!(draft.experience[0].duration, "");
    }

    #[test]
    fn test_draft_serializes_camel_case() {
        let value = serde_json::to_value(StructuredResumeDraft::default()).unwrap();
        assert!(value.get("educationDetails").is_some());
        assert!(value.get("experienceLevel").is_some());
        assert!(value.get("education_details").is_none());
    }

    #[test]
    fn test_or_fill_from_prefers_existing_values() {
        let primary = StructuredResumeDraft {
            name: "Jane Doe".to_string(),
            ..Default::default()
        };
        let secondary = StructuredResumeDraft {
            name: "Someone Else".to_string(),
            email: "jane@example.com".to_string(),
            skills: vec!["Rust".to_string()],
            ..Default::default()
        };
        let merged = primary.or_fill_from(secondary);
        assert_eq!(merged.name, "Jane Doe");
        assert_eq!(merged.email, "jane@example.com");
        assert_eq!(merged.skills, vec!["Rust"]);
    }

    #[test]
    fn test_sanitized_cleans_nested_fields() {
        let draft = StructuredResumeDraft {
            name: " Jane\0 ".to_string(),
            skills: vec!["\u{0001}".to_string(), "Go".to_string()],
            experience: vec![Experience {
                title: "Dev\u{0007}".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let clean = draft.sanitized();
        assert_eq!(clean.name, "Jane");
        assert_eq!(clean.skills, vec!["Go"]);
        assert_eq!(clean.experience[0].title, "Dev");
    }

    #[test]
    fn test_extracted_text_length_counts_chars() {
        let text = ExtractedText::new("résumé".to_string(), Provenance::Direct);
        assert_eq!(text.length, 6);
    }
}
