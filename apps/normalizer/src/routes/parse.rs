use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{DocumentExtension, NormalizedResume, RawDocument};
use crate::pipeline::orchestrator::aborted_record;
use crate::state::AppState;

const FILES_FIELD: &str = "files";

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub success: bool,
    pub results: Vec<FileResult>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FileResult {
    Parsed(Box<NormalizedResume>),
    Rejected(Rejection),
}

/// A file that failed upload validation and never entered the pipeline.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub original_name: String,
    pub status: &'static str,
    pub error: &'static str,
    pub details: String,
}

enum Slot {
    Done(FileResult),
    Running(RawDocument, JoinHandle<NormalizedResume>),
}

struct Upload {
    name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

/// POST /api/v1/resumes/parse
/// Multipart form, one or more `files` fields. Returns one result per file in
/// upload order.
pub async fn handle_parse(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParseResponse>, AppError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("could not read {name}: {e}")))?;
        uploads.push(Upload {
            name,
            content_type,
            bytes,
        });
    }

    info!("Received {} files", uploads.len());
    if uploads.is_empty() {
        return Err(AppError::Validation("No files were uploaded".to_string()));
    }

    // One task per file so the pipelines overlap; results keep upload order.
    let mut slots = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match validate(upload, state.config.max_upload_bytes) {
            Ok(doc) => {
                let orchestrator = state.orchestrator.clone();
                let task_doc = doc.clone();
                let handle = tokio::spawn(async move { orchestrator.process(&task_doc).await });
                slots.push(Slot::Running(doc, handle));
            }
            Err(rejection) => {
                warn!("Rejected {}: {}", rejection.original_name, rejection.details);
                slots.push(Slot::Done(FileResult::Rejected(rejection)));
            }
        }
    }
    debug!(
        "{} files passed validation",
        slots.iter().filter(|s| matches!(s, Slot::Running(..))).count()
    );

    let mut results = Vec::with_capacity(slots.len());
    for slot in slots {
        let result = match slot {
            Slot::Done(result) => result,
            Slot::Running(doc, handle) => {
                let record = match handle.await {
                    Ok(record) => record,
                    Err(e) => {
                        error!("Pipeline task for {} failed: {e}", doc.original_name);
                        aborted_record(&doc, format!("pipeline task failed: {e}"))
                    }
                };
                FileResult::Parsed(Box::new(record))
            }
        };
        results.push(result);
    }

    Ok(Json(ParseResponse {
        success: true,
        results,
    }))
}

fn validate(upload: Upload, max_bytes: usize) -> Result<RawDocument, Rejection> {
    let extension = DocumentExtension::from_filename(&upload.name).or_else(|| {
        upload
            .content_type
            .as_deref()
            .and_then(DocumentExtension::from_mime)
    });

    let Some(extension) = extension else {
        return Err(Rejection {
            original_name: upload.name,
            status: "Error",
            error: "Invalid file type",
            details: "Only PDF, DOC, or DOCX files are allowed".to_string(),
        });
    };

    if upload.bytes.len() > max_bytes {
        return Err(Rejection {
            original_name: upload.name,
            status: "Error",
            error: "File too large",
            details: format!("Maximum file size is {}MB", max_bytes / (1024 * 1024)),
        });
    }

    Ok(RawDocument {
        id: Uuid::new_v4().to_string(),
        original_name: upload.name,
        bytes: upload.bytes,
        extension,
        uploaded_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: Option<&str>, len: usize) -> Upload {
        Upload {
            name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from(vec![b'x'; len]),
        }
    }

    #[test]
    fn test_extension_from_name_or_mime() {
        let doc = validate(upload("cv.DOCX", None, 10), 100).unwrap();
        assert_eq!(doc.extension, DocumentExtension::Docx);

        let doc = validate(upload("resume", Some("application/pdf"), 10), 100).unwrap();
        assert_eq!(doc.extension, DocumentExtension::Pdf);
    }

    #[test]
    fn test_rejects_unknown_type() {
        let rejection = validate(upload("notes.txt", Some("text/plain"), 10), 100).unwrap_err();
        assert_eq!(rejection.error, "Invalid file type");
        assert_eq!(rejection.original_name, "notes.txt");
    }

    #[test]
    fn test_rejects_oversized_file() {
        let rejection = validate(upload("big.pdf", None, 6 * 1024 * 1024), 5 * 1024 * 1024)
            .unwrap_err();
        assert_eq!(rejection.error, "File too large");
        assert_eq!(rejection.details, "Maximum file size is 5MB");
    }
}
