//! OCR fallback: recognizes page images concurrently and joins the results
//! back in page order.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::extraction::images::PageImage;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR engine exited with status {status}: {stderr}")]
    Process { status: i32, stderr: String },

    #[error("OCR engine error: {0}")]
    Engine(String),
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, RecognitionError>;
}

/// Stands in for an absent OCR capability: every image reads as empty.
pub struct NoOcr;

#[async_trait]
impl OcrEngine for NoOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String, RecognitionError> {
        Ok(String::new())
    }
}

/// Tesseract CLI. The image goes through a temp file under `scratch_root`;
/// text is read from stdout.
pub struct TesseractOcr {
    binary: PathBuf,
    scratch_root: PathBuf,
}

impl TesseractOcr {
    pub fn new(binary: PathBuf, scratch_root: PathBuf) -> Self {
        Self {
            binary,
            scratch_root,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, RecognitionError> {
        let file = tempfile::Builder::new()
            .prefix("ocr-")
            .tempfile_in(&self.scratch_root)?;
        tokio::fs::write(file.path(), image).await?;

        let output = Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(RecognitionError::Process {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOutput {
    /// Recognized text, page order, blank line between pages.
    pub text: String,
    /// Pages whose recognition failed and contributed nothing.
    pub failed_pages: Vec<u32>,
}

pub struct OcrFallback {
    engine: Arc<dyn OcrEngine>,
    max_concurrency: usize,
}

impl OcrFallback {
    pub fn new(engine: Arc<dyn OcrEngine>, max_concurrency: usize) -> Self {
        Self {
            engine,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Never fails. At most `min(images, max_concurrency)` recognitions run at
    /// once. Dropping the returned future aborts the in-flight tasks.
    pub async fn recognize(&self, images: Vec<PageImage>) -> OcrOutput {
        if images.is_empty() {
            return OcrOutput::default();
        }

        let count = images.len();
        let semaphore = Arc::new(Semaphore::new(count.min(self.max_concurrency)));
        let mut tasks = JoinSet::new();
        for (index, image) in images.into_iter().enumerate() {
            let engine = Arc::clone(&self.engine);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = engine.recognize(&image.data).await;
                (index, image.page, result)
            });
        }

        let mut slots = vec![String::new(); count];
        let mut failed_pages = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(text))) => slots[index] = text,
                Ok((_, page, Err(e))) => {
                    warn!("OCR failed for page {}: {}", page, e);
                    failed_pages.push(page);
                }
                Err(e) => warn!("OCR task did not complete: {}", e),
            }
        }
        failed_pages.sort_unstable();

        let text = slots
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        info!(
            "OCR recognized {} chars from {} images ({} failed)",
            text.chars().count(),
            count,
            failed_pages.len()
        );
        debug!("OCR failed pages: {:?}", failed_pages);
        OcrOutput { text, failed_pages }
    }
}
