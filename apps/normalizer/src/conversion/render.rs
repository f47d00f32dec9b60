//! Rendering capability: HTML in, PDF bytes out.
//!
//! `ChromiumRenderer` drives a headless browser through `--print-to-pdf`.
//! Tests and deployments without a browser inject their own `HtmlRenderer`.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No rendering capability configured")]
    Unavailable,

    #[error("Render I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Renderer exited with status {status}: {stderr}")]
    Process { status: i32, stderr: String },

    #[error("Renderer produced no output")]
    EmptyOutput,
}

#[async_trait]
pub trait HtmlRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

/// Headless Chromium/Chrome invoked as a subprocess. Each render gets its own
/// temporary directory under `scratch_root`, removed when the call returns.
pub struct ChromiumRenderer {
    binary: PathBuf,
    scratch_root: PathBuf,
}

impl ChromiumRenderer {
    pub fn new(binary: PathBuf, scratch_root: PathBuf) -> Self {
        Self {
            binary,
            scratch_root,
        }
    }
}

#[async_trait]
impl HtmlRenderer for ChromiumRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let workdir = tempfile::Builder::new()
            .prefix("render-")
            .tempdir_in(&self.scratch_root)?;
        let html_path = workdir.path().join("document.html");
        let pdf_path = workdir.path().join("document.pdf");
        tokio::fs::write(&html_path, html).await?;

        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", pdf_path.display()))
            .arg(format!("file://{}", html_path.display()))
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(RenderError::Process {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pdf = tokio::fs::read(&pdf_path).await?;
        if pdf.is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        debug!("Rendered {} bytes of HTML into {} bytes of PDF", html.len(), pdf.len());
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_an_io_error() {
        let scratch = tempfile::tempdir().unwrap();
        let renderer = ChromiumRenderer::new(
            PathBuf::from("/nonexistent/chromium-for-tests"),
            scratch.path().to_path_buf(),
        );
        let result = renderer.render("<html></html>").await;
        assert!(matches!(result, Err(RenderError::Io(_))));
    }
}
