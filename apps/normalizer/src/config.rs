use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every capability is optional; a missing one degrades the pipeline instead
/// of stopping startup. Malformed numbers do stop startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub anthropic_api_key: Option<String>,
    pub llm_timeout: Duration,
    pub chromium_path: Option<PathBuf>,
    pub tesseract_path: Option<PathBuf>,
    pub ocr_max_concurrency: usize,
    pub scratch_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            llm_timeout: Duration::from_secs(
                parse_env("LLM_TIMEOUT_SECS", 60)
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            chromium_path: optional_env("CHROMIUM_PATH").map(PathBuf::from),
            tesseract_path: optional_env("TESSERACT_PATH").map(PathBuf::from),
            ocr_max_concurrency: parse_env("OCR_MAX_CONCURRENCY", 4)
                .context("OCR_MAX_CONCURRENCY must be a positive integer")?,
            scratch_dir: optional_env("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
        })
    }
}

/// Unset and blank both count as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value '{raw}' for {key}")),
        None => Ok(default),
    }
}
