use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::config::Config;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub capabilities: Capabilities,
}

/// Which optional backends are wired in. A `false` means that stage runs its
/// degraded path (regex extraction, placeholder PDFs, no OCR).
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub llm_extraction: bool,
    pub html_rendering: bool,
    pub ocr: bool,
}

impl From<&Config> for Capabilities {
    fn from(config: &Config) -> Self {
        Self {
            llm_extraction: config.anthropic_api_key.is_some(),
            html_rendering: config.chromium_path.is_some(),
            ocr: config.tesseract_path.is_some(),
        }
    }
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        service: "resume-normalizer",
        capabilities: Capabilities::from(&state.config),
    })
}
