mod config;
mod conversion;
mod errors;
mod experience;
mod extraction;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod sanitize;
mod state;
mod structured;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::conversion::converter::DocumentConverter;
use crate::conversion::render::{ChromiumRenderer, HtmlRenderer};
use crate::extraction::ocr::{NoOcr, OcrEngine, OcrFallback, TesseractOcr};
use crate::llm_client::{AnthropicClient, CompletionClient};
use crate::pipeline::orchestrator::ExtractionOrchestrator;
use crate::routes::build_router;
use crate::state::AppState;
use crate::structured::extractor::StructuredExtractor;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed numeric values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume normalizer v{}", env!("CARGO_PKG_VERSION"));

    let orchestrator = build_orchestrator(&config)?;

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wires the configured capabilities into the pipeline. Each missing one is
/// logged and replaced by its degraded path.
fn build_orchestrator(config: &Config) -> Result<ExtractionOrchestrator> {
    let scratch = config.scratch_dir.join("normalizer");
    std::fs::create_dir_all(&scratch)
        .with_context(|| format!("could not create scratch dir {}", scratch.display()))?;

    let renderer: Option<Arc<dyn HtmlRenderer>> = match &config.chromium_path {
        Some(path) => {
            info!("Rendering via {}", path.display());
            Some(Arc::new(ChromiumRenderer::new(path.clone(), scratch.clone())))
        }
        None => {
            warn!("CHROMIUM_PATH not set, DOC/DOCX uploads get placeholder PDFs");
            None
        }
    };

    let ocr: Arc<dyn OcrEngine> = match &config.tesseract_path {
        Some(path) => {
            info!(
                "OCR via {} (max {} concurrent pages)",
                path.display(),
                config.ocr_max_concurrency
            );
            Arc::new(TesseractOcr::new(path.clone(), scratch.clone()))
        }
        None => {
            warn!("TESSERACT_PATH not set, scanned PDFs will not be recognized");
            Arc::new(NoOcr)
        }
    };

    let completion: Option<Arc<dyn CompletionClient>> = match &config.anthropic_api_key {
        Some(key) => {
            let client = AnthropicClient::new(key.clone(), config.llm_timeout)?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(client))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set, using regex extraction only");
            None
        }
    };

    Ok(ExtractionOrchestrator::new(
        DocumentConverter::new(renderer, Some(scratch)),
        OcrFallback::new(ocr, config.ocr_max_concurrency),
        StructuredExtractor::new(completion, config.llm_timeout),
    ))
}
