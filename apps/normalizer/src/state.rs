use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::orchestrator::ExtractionOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Stateless between documents, so one instance serves every request.
    pub orchestrator: Arc<ExtractionOrchestrator>,
    pub config: Config,
}
