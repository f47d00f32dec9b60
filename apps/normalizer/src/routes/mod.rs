pub mod experience;
pub mod health;
pub mod parse;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Upper bound on files in one parse request, used to size the body limit.
const MAX_FILES_PER_REQUEST: usize = 20;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST);

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resumes/parse",
            post(parse::handle_parse).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/v1/experience/calculate",
            post(experience::handle_calculate),
        )
        .with_state(state)
}
