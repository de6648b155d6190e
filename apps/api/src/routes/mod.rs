pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::submission::handlers;

/// Room for the text fields and multipart framing on top of the resume itself.
const FORM_OVERHEAD_BYTES: usize = 256 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Submission API
        .route("/api/v1/resumes", post(handlers::handle_submit))
        .route("/api/v1/resumes/:id", get(handlers::handle_get_resume))
        .route(
            "/api/v1/submissions/:id",
            get(handlers::handle_get_submission),
        )
        // Results view target handed out as the redirect
        .route("/resume/:id", get(handlers::handle_get_resume))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
