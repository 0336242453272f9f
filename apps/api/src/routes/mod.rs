pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::auth::handlers as auth;
use crate::ingest::validation::MAX_ARTIFACT_BYTES;
use crate::state::AppState;

/// Two artifacts at the ceiling plus multipart framing. Anything between one
/// ceiling and this limit reaches the validation gate and gets a specific message.
const MAX_ANALYZE_BODY_BYTES: usize = 2 * MAX_ARTIFACT_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::info_handler))
        .route("/health", get(health::health_handler))
        // Analysis API
        .route(
            "/analyze",
            post(analysis::handle_analyze).layer(DefaultBodyLimit::max(MAX_ANALYZE_BODY_BYTES)),
        )
        .route("/history", get(analysis::handle_history))
        // Auth API
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout))
        .route("/auth/user/:id", get(auth::handle_get_user))
        .route("/auth/validate", get(auth::handle_validate))
        .with_state(state)
}
