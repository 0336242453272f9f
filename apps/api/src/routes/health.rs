use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

/// GET /
/// Service name and version.
pub async fn info_handler() -> Json<Value> {
    Json(json!({
        "message": "SkillSync Resume Analyzer API",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}
