mod analysis;
mod auth;
mod config;
mod db;
mod errors;
mod ingest;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::history::{HistoryRecorder, SessionStore};
use crate::analysis::pipeline::AnalysisPipeline;
use crate::analysis::scorer::HttpScorer;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::ingest::extract::DocumentExtractor;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Fails fast on missing DATABASE_URL / TOKEN_SECRET
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillSync API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    info!("Database ready");

    // Initialize scoring client
    let scorer = HttpScorer::new(
        &config.scorer_url,
        Duration::from_secs(config.scorer_timeout_secs),
    )?;
    info!("Scorer client initialized (endpoint: {})", scorer.endpoint());

    let sessions = SessionStore::new(
        config.session_history_limit,
        config.session_idle_minutes,
        config.session_max_count,
    );
    info!(
        "Anonymous history: {} records per session, {}m idle expiry, at most {} sessions",
        config.session_history_limit, config.session_idle_minutes, config.session_max_count
    );

    let pipeline = AnalysisPipeline::new(
        Arc::new(DocumentExtractor),
        Arc::new(scorer),
        HistoryRecorder::new(db.clone(), sessions),
    );

    let state = AppState {
        db,
        config: config.clone(),
        pipeline,
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
