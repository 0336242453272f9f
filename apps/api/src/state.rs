use sqlx::SqlitePool;

use crate::analysis::history::HistoryRecorder;
use crate::analysis::pipeline::AnalysisPipeline;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    /// Extractor, scorer and history recorder for `/analyze`.
    /// Swap the extractor or scorer at startup to change backends.
    pub pipeline: AnalysisPipeline,
}

impl AppState {
    pub fn history(&self) -> &HistoryRecorder {
        self.pipeline.history()
    }
}
