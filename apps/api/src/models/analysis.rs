use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Wire payload sent to the external scorer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub job_text: String,
}

/// Scorer reply, returned to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub match_percentage: f64,
    pub missing_skills: Vec<String>,
    pub recommendation: String,
}

/// One completed analysis, either persisted for an owner or held in a session buffer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRecord {
    pub id: i64,
    pub resume_name: String,
    pub job_title: String,
    pub match_percentage: f64,
    pub missing_skills: Json<Vec<String>>,
    pub recommendation: String,
    pub created_at: DateTime<Utc>,
    pub owner_id: Option<i64>,
}
