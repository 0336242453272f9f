//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Multipart, Query, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::analysis::history::Recipient;
use crate::errors::AppError;
use crate::ingest::validation::UploadedArtifact;
use crate::models::analysis::AnalysisRecord;
use crate::state::AppState;

/// Identifies an anonymous client's ephemeral history buffer.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Default)]
struct AnalysisForm {
    resume: Option<UploadedArtifact>,
    job: Option<UploadedArtifact>,
    user_id: Option<i64>,
}

/// POST /analyze
///
/// Multipart fields: `resume` (file), `jobDescription` (file), optional `userId`.
/// Anonymous callers get their session id back in the `x-session-id` header.
pub async fn handle_analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_analysis_form(multipart).await?;

    let recipient = match form.user_id {
        Some(user_id) => Recipient::Identity(user_id),
        None => Recipient::Session(session_id(&headers).unwrap_or_else(Uuid::new_v4)),
    };

    let outcome = state.pipeline.run(form.resume, form.job, recipient).await?;

    let mut response = Json(outcome.result).into_response();
    if let Recipient::Session(session) = recipient {
        let value = HeaderValue::from_str(&session.to_string())
            .map_err(|e| AppError::Internal(e.into()))?;
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    Ok(response)
}

/// GET /history?userId=
///
/// Durable history for `userId`; otherwise the caller's session buffer, or an
/// empty list when there is neither.
pub async fn handle_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<AnalysisRecord>>, AppError> {
    let recipient = match params.user_id {
        Some(user_id) => Some(Recipient::Identity(user_id)),
        None => session_id(&headers).map(Recipient::Session),
    };
    let records = state.history().history(recipient).await?;
    Ok(Json(records))
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    let raw = headers.get(SESSION_HEADER)?.to_str().ok()?;
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            debug!("Ignoring malformed {SESSION_HEADER} header");
            None
        }
    }
}

/// Buffers both uploads fully. A file field with no name and no content is
/// treated as absent, the way browsers submit an empty file input.
async fn read_analysis_form(mut multipart: Multipart) -> Result<AnalysisForm, AppError> {
    let mut form = AnalysisForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" | "jobDescription" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Could not read upload '{name}': {e}"))
                })?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                let artifact = Some(UploadedArtifact::new(file_name, bytes));
                if name == "resume" {
                    form.resume = artifact;
                } else {
                    form.job = artifact;
                }
            }
            "userId" => {
                let raw = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Could not read field 'userId': {e}"))
                })?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let user_id = raw.parse::<i64>().map_err(|_| {
                        AppError::BadRequest(format!("userId must be an integer, got '{raw}'"))
                    })?;
                    form.user_id = Some(user_id);
                }
            }
            other => debug!("Ignoring unexpected multipart field '{other}'"),
        }
    }

    Ok(form)
}
