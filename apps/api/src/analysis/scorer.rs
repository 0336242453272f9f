//! Scorer client: the single point of entry for calls to the external matching service.
//!
//! One attempt per analysis. A non-2xx status or an undeserializable body is
//! final for that request; there is no retry loop.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::analysis::{AnalysisRequest, AnalysisResult};

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("scorer unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("scorer returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("scorer reply could not be parsed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Opaque `(resume text, job text) -> result` function.
///
/// Carried in `AppState` as `Arc<dyn Scorer>`.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ScorerError>;
}

/// HTTP scorer: `POST {base}/analyze` with `{resume_text, job_text}`.
#[derive(Clone)]
pub struct HttpScorer {
    client: Client,
    endpoint: String,
}

impl HttpScorer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build scorer HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/analyze", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ScorerError> {
        debug!(
            "Calling scorer at {} (resume {} chars, job {} chars)",
            self.endpoint,
            request.resume_text.len(),
            request.job_text.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Scorer request failed: {e}");
                ScorerError::Transport(e)
            })?;

        let status = response.status();
        // read the body even on failure so it can be logged
        let body = response.text().await.map_err(ScorerError::Transport)?;

        if !status.is_success() {
            error!("Scorer returned error: status {status}, body: {body}");
            return Err(ScorerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<AnalysisResult>(&body).map_err(|e| {
            error!("Scorer reply did not match the expected shape: {e}; body: {body}");
            ScorerError::Malformed(e)
        })
    }
}
