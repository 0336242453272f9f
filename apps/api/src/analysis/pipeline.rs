//! Analysis orchestrator: validate, extract, score, record, respond.
//!
//! Extraction and upstream failures end the request. A failed history write is
//! logged and reported in the outcome, but the scored result is still returned.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::analysis::history::{HistoryRecorder, Recipient, Recorded};
use crate::analysis::scorer::{Scorer, ScorerError};
use crate::ingest::extract::{ExtractedDocument, ExtractionError, TextExtractor};
use crate::ingest::validation::{
    require_readable, validate_uploads, UploadedArtifact, ValidatedArtifact, ValidationError,
};
use crate::models::analysis::{AnalysisRequest, AnalysisResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Upstream(#[from] ScorerError),
}

impl PipelineError {
    /// Terminal state name, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "ValidationFailed",
            PipelineError::Extraction(_) => "ExtractionFailed",
            PipelineError::Upstream(_) => "UpstreamFailed",
        }
    }
}

/// What happened to the history entry of a successful analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Durable(i64),
    Ephemeral(i64),
    /// The write failed; the analysis itself still succeeded.
    Failed,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub persistence: Persistence,
}

/// Owns the lifecycle of one analysis request. Cheap to clone.
#[derive(Clone)]
pub struct AnalysisPipeline {
    extractor: Arc<dyn TextExtractor>,
    scorer: Arc<dyn Scorer>,
    history: HistoryRecorder,
}

impl AnalysisPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        scorer: Arc<dyn Scorer>,
        history: HistoryRecorder,
    ) -> Self {
        Self {
            extractor,
            scorer,
            history,
        }
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub async fn run(
        &self,
        resume: Option<UploadedArtifact>,
        job: Option<UploadedArtifact>,
        recipient: Recipient,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let outcome = self.execute(resume, job, recipient).await;
        if let Err(e) = &outcome {
            warn!("Analysis ended in {}: {e}", e.stage());
        }
        outcome
    }

    async fn execute(
        &self,
        resume: Option<UploadedArtifact>,
        job: Option<UploadedArtifact>,
        recipient: Recipient,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let pair = validate_uploads(resume, job)?;
        info!(
            "Starting analysis: resume '{}' ({}, {} bytes), job '{}' ({}, {} bytes)",
            pair.resume.name,
            pair.resume.kind,
            pair.resume.bytes.len(),
            pair.job.name,
            pair.job.kind,
            pair.job.bytes.len()
        );

        // No data dependency between the two documents. Both workers are
        // awaited even when one fails, so none outlives the request.
        let (resume_doc, job_doc) =
            tokio::join!(self.extract(&pair.resume), self.extract(&pair.job));
        let (resume_doc, job_doc) = (resume_doc?, job_doc?);

        require_readable(
            (pair.resume.name.as_str(), &resume_doc),
            (pair.job.name.as_str(), &job_doc),
        )?;

        let request = AnalysisRequest {
            resume_text: resume_doc.text,
            job_text: job_doc.text,
        };
        let result = self.scorer.score(&request).await?;

        let persistence = match self
            .history
            .record(&result, &pair.resume.name, &pair.job.name, recipient)
            .await
        {
            Ok(Recorded::Durable(id)) => Persistence::Durable(id),
            Ok(Recorded::Ephemeral(id)) => Persistence::Ephemeral(id),
            Err(e) => {
                error!("Failed to record analysis history for {recipient:?}: {e}");
                Persistence::Failed
            }
        };

        info!(
            "Analysis complete: {:.1}% match, {} missing skills, history {:?}",
            result.match_percentage,
            result.missing_skills.len(),
            persistence
        );

        Ok(AnalysisOutcome {
            result,
            persistence,
        })
    }

    /// Runs one extraction on the blocking pool.
    async fn extract(
        &self,
        artifact: &ValidatedArtifact,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        let bytes: Bytes = artifact.bytes.clone();
        let kind = artifact.kind;

        let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes, kind))
            .await
            .map_err(|e| ExtractionError::Worker(e.to_string()))?
            .map_err(|e| {
                error!("Failed to extract text from '{}': {e}", artifact.name);
                e
            })?;

        Ok(ExtractedDocument { kind, text })
    }
}
