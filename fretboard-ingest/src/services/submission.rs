//! Job submission
//!
//! Turns a submit response into either an immediate result (server-side
//! cache hit) or a job identifier to poll. Submission failures are never
//! retried here.

use crate::client::{ApiError, JobApi};
use crate::error::{IngestError, IngestResult};
use crate::models::{JobStatus, Preferences, SourceRef};
use std::sync::Arc;

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Server answered synchronously with the final payload
    Completed {
        job_id: Option<String>,
        result: serde_json::Value,
    },
    /// Work is queued; poll `job_id` for the outcome
    Pending { job_id: String },
}

impl Submission {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Submission::Completed { job_id, .. } => job_id.as_deref(),
            Submission::Pending { job_id } => Some(job_id),
        }
    }
}

/// Submission client over a [`JobApi`]
#[derive(Clone)]
pub struct JobSubmitter {
    api: Arc<dyn JobApi>,
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }

    pub async fn submit(
        &self,
        source: &SourceRef,
        preferences: &Preferences,
    ) -> IngestResult<Submission> {
        tracing::debug!(
            source = %source.describe(),
            target_key = %preferences.target_key,
            difficulty_level = preferences.difficulty_level,
            "Submitting processing request"
        );

        let response = self
            .api
            .submit(source, preferences)
            .await
            .map_err(|e| IngestError::Submission(describe_api_error(&e)))?;

        let job_id = response
            .job_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        match (response.status, response.results) {
            (Some(JobStatus::Completed), Some(result)) => {
                tracing::info!(
                    job_id = job_id.as_deref().unwrap_or("-"),
                    source = %source.describe(),
                    "Server returned cached result; no polling required"
                );
                Ok(Submission::Completed { job_id, result })
            }
            (Some(JobStatus::Failed), _) => {
                let message = response
                    .error
                    .unwrap_or_else(|| "server rejected the request".to_string());
                tracing::error!(source = %source.describe(), error = %message, "Submission rejected");
                Err(IngestError::ProcessingFailed(message))
            }
            _ => match job_id {
                Some(job_id) => {
                    tracing::info!(job_id = %job_id, source = %source.describe(), "Job submitted");
                    Ok(Submission::Pending { job_id })
                }
                None => {
                    let detail = response
                        .error
                        .unwrap_or_else(|| "server returned no job identifier".to_string());
                    tracing::error!(source = %source.describe(), error = %detail, "Submission failed");
                    Err(IngestError::Submission(detail))
                }
            },
        }
    }
}

fn describe_api_error(err: &ApiError) -> String {
    match err {
        ApiError::Status(code, body) if !body.trim().is_empty() => {
            format!("server returned {}: {}", code, body.trim())
        }
        ApiError::Status(code, _) => format!("server returned {}", code),
        other => other.to_string(),
    }
}
