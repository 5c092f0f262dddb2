//! Request and response bodies of the job API

use crate::models::JobStatus;
use serde::{Deserialize, Serialize};

/// `POST /api/process-youtube` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeRequest {
    pub youtube_url: String,
    pub target_key: String,
    pub difficulty_level: u8,
}

/// Response to either submission endpoint
///
/// `status: "completed"` together with `results` is a synchronous cache hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub results: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/status/{job_id}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub partial_results: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    /// Non-terminal status with progress
    pub fn processing(progress: f64, step: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Processing,
            progress_percentage: Some(progress),
            current_step: Some(step.into()),
            partial_results: None,
            error: None,
        }
    }

    /// Terminal success
    pub fn completed() -> Self {
        Self {
            status: JobStatus::Completed,
            progress_percentage: Some(100.0),
            current_step: Some("Completed".to_string()),
            partial_results: None,
            error: None,
        }
    }

    /// Terminal failure with an optional server message
    pub fn failed(error: Option<&str>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress_percentage: None,
            current_step: None,
            partial_results: None,
            error: error.map(str::to_string),
        }
    }
}
