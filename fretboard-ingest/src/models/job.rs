//! Server job state machine
//!
//! PENDING → PROCESSING → COMPLETED | FAILED
//!
//! A [`Job`] is created on submission and mutated only by status responses.

use crate::client::StatusResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default musical key requested from the analysis server
pub const DEFAULT_TARGET_KEY: &str = "C";
/// Default difficulty level requested from the analysis server
pub const DEFAULT_DIFFICULTY_LEVEL: u8 = 3;
/// Valid difficulty levels
pub const DIFFICULTY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Server-reported job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued, not started
    Pending,
    /// Analysis running
    Processing,
    /// Results available
    Completed,
    /// Analysis aborted server-side
    Failed,
    /// Any status string this client does not know; treated as non-terminal
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// No further transitions occur from a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Client-side view of a server job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque server identifier
    pub id: String,

    pub status: JobStatus,

    /// Percentage complete (0.0 - 100.0)
    pub progress: f64,

    /// Current processing step label
    pub current_step: String,

    /// Incomplete analysis output, for progress display only
    pub partial_results: Option<serde_json::Value>,

    /// Server-reported error message
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a freshly submitted job
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            progress: 0.0,
            current_step: String::new(),
            partial_results: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status response
    ///
    /// Fields absent from the response keep their previous value. A completed
    /// job always reports 100% progress. Unknown statuses are recorded as
    /// `Processing`.
    pub fn apply_status(&mut self, response: &StatusResponse) {
        self.status = match response.status {
            JobStatus::Unknown => JobStatus::Processing,
            status => status,
        };

        if self.status == JobStatus::Completed {
            self.progress = 100.0;
        } else if let Some(progress) = response.progress_percentage {
            self.progress = clamp_progress(progress);
        }

        if let Some(step) = &response.current_step {
            self.current_step = step.clone();
        }
        if response.partial_results.is_some() {
            self.partial_results = response.partial_results.clone();
        }
        if response.error.is_some() {
            self.error = response.error.clone();
        }
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Snapshot of the current progress for the given poll attempt
    pub fn progress_update(&self, attempt: u32) -> ProgressUpdate {
        ProgressUpdate {
            job_id: self.id.clone(),
            attempt,
            progress: self.progress,
            current_step: self.current_step.clone(),
        }
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

/// Progress event delivered to callers while polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub job_id: String,
    /// 1-based poll attempt
    pub attempt: u32,
    /// Percentage complete (0.0 - 100.0)
    pub progress: f64,
    pub current_step: String,
}

/// Analysis preferences sent with a submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_target_key")]
    pub target_key: String,

    #[serde(default = "default_difficulty_level")]
    pub difficulty_level: u8,
}

impl Preferences {
    /// Build preferences, applying defaults for omitted values
    ///
    /// Blank keys fall back to the default key; difficulty is clamped into range.
    pub fn new(target_key: Option<&str>, difficulty_level: Option<u8>) -> Self {
        let target_key = target_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_TARGET_KEY)
            .to_string();
        let difficulty_level = difficulty_level
            .unwrap_or(DEFAULT_DIFFICULTY_LEVEL)
            .clamp(*DIFFICULTY_RANGE.start(), *DIFFICULTY_RANGE.end());

        Self {
            target_key,
            difficulty_level,
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self::new(None, None)
    }
}

fn default_target_key() -> String {
    DEFAULT_TARGET_KEY.to_string()
}

fn default_difficulty_level() -> u8 {
    DEFAULT_DIFFICULTY_LEVEL
}
