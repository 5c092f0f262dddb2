//! Analysis server job API
//!
//! [`JobApi`] is the seam between the pipeline and the network. The HTTP
//! implementation lives in [`http`]; tests substitute scripted fakes.

pub mod http;
pub mod wire;

pub use http::HttpJobApi;
pub use wire::{StatusResponse, SubmitResponse};

use crate::models::{Preferences, SourceRef};
use thiserror::Error;

/// Transport-level job API errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success HTTP status
    #[error("API error {0}: {1}")]
    Status(u16, String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Asynchronous job-queue API of the analysis server
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    /// Start processing a source; may complete synchronously on a server-side cache hit
    async fn submit(
        &self,
        source: &SourceRef,
        preferences: &Preferences,
    ) -> Result<SubmitResponse, ApiError>;

    /// Current status of a job
    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError>;

    /// Full (non-partial) result payload of a completed job
    async fn results(&self, job_id: &str) -> Result<serde_json::Value, ApiError>;
}
