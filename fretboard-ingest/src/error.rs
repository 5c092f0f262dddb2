//! Error types for fretboard-ingest
//!
//! Every failure of the submit → poll → normalize pipeline is classified
//! into exactly one [`IngestError`] variant. The core only classifies and
//! raises; presentation is left to the caller via [`IngestError::user_message`].

use thiserror::Error;

/// Pipeline error type
///
/// Variants carry strings rather than source errors so the type is `Clone`
/// and can be handed to every caller sharing a coalesced request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IngestError {
    /// Submit returned no job identifier, or the submit call itself failed
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Status/result fetches kept failing at the transport level
    #[error("Transient poll error: {0}")]
    TransientPoll(String),

    /// Server reported the job as failed
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// Attempt cap exhausted without reaching a terminal state
    #[error("Processing timed out after {attempts} status checks")]
    ProcessingTimeout { attempts: u32 },

    /// Result payload missing required structure
    #[error("Invalid result payload: {0}")]
    Normalization(String),

    /// Request was cancelled before completion
    #[error("Processing cancelled")]
    Cancelled,

    /// Result cache backend failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Source reference rejected before any network call
    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

impl IngestError {
    /// One user-facing sentence describing this failure
    pub fn user_message(&self) -> String {
        match self {
            IngestError::Submission(_) => {
                "Could not start processing this song. Please check the link or file and try again."
                    .to_string()
            }
            IngestError::TransientPoll(_) => {
                "Lost connection to the processing server. Please check your connection and try again."
                    .to_string()
            }
            IngestError::ProcessingFailed(msg) => format!("Song processing failed: {}", msg),
            IngestError::ProcessingTimeout { .. } => {
                "Processing is taking longer than expected. Please try again later.".to_string()
            }
            IngestError::Normalization(_) => {
                "The processed song could not be read. Please try again.".to_string()
            }
            IngestError::Cancelled => "Processing was cancelled.".to_string(),
            IngestError::Cache(_) => "Could not access saved songs.".to_string(),
            IngestError::InvalidSource(msg) => format!("Invalid song source: {}", msg),
        }
    }

    /// Whether the failure ended the request for good (no retry would help without user action)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IngestError::TransientPoll(_) | IngestError::ProcessingTimeout { .. })
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        IngestError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Normalization(err.to_string())
    }
}

/// Result type for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;
