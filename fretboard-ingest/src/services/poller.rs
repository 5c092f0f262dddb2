//! Job status polling
//!
//! **Algorithm:**
//! 1. Query status (or, once `completed` was seen, fetch the full result)
//! 2. On a successful status read: reset the error streak, report progress
//!    - `completed` → fetch the result and return it
//!    - `failed` → fail with the server message
//! 3. On a transport failure: extend the error streak; give up once it
//!    reaches `max_consecutive_errors`, else back off for twice the interval
//! 4. Every attempt counts against `max_attempts`; exhausting it is a timeout
//!
//! Iterations are strictly sequential. The cancellation token is checked
//! before, and raced against, every suspension point.

use crate::client::{ApiError, JobApi};
use crate::error::{IngestError, IngestResult};
use crate::models::{Job, JobStatus, ProgressUpdate};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Polling limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay between status reads (doubled after a transport failure)
    pub interval: Duration,
    /// Hard cap on attempts, counting failed ones
    pub max_attempts: u32,
    /// Consecutive transport failures tolerated before aborting
    pub max_consecutive_errors: u32,
}

impl Default for PollerConfig {
    /// 60 attempts at 3 s: a three minute ceiling
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 60,
            max_consecutive_errors: 3,
        }
    }
}

/// Status poller over a [`JobApi`]
#[derive(Clone)]
pub struct StatusPoller {
    api: Arc<dyn JobApi>,
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn JobApi>, config: PollerConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll `job_id` until it completes, returning the full result payload
    ///
    /// `on_progress` is invoked once per successful status read, in attempt order.
    pub async fn poll(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        on_progress: &mut (dyn FnMut(ProgressUpdate) + Send),
    ) -> IngestResult<serde_json::Value> {
        let mut job = Job::new(job_id);
        let mut consecutive_errors = 0u32;

        for attempt in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                tracing::info!(job_id = %job_id, attempt, "Polling cancelled");
                return Err(IngestError::Cancelled);
            }

            let outcome = if job.status == JobStatus::Completed {
                // Status already terminal; only the result fetch is outstanding
                self.fetch_results(&job, cancel).await?
            } else {
                match cancellable(cancel, self.api.status(job_id)).await? {
                    Ok(response) => {
                        consecutive_errors = 0;
                        job.apply_status(&response);

                        let update = job.progress_update(attempt);
                        tracing::debug!(
                            job_id = %job_id,
                            attempt,
                            status = ?job.status,
                            progress = update.progress,
                            step = %update.current_step,
                            "Job status"
                        );
                        on_progress(update);

                        match job.status {
                            JobStatus::Completed => {
                                tracing::info!(job_id = %job_id, attempt, "Job completed");
                                self.fetch_results(&job, cancel).await?
                            }
                            JobStatus::Failed => {
                                let message = job
                                    .error
                                    .clone()
                                    .unwrap_or_else(|| "the server could not process this song".to_string());
                                tracing::error!(job_id = %job_id, attempt, error = %message, "Job failed");
                                return Err(IngestError::ProcessingFailed(message));
                            }
                            _ => Ok(None),
                        }
                    }
                    Err(e) => Err(e),
                }
            };

            let delay = match outcome {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => self.config.interval,
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= self.config.max_consecutive_errors {
                        tracing::error!(
                            job_id = %job_id,
                            attempt,
                            consecutive_errors,
                            error = %e,
                            "Giving up after consecutive transport failures"
                        );
                        return Err(IngestError::TransientPoll(e.to_string()));
                    }

                    let backoff = self.config.interval * 2;
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        consecutive_errors,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Status check failed, will retry after backoff"
                    );
                    backoff
                }
            };

            if attempt < self.config.max_attempts {
                cancellable(cancel, tokio::time::sleep(delay)).await?;
            }
        }

        tracing::error!(
            job_id = %job_id,
            attempts = self.config.max_attempts,
            progress = job.progress,
            "Job did not finish within the attempt cap"
        );
        Err(IngestError::ProcessingTimeout {
            attempts: self.config.max_attempts,
        })
    }

    /// Fetch the full result of a completed job
    ///
    /// Outer error: cancellation. Inner: transport failure, handled by the caller.
    async fn fetch_results(
        &self,
        job: &Job,
        cancel: &CancellationToken,
    ) -> IngestResult<Result<Option<serde_json::Value>, ApiError>> {
        let fetched = cancellable(cancel, self.api.results(&job.id)).await?;
        Ok(fetched.map(Some))
    }
}

/// Run `fut` unless `cancel` fires first
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> IngestResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IngestError::Cancelled),
        output = fut => Ok(output),
    }
}
