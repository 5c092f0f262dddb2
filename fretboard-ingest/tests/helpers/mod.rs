//! Shared fixtures for fretboard-ingest integration tests
//!
//! [`ScriptedApi`] replays queued responses per endpoint and counts calls.
//! When the status queue runs dry it repeats the configured fallback, so a
//! job that never finishes needs a single line of setup.

#![allow(dead_code)]

use fretboard_ingest::client::{ApiError, JobApi, StatusResponse, SubmitResponse};
use fretboard_ingest::models::{JobStatus, Preferences, SourceRef};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct ScriptedApi {
    submit_queue: Mutex<VecDeque<Result<SubmitResponse, ApiError>>>,
    status_queue: Mutex<VecDeque<Result<StatusResponse, ApiError>>>,
    status_fallback: Option<Result<StatusResponse, ApiError>>,
    results_queue: Mutex<VecDeque<Result<Value, ApiError>>>,
    submit_delay: Duration,
    submitted: Mutex<Vec<(String, Preferences)>>,
    submit_calls: AtomicU32,
    status_calls: AtomicU32,
    results_calls: AtomicU32,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_ok(self, response: SubmitResponse) -> Self {
        self.submit_queue.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn submit_err(self, error: ApiError) -> Self {
        self.submit_queue.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn status_ok(self, response: StatusResponse) -> Self {
        self.status_queue.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn status_err(self, error: ApiError) -> Self {
        self.status_queue.lock().unwrap().push_back(Err(error));
        self
    }

    /// Returned once the status queue is empty
    pub fn status_forever(mut self, response: Result<StatusResponse, ApiError>) -> Self {
        self.status_fallback = Some(response);
        self
    }

    pub fn results_ok(self, payload: Value) -> Self {
        self.results_queue.lock().unwrap().push_back(Ok(payload));
        self
    }

    pub fn results_err(self, error: ApiError) -> Self {
        self.results_queue.lock().unwrap().push_back(Err(error));
        self
    }

    /// Delay every submission, to hold a run in flight
    pub fn submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn results_calls(&self) -> u32 {
        self.results_calls.load(Ordering::SeqCst)
    }

    /// Dedup keys and preferences of every submission, in order
    pub fn submitted(&self) -> Vec<(String, Preferences)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl JobApi for ScriptedApi {
    async fn submit(
        &self,
        source: &SourceRef,
        preferences: &Preferences,
    ) -> Result<SubmitResponse, ApiError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .unwrap()
            .push((source.dedup_key(), preferences.clone()));

        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        let next = self.submit_queue.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ApiError::Network("no scripted submit response".to_string())))
    }

    async fn status(&self, _job_id: &str) -> Result<StatusResponse, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.status_queue.lock().unwrap().pop_front();
        next.or_else(|| self.status_fallback.clone())
            .unwrap_or_else(|| Err(ApiError::Network("no scripted status response".to_string())))
    }

    async fn results(&self, _job_id: &str) -> Result<Value, ApiError> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.results_queue.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ApiError::Network("no scripted results response".to_string())))
    }
}

/// Submit response for a queued job
pub fn pending(job_id: &str) -> SubmitResponse {
    SubmitResponse {
        job_id: Some(job_id.to_string()),
        status: Some(JobStatus::Pending),
        ..Default::default()
    }
}

/// Submit response for a server-side cache hit
pub fn completed_immediately(job_id: &str, results: Value) -> SubmitResponse {
    SubmitResponse {
        job_id: Some(job_id.to_string()),
        status: Some(JobStatus::Completed),
        results: Some(results),
        error: None,
    }
}

pub fn network_error() -> ApiError {
    ApiError::Network("connection refused".to_string())
}

/// Canonical result payload with `chord_count` two-second chords
pub fn song_payload(song_id: &str, chord_count: usize) -> Value {
    let names = ["C", "G", "Am", "F"];
    let chords: Vec<Value> = (0..chord_count)
        .map(|i| {
            json!({
                "chord": names[i % names.len()],
                "startTime": i as f64 * 2.0,
                "duration": 2.0,
                "fingerPositions": [{"fret": 1, "string": 1, "finger": 1}]
            })
        })
        .collect();

    json!({
        "song_id": song_id,
        "metadata": {
            "title": "Wonderwall",
            "artist": "Oasis",
            "tempo_bpm": 87.0,
            "original_key": "F#m",
            "overall_difficulty": 2
        },
        "chords": chords
    })
}

pub fn youtube(url: &str) -> SourceRef {
    SourceRef::youtube(url).unwrap()
}
