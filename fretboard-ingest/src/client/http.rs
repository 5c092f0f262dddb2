//! reqwest implementation of the job API
//!
//! Endpoints (relative to the configured server URL):
//! - `POST api/process-youtube` (JSON)
//! - `POST api/upload-audio` (multipart)
//! - `GET  api/status/{job_id}`
//! - `GET  api/results/{job_id}`

use super::wire::{StatusResponse, SubmitResponse, YouTubeRequest};
use super::{ApiError, JobApi};
use crate::models::{Preferences, SourceRef};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("Fretboard/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP job API client
pub struct HttpJobApi {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpJobApi {
    pub fn new(server_url: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(server_url)
            .map_err(|e| ApiError::Network(format!("Invalid server URL {}: {}", server_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Network(format!("Invalid server URL {}", server_url)));
        }
        // Endpoints are appended as path segments, so drop any trailing slash
        let trimmed = base_url.path().trim_end_matches('/').to_string();
        base_url.set_path(&trimmed);

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("Invalid server URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), error_text));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl JobApi for HttpJobApi {
    async fn submit(
        &self,
        source: &SourceRef,
        preferences: &Preferences,
    ) -> Result<SubmitResponse, ApiError> {
        let request = match source {
            SourceRef::YouTube { url } => {
                let endpoint = self.endpoint(&["api", "process-youtube"])?;
                tracing::debug!(url = %url, endpoint = %endpoint, "Submitting YouTube source");

                self.http_client.post(endpoint).json(&YouTubeRequest {
                    youtube_url: url.clone(),
                    target_key: preferences.target_key.clone(),
                    difficulty_level: preferences.difficulty_level,
                })
            }
            SourceRef::Upload { file_name, bytes } => {
                let endpoint = self.endpoint(&["api", "upload-audio"])?;
                tracing::debug!(
                    file_name = %file_name,
                    size_bytes = bytes.len(),
                    endpoint = %endpoint,
                    "Uploading audio source"
                );

                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(source.mime_type())
                    .map_err(|e| ApiError::Network(e.to_string()))?;
                let form = Form::new()
                    .part("file", part)
                    .text("target_key", preferences.target_key.clone())
                    .text("difficulty_level", preferences.difficulty_level.to_string());

                self.http_client.post(endpoint).multipart(form)
            }
        };

        self.send_json(request).await
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        let endpoint = self.endpoint(&["api", "status", job_id])?;
        tracing::debug!(job_id = %job_id, "Querying job status");
        self.send_json(self.http_client.get(endpoint)).await
    }

    async fn results(&self, job_id: &str) -> Result<serde_json::Value, ApiError> {
        let endpoint = self.endpoint(&["api", "results", job_id])?;
        tracing::debug!(job_id = %job_id, "Fetching job results");
        self.send_json(self.http_client.get(endpoint)).await
    }
}
