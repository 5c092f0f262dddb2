//! Processing pipeline
//!
//! submit → [immediate result | poll] → normalize → publish → cache
//!
//! The orchestrator holds no ambient state: collaborators are injected and
//! the outcome is returned as a [`Song`] (and published on the event bus).
//! Either a complete song is produced or a single classified error is
//! returned; there is no partial success.

use super::normalizer::{embed_resolved_fields, normalize};
use super::poller::{PollerConfig, StatusPoller};
use super::submission::{JobSubmitter, Submission};
use crate::cache::ResultCache;
use crate::client::JobApi;
use crate::error::{IngestError, IngestResult};
use crate::models::{Preferences, ProgressUpdate, Song, SourceRef};
use chrono::Utc;
use fretboard_common::events::{EventBus, IngestEvent};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Caller-supplied progress sink
pub type ProgressCallback = Box<dyn FnMut(ProgressUpdate) + Send>;

type SharedRun = Shared<BoxFuture<'static, IngestResult<Song>>>;

/// Composes submission, polling, normalization and caching
#[derive(Clone)]
pub struct ProcessingOrchestrator {
    submitter: JobSubmitter,
    poller: StatusPoller,
    cache: Arc<dyn ResultCache>,
    events: EventBus,
    /// Parent of every run's cancellation token
    shutdown: CancellationToken,
    /// Runs in progress, keyed by source dedup key and preferences
    in_flight: Arc<Mutex<HashMap<String, SharedRun>>>,
}

impl ProcessingOrchestrator {
    pub fn new(
        api: Arc<dyn JobApi>,
        cache: Arc<dyn ResultCache>,
        poller_config: PollerConfig,
        events: EventBus,
    ) -> Self {
        Self {
            submitter: JobSubmitter::new(api.clone()),
            poller: StatusPoller::new(api, poller_config),
            cache,
            events,
            shutdown: CancellationToken::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Cancel every in-flight run; later runs fail immediately with `Cancelled`
    pub fn shutdown(&self) {
        tracing::info!("Cancelling in-flight processing");
        self.shutdown.cancel();
    }

    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Process a source into a normalized song
    ///
    /// Concurrent calls for the same source and preferences share one run;
    /// only the first caller's `on_progress` is driven. The run is a spawned
    /// task: it finishes (and caches its result) even if every caller stops
    /// waiting, and removes itself from the in-flight map when done.
    pub async fn process(
        &self,
        source: SourceRef,
        preferences: Preferences,
        on_progress: Option<ProgressCallback>,
    ) -> IngestResult<Song> {
        let key = format!(
            "{}|{}|{}",
            source.dedup_key(),
            preferences.target_key,
            preferences.difficulty_level
        );

        let run = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::info!(source = %source.describe(), "Joining in-flight request for same source");
                    existing.clone()
                }
                None => {
                    let run = self.spawn_run(key.clone(), source, preferences, on_progress);
                    in_flight.insert(key, run.clone());
                    run
                }
            }
        };

        run.await
    }

    /// Start a run on its own task
    ///
    /// Called with the in-flight lock held, so the task's own removal of
    /// `key` cannot overtake the insertion.
    fn spawn_run(
        &self,
        key: String,
        source: SourceRef,
        preferences: Preferences,
        on_progress: Option<ProgressCallback>,
    ) -> SharedRun {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = this.run(source, preferences, on_progress).await;
            this.in_flight.lock().await.remove(&key);
            outcome
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Processing task aborted");
                Err(IngestError::Cancelled)
            })
        }
        .boxed()
        .shared()
    }

    /// Re-open a previously processed song from the local cache
    ///
    /// A cached payload that no longer normalizes is dropped and reported as a miss.
    pub async fn load_cached(&self, song_id: &str) -> IngestResult<Option<Song>> {
        let Some(payload) = self.cache.get(song_id).await? else {
            tracing::debug!(song_id = %song_id, "Cache miss");
            return Ok(None);
        };

        match normalize(&payload, song_id) {
            Ok(song) => {
                tracing::debug!(song_id = %song_id, "Loaded song from cache");
                Ok(Some(song))
            }
            Err(e) => {
                tracing::warn!(song_id = %song_id, error = %e, "Discarding unreadable cache entry");
                self.cache.remove(song_id).await?;
                Ok(None)
            }
        }
    }

    async fn run(
        &self,
        source: SourceRef,
        preferences: Preferences,
        mut on_progress: Option<ProgressCallback>,
    ) -> IngestResult<Song> {
        let request_id = Uuid::new_v4();
        let cancel = self.shutdown.child_token();
        let mut job_id = None;

        let outcome = self
            .execute(
                request_id,
                &source,
                &preferences,
                &cancel,
                &mut job_id,
                &mut on_progress,
            )
            .await;

        if let Err(e) = &outcome {
            match e {
                IngestError::Cancelled => {
                    tracing::info!(request_id = %request_id, source = %source.describe(), "Processing cancelled")
                }
                e if e.is_terminal() => tracing::error!(
                    request_id = %request_id,
                    source = %source.describe(),
                    job_id = job_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Processing failed"
                ),
                // Connectivity or slowness; a later retry may succeed
                _ => tracing::warn!(
                    request_id = %request_id,
                    source = %source.describe(),
                    job_id = job_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Processing gave up"
                ),
            }
            self.events.emit_lossy(IngestEvent::ProcessingFailed {
                request_id,
                job_id,
                message: e.user_message(),
                timestamp: Utc::now(),
            });
        }

        outcome
    }

    async fn execute(
        &self,
        request_id: Uuid,
        source: &SourceRef,
        preferences: &Preferences,
        cancel: &CancellationToken,
        job_id_out: &mut Option<String>,
        on_progress: &mut Option<ProgressCallback>,
    ) -> IngestResult<Song> {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let submission = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IngestError::Cancelled),
            submission = self.submitter.submit(source, preferences) => submission?,
        };

        *job_id_out = submission.job_id().map(str::to_string);

        let (fallback_id, payload) = match submission {
            Submission::Completed { job_id, result } => {
                (job_id.unwrap_or_else(|| source.dedup_key()), result)
            }
            Submission::Pending { job_id } => {
                self.events.emit_lossy(IngestEvent::JobSubmitted {
                    request_id,
                    job_id: job_id.clone(),
                    source: source.describe(),
                    timestamp: Utc::now(),
                });

                let events = &self.events;
                let mut report = |update: ProgressUpdate| {
                    events.emit_lossy(IngestEvent::JobProgress {
                        request_id,
                        job_id: update.job_id.clone(),
                        progress: update.progress,
                        current_step: update.current_step.clone(),
                        attempt: update.attempt,
                        timestamp: Utc::now(),
                    });
                    if let Some(callback) = on_progress.as_mut() {
                        callback(update);
                    }
                };

                let payload = self.poller.poll(&job_id, cancel, &mut report).await?;
                (job_id, payload)
            }
        };

        let mut song = normalize(&payload, &fallback_id)?;
        if song.video_url.is_none() {
            song.video_url = source.video_url().map(str::to_string);
        }

        tracing::info!(
            request_id = %request_id,
            song_id = %song.id,
            title = %song.title,
            chords = song.chords.len(),
            "Song processed"
        );
        self.events.emit_lossy(IngestEvent::SongProcessed {
            request_id,
            song_id: song.id.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            timestamp: Utc::now(),
        });

        // Best effort: the song is already complete
        let cached = embed_resolved_fields(&payload, &song);
        if let Err(e) = self.cache.put(&song.id, &cached).await {
            tracing::warn!(song_id = %song.id, error = %e, "Failed to cache result");
        }

        Ok(song)
    }
}
