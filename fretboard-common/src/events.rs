//! Event types for the Fretboard event system
//!
//! Provides the ingest event definitions and the EventBus that carries them
//! to whichever application state or UI layer subscribes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Song ingest lifecycle events
///
/// Every event carries the `request_id` of the `process` call that produced
/// it, so subscribers can follow concurrent requests independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum IngestEvent {
    /// Server accepted the request and assigned a job
    JobSubmitted {
        request_id: Uuid,
        job_id: String,
        /// Human-readable source description (URL or file name)
        source: String,
        timestamp: DateTime<Utc>,
    },

    /// Successful status read while polling
    ///
    /// Emitted once per status read, in poll order.
    JobProgress {
        request_id: Uuid,
        job_id: String,
        /// Percentage complete (0.0 - 100.0)
        progress: f64,
        current_step: String,
        /// 1-based poll attempt that produced this reading
        attempt: u32,
        timestamp: DateTime<Utc>,
    },

    /// A normalized song is available
    SongProcessed {
        request_id: Uuid,
        song_id: String,
        title: String,
        artist: String,
        timestamp: DateTime<Utc>,
    },

    /// The request ended without a song
    ProcessingFailed {
        request_id: Uuid,
        job_id: Option<String>,
        /// User-facing message
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl IngestEvent {
    /// Request this event belongs to
    pub fn request_id(&self) -> Uuid {
        match self {
            IngestEvent::JobSubmitted { request_id, .. }
            | IngestEvent::JobProgress { request_id, .. }
            | IngestEvent::SongProcessed { request_id, .. }
            | IngestEvent::ProcessingFailed { request_id, .. } => *request_id,
        }
    }
}

/// Broadcast bus for [`IngestEvent`]s
///
/// Cloning the bus yields another handle onto the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IngestEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use fretboard_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of receivers if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IngestEvent,
    ) -> Result<usize, broadcast::error::SendError<IngestEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IngestEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
