//! fretboard-ingest library interface
//!
//! Client side of the analysis server's asynchronous job protocol:
//! submit a YouTube link or audio upload, poll the job with bounded
//! retries, normalize the result into a [`models::Song`] and cache it.
//!
//! Leaf-first module map:
//! - `models`: Job, Song/Chord, SourceRef, Preferences
//! - `client`: `JobApi` port and its HTTP implementation
//! - `cache`: bounded result caches (memory, SQLite)
//! - `services`: normalizer, submitter, poller, orchestrator

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{IngestError, IngestResult};
pub use crate::services::{ProcessingOrchestrator, ProgressCallback};
