//! Data models for fretboard-ingest
//!
//! - Job lifecycle as seen from status polling
//! - Normalized Song/Chord records handed to the application
//! - Request inputs (source reference, preferences)

pub mod job;
pub mod song;
pub mod source;

pub use job::{Job, JobStatus, Preferences, ProgressUpdate};
pub use song::{Chord, FingerPosition, Song};
pub use source::SourceRef;
