//! Ingest services
//!
//! Leaf-first: normalizer, submission, poller, orchestrator.

pub mod normalizer;
pub mod orchestrator;
pub mod poller;
pub mod submission;

pub use normalizer::normalize;
pub use orchestrator::{ProcessingOrchestrator, ProgressCallback};
pub use poller::{PollerConfig, StatusPoller};
pub use submission::{JobSubmitter, Submission};
