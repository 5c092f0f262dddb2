//! # Fretboard Common Library
//!
//! Shared code for the Fretboard services:
//! - Error type used across crates
//! - Configuration file and data folder resolution
//! - Event types (IngestEvent) and the EventBus that carries them

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
