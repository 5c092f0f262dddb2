//! Normalized song records
//!
//! Serialized in camelCase, the shape the application layer consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of strings on a standard guitar (string indices 0-5)
pub const GUITAR_STRINGS: u8 = 6;

/// A fully processed song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Never empty
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Source video reference, when known
    pub video_url: Option<String>,
    /// Seconds
    pub duration: f64,
    /// Beats per minute
    pub tempo: f64,
    pub key: String,
    /// Sorted by start time
    pub chords: Vec<Chord>,
    pub difficulty: u8,
    pub processed_at: DateTime<Utc>,
}

impl Song {
    /// Distinct chord names in order of first appearance
    pub fn unique_chord_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for chord in &self.chords {
            if !names.contains(&chord.name.as_str()) {
                names.push(&chord.name);
            }
        }
        names
    }
}

/// One chord occurrence in a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chord {
    pub name: String,
    /// Seconds from song start, >= 0
    pub start_time: f64,
    /// Seconds, > 0
    pub duration: f64,
    pub finger_positions: Vec<FingerPosition>,
}

impl Chord {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Fretting instruction for one string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerPosition {
    /// 0 = open string
    pub fret: u8,
    /// String index 0-5
    pub string: u8,
    /// 1-4 (index to pinky), None when unspecified
    pub finger: Option<u8>,
}
