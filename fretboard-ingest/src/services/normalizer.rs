//! Result payload normalization
//!
//! The analysis server has shipped two payload shapes over time:
//!
//! ```text
//! canonical: { "song_id", "metadata": { "title", "tempo_bpm", ... }, "chords": [...] }
//! legacy:    { "song_id", "title", "tempo_bpm", ..., "chords": [...] }
//! ```
//!
//! Every metadata field is resolved nested → flattened → default. Only
//! structural damage (payload not an object, `chords` not a list, a chord
//! without name or positive duration) is an error; missing optional fields
//! degrade to defaults.

use crate::error::{IngestError, IngestResult};
use crate::models::song::GUITAR_STRINGS;
use crate::models::{Chord, FingerPosition, Song};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_ARTIST: &str = "Unknown Artist";
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const DEFAULT_KEY: &str = "C";
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// Payload layout, determining where metadata fields are looked up
#[derive(Debug, Clone, Copy)]
enum PayloadShape<'a> {
    /// `metadata` object present; top-level fields are the fallback
    Nested {
        metadata: &'a Map<String, Value>,
        root: &'a Map<String, Value>,
    },
    /// Metadata fields flattened onto the top level
    Flat { root: &'a Map<String, Value> },
}

impl<'a> PayloadShape<'a> {
    fn of(root: &'a Map<String, Value>) -> Self {
        match root.get("metadata").and_then(Value::as_object) {
            Some(metadata) => PayloadShape::Nested { metadata, root },
            None => PayloadShape::Flat { root },
        }
    }

    fn root(&self) -> &'a Map<String, Value> {
        match *self {
            PayloadShape::Nested { root, .. } | PayloadShape::Flat { root } => root,
        }
    }

    /// Lookup layers in resolution order
    fn layers(&self) -> impl Iterator<Item = &'a Map<String, Value>> {
        let (first, second) = match *self {
            PayloadShape::Nested { metadata, root } => (Some(metadata), root),
            PayloadShape::Flat { root } => (None, root),
        };
        first.into_iter().chain(std::iter::once(second))
    }

    /// First value under any of `names` that `parse` accepts, layer by layer
    fn resolve<T>(&self, names: &[&str], parse: impl Fn(&Value) -> Option<T>) -> Option<T> {
        self.layers()
            .find_map(|layer| names.iter().find_map(|name| layer.get(*name).and_then(&parse)))
    }

    fn string(&self, names: &[&str]) -> Option<String> {
        self.resolve(names, as_text)
    }

    fn number(&self, names: &[&str]) -> Option<f64> {
        self.resolve(names, as_number)
    }
}

/// Normalize a raw result payload into a [`Song`]
///
/// `fallback_id` (usually the job id) is used when the payload carries no song id.
pub fn normalize(payload: &Value, fallback_id: &str) -> IngestResult<Song> {
    let root = unwrap_envelope(payload)?;
    let shape = PayloadShape::of(root);

    let id = shape
        .resolve(&["song_id"], as_text)
        .or_else(|| root.get("id").and_then(as_text))
        .or_else(|| Some(fallback_id.trim().to_string()).filter(|id| !id.is_empty()))
        .ok_or_else(|| IngestError::Normalization("result has no song identifier".to_string()))?;

    let chords = normalize_chords(root)?;

    let duration = shape
        .number(&["duration"])
        .filter(|d| *d >= 0.0)
        .unwrap_or_else(|| chords.iter().map(Chord::end_time).fold(0.0, f64::max));

    let difficulty = shape
        .number(&["overall_difficulty", "difficulty"])
        .map(|d| d.round().clamp(0.0, u8::MAX as f64) as u8)
        .unwrap_or(DEFAULT_DIFFICULTY);

    let processed_at = shape
        .resolve(&["processed_at"], |v| {
            v.as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        })
        .unwrap_or_else(Utc::now);

    let song = Song {
        id,
        title: shape.string(&["title"]).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        artist: shape.string(&["artist"]).unwrap_or_else(|| DEFAULT_ARTIST.to_string()),
        video_url: shape.string(&["video_url", "source_url"]),
        duration,
        tempo: shape
            .number(&["tempo_bpm", "tempo"])
            .filter(|t| *t > 0.0)
            .unwrap_or(DEFAULT_TEMPO_BPM),
        key: shape
            .string(&["original_key", "key"])
            .unwrap_or_else(|| DEFAULT_KEY.to_string()),
        chords,
        difficulty,
        processed_at,
    };

    tracing::debug!(
        song_id = %song.id,
        shape = match shape {
            PayloadShape::Nested { .. } => "nested",
            PayloadShape::Flat { .. } => "flat",
        },
        chords = song.chords.len(),
        "Normalized result payload"
    );

    Ok(song)
}

/// Copy of `payload` carrying the fields `normalize` could only default or
/// that were filled in afterwards (`processed_at`, `video_url`)
///
/// Normalizing the returned payload again yields `song` unchanged, which is
/// what the result cache relies on. Envelopes are unwrapped; values go into
/// the first lookup layer so they take precedence.
pub fn embed_resolved_fields(payload: &Value, song: &Song) -> Value {
    let Ok(root) = unwrap_envelope(payload) else {
        return payload.clone();
    };

    let mut resolved = Map::new();
    resolved.insert(
        "processed_at".to_string(),
        Value::String(song.processed_at.to_rfc3339()),
    );
    if let Some(url) = &song.video_url {
        resolved.insert("video_url".to_string(), Value::String(url.clone()));
    }

    let mut root = root.clone();
    match root.get_mut("metadata") {
        Some(Value::Object(metadata)) => metadata.extend(resolved),
        _ => root.extend(resolved),
    }
    Value::Object(root)
}

/// Accept `{ "results": {...} }` envelopes as well as bare payloads
fn unwrap_envelope(payload: &Value) -> IngestResult<&Map<String, Value>> {
    let root = payload.as_object().ok_or_else(|| {
        IngestError::Normalization(format!("result payload is not an object: {}", kind(payload)))
    })?;

    let is_bare = root.contains_key("chords") || root.contains_key("metadata");
    match root.get("results").and_then(Value::as_object) {
        Some(inner) if !is_bare => Ok(inner),
        _ => Ok(root),
    }
}

fn normalize_chords(root: &Map<String, Value>) -> IngestResult<Vec<Chord>> {
    let raw = match root.get("chords") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(IngestError::Normalization(format!(
                "chords must be a list, got {}",
                kind(other)
            )))
        }
    };

    let mut chords = raw
        .iter()
        .enumerate()
        .map(|(index, value)| normalize_chord(index, value))
        .collect::<IngestResult<Vec<_>>>()?;

    // Source order is not trusted
    chords.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    Ok(chords)
}

fn normalize_chord(index: usize, value: &Value) -> IngestResult<Chord> {
    let entry = value.as_object().ok_or_else(|| {
        IngestError::Normalization(format!("chord {} is not an object: {}", index, kind(value)))
    })?;

    let name = ["chord", "name"]
        .iter()
        .find_map(|k| entry.get(*k).and_then(as_text))
        .ok_or_else(|| IngestError::Normalization(format!("chord {} has no name", index)))?;

    let start_time = ["start_time", "startTime"]
        .iter()
        .find_map(|k| entry.get(*k).and_then(as_number))
        .unwrap_or(0.0)
        .max(0.0);

    let duration = entry
        .get("duration")
        .and_then(as_number)
        .filter(|d| *d > 0.0)
        .ok_or_else(|| {
            IngestError::Normalization(format!("chord {} ({}) has no positive duration", index, name))
        })?;

    let finger_positions: Vec<FingerPosition> = ["fingerPositions", "finger_positions"]
        .iter()
        .find_map(|k| entry.get(*k).and_then(Value::as_array))
        .map(|positions| {
            positions
                .iter()
                .filter_map(|p| {
                    let parsed = parse_finger_position(p);
                    if parsed.is_none() {
                        tracing::warn!(chord = %name, position = %p, "Skipping malformed finger position");
                    }
                    parsed
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Chord {
        name,
        start_time,
        duration,
        finger_positions,
    })
}

/// `{fret, string, finger?}` or `[fret, string, finger?]`
fn parse_finger_position(value: &Value) -> Option<FingerPosition> {
    let (fret, string, finger) = match value {
        Value::Object(obj) => (
            obj.get("fret").and_then(as_number)?,
            obj.get("string").and_then(as_number)?,
            obj.get("finger").and_then(as_number),
        ),
        Value::Array(items) => (
            items.first().and_then(as_number)?,
            items.get(1).and_then(as_number)?,
            items.get(2).and_then(as_number),
        ),
        _ => return None,
    };

    if !(0.0..=u8::MAX as f64).contains(&fret) || !(0.0..GUITAR_STRINGS as f64).contains(&string) {
        return None;
    }

    Some(FingerPosition {
        fret: fret as u8,
        string: string as u8,
        finger: finger.filter(|f| (1.0..=4.0).contains(f)).map(|f| f as u8),
    })
}

/// Non-empty text; numbers are rendered as text
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite number; numeric strings are accepted
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
