//! Song source references (YouTube link or uploaded audio)

use crate::error::{IngestError, IngestResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Where the audio to analyze comes from
#[derive(Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Video link the server downloads itself
    YouTube { url: String },
    /// Audio file uploaded with the request
    Upload { file_name: String, bytes: Vec<u8> },
}

impl SourceRef {
    /// Validated video link (absolute http/https URL)
    pub fn youtube(url: impl Into<String>) -> IngestResult<Self> {
        let url = url.into().trim().to_string();
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| IngestError::InvalidSource(format!("{}: {}", url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IngestError::InvalidSource(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(IngestError::InvalidSource(format!("{}: missing host", url)));
        }

        Ok(SourceRef::YouTube { url })
    }

    /// Uploaded audio held in memory
    pub fn upload(file_name: impl Into<String>, bytes: Vec<u8>) -> IngestResult<Self> {
        let file_name = file_name.into();
        if bytes.is_empty() {
            return Err(IngestError::InvalidSource(format!("{} is empty", file_name)));
        }
        Ok(SourceRef::Upload { file_name, bytes })
    }

    /// Read an audio file from disk for upload
    pub async fn from_file(path: &Path) -> IngestResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| IngestError::InvalidSource(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self::upload(file_name, bytes)
    }

    /// Stable identity of the source, used to coalesce identical requests
    pub fn dedup_key(&self) -> String {
        match self {
            SourceRef::YouTube { url } => format!("url:{}", url),
            SourceRef::Upload { bytes, .. } => format!("sha256:{:x}", Sha256::digest(bytes)),
        }
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self {
            SourceRef::YouTube { url } => url.clone(),
            SourceRef::Upload { file_name, .. } => file_name.clone(),
        }
    }

    /// Video link, for YouTube sources
    pub fn video_url(&self) -> Option<&str> {
        match self {
            SourceRef::YouTube { url } => Some(url),
            SourceRef::Upload { .. } => None,
        }
    }

    /// MIME type sent with an upload, guessed from the file extension
    pub fn mime_type(&self) -> &'static str {
        let SourceRef::Upload { file_name, .. } = self else {
            return "text/uri-list";
        };
        let ext = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "m4a" | "mp4" | "aac" => "audio/mp4",
            "flac" => "audio/flac",
            "ogg" | "opus" => "audio/ogg",
            _ => "application/octet-stream",
        }
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::YouTube { url } => f.debug_struct("YouTube").field("url", url).finish(),
            SourceRef::Upload { file_name, bytes } => f
                .debug_struct("Upload")
                .field("file_name", file_name)
                .field("bytes", &bytes.len())
                .finish(),
        }
    }
}
