//! Types for file validation.

use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where an item's bytes come from. Immutable once enqueued.
#[derive(Clone)]
pub enum MediaSource {
    /// Streamed from a local file at transfer time.
    Path(PathBuf),
    /// Bytes already held in memory.
    Memory(Bytes),
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            MediaSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

/// A raw file selected for upload, before validation.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub source: MediaSource,
    /// Initial tags, carried onto the queued item.
    pub tags: BTreeSet<String>,
    /// Initial description, carried onto the queued item.
    pub description: String,
}

impl FileDescriptor {
    /// Build a descriptor for a local file, reading its size from disk and
    /// inferring the MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            mime_type: mime_type_for_path(path).to_string(),
            name,
            size_bytes: metadata.len(),
            source: MediaSource::Path(path.to_path_buf()),
            tags: BTreeSet::new(),
            description: String::new(),
        })
    }

    /// Build a descriptor for in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            size_bytes: data.len() as u64,
            mime_type: mime_type.into(),
            source: MediaSource::Memory(data),
            tags: BTreeSet::new(),
            description: String::new(),
        }
    }

    /// Override the inferred MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Attach tags. Surrounding whitespace is trimmed and blank tags dropped.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.extend(
            tags.into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .filter(|t| !t.is_empty()),
        );
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Infer a MIME type from a file extension.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Why a file was refused before reaching the queue.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("unsupported media type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("file too large: {size_bytes} bytes (limit {max_bytes})")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("queue is full ({max_items} items)")]
    QueueFull { max_items: usize },
}

impl RejectReason {
    /// Stable short code, used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::UnsupportedType { .. } => "unsupported_type",
            RejectReason::TooLarge { .. } => "too_large",
            RejectReason::QueueFull { .. } => "queue_full",
        }
    }
}
