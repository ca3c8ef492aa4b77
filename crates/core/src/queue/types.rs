//! Upload item and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::preview::PreviewHandle;
use crate::validator::{FileDescriptor, MediaSource};

/// Lifecycle status of an upload item.
///
/// `Pending -> Uploading -> {Completed, Failed}`; `Failed -> Pending` on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
}

impl ItemStatus {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Uploading => "uploading",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }

    /// Returns true if no further automatic transition happens from here.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }

    /// Tags and description may only change before an upload succeeds or starts.
    pub fn is_editable(&self) -> bool {
        matches!(self, ItemStatus::Pending | ItemStatus::Failed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A disallowed status transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot move item from {from} to {to}")]
pub struct TransitionError {
    pub from: ItemStatus,
    pub to: ItemStatus,
}

/// One file in the upload queue.
#[derive(Debug)]
pub struct UploadItem {
    id: String,
    source: MediaSource,
    name: String,
    size_bytes: u64,
    mime_type: String,
    pub tags: BTreeSet<String>,
    pub description: String,
    progress_percent: u8,
    status: ItemStatus,
    attempt: u32,
    remote_id: Option<String>,
    error_message: Option<String>,
    preview: Option<PreviewHandle>,
    selected: bool,
    enqueued_at: DateTime<Utc>,
}

impl UploadItem {
    /// Create a pending item from a validated descriptor.
    pub fn new(file: FileDescriptor, preview: Option<PreviewHandle>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: file.source,
            name: file.name,
            size_bytes: file.size_bytes,
            mime_type: file.mime_type,
            tags: file.tags,
            description: file.description,
            progress_percent: 0,
            status: ItemStatus::Pending,
            attempt: 0,
            remote_id: None,
            error_message: None,
            preview,
            selected: false,
            enqueued_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Number of times this item has been dispatched. 0 until the first upload.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview.as_ref().map(|p| p.url())
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// `Pending -> Uploading`. Starts a new attempt, resets progress and
    /// clears any stale error.
    pub fn begin_upload(&mut self) -> Result<(), TransitionError> {
        self.transition(ItemStatus::Pending, ItemStatus::Uploading)?;
        self.attempt += 1;
        self.progress_percent = 0;
        self.error_message = None;
        Ok(())
    }

    /// Record transfer progress. Ignored unless uploading; never decreases.
    ///
    /// Returns true if the stored percentage changed.
    pub fn record_progress(&mut self, percent: u8) -> bool {
        if self.status != ItemStatus::Uploading {
            return false;
        }
        let percent = percent.min(100);
        if percent > self.progress_percent {
            self.progress_percent = percent;
            true
        } else {
            false
        }
    }

    /// `Uploading -> Completed`.
    pub fn complete(&mut self, remote_id: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(ItemStatus::Uploading, ItemStatus::Completed)?;
        self.progress_percent = 100;
        self.remote_id = Some(remote_id.into());
        Ok(())
    }

    /// `Uploading -> Failed`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(ItemStatus::Uploading, ItemStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// `Failed -> Pending`. Clears the error and resets progress.
    pub fn reset_for_retry(&mut self) -> Result<(), TransitionError> {
        self.transition(ItemStatus::Failed, ItemStatus::Pending)?;
        self.error_message = None;
        self.progress_percent = 0;
        Ok(())
    }

    /// Release the preview handle, if any. Safe to call more than once.
    pub fn release_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.release();
        }
    }

    /// Read-only copy for consumers.
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            size_bytes: self.size_bytes,
            mime_type: self.mime_type.clone(),
            tags: self.tags.iter().cloned().collect(),
            description: self.description.clone(),
            progress_percent: self.progress_percent,
            status: self.status,
            remote_id: self.remote_id.clone(),
            error_message: self.error_message.clone(),
            preview_url: self.preview_url().map(String::from),
            selected: self.selected,
            enqueued_at: self.enqueued_at,
        }
    }

    fn transition(&mut self, from: ItemStatus, to: ItemStatus) -> Result<(), TransitionError> {
        if self.status != from {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Serializable, read-only view of an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemSnapshot {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub tags: Vec<String>,
    pub description: String,
    pub progress_percent: u8,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub selected: bool,
    pub enqueued_at: DateTime<Utc>,
}
