use std::sync::Arc;

use serde::Serialize;

use crate::scheduler::SessionSummary;

/// Callback invoked for every orchestrator event.
///
/// Called without any internal lock held, from whichever task produced
/// the event.
pub type UploadEventCallback = Arc<dyn Fn(&UploadEvent) + Send + Sync>;

/// Progress and lifecycle notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UploadEvent {
    SessionStarted {
        total_items: u64,
        total_bytes: u64,
    },
    ItemQueued {
        item_id: String,
        name: String,
    },
    ItemStarted {
        item_id: String,
    },
    ItemProgress {
        item_id: String,
        percent: u8,
        bytes_sent: u64,
        bytes_total: Option<u64>,
    },
    ItemCompleted {
        item_id: String,
        remote_id: String,
    },
    ItemFailed {
        item_id: String,
        error: String,
    },
    ItemRemoved {
        item_id: String,
    },
    SessionFinished {
        summary: SessionSummary,
    },
}

impl UploadEvent {
    /// The serialized `event` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadEvent::SessionStarted { .. } => "session_started",
            UploadEvent::ItemQueued { .. } => "item_queued",
            UploadEvent::ItemStarted { .. } => "item_started",
            UploadEvent::ItemProgress { .. } => "item_progress",
            UploadEvent::ItemCompleted { .. } => "item_completed",
            UploadEvent::ItemFailed { .. } => "item_failed",
            UploadEvent::ItemRemoved { .. } => "item_removed",
            UploadEvent::SessionFinished { .. } => "session_finished",
        }
    }

    /// Item this event refers to, if any.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            UploadEvent::ItemQueued { item_id, .. }
            | UploadEvent::ItemStarted { item_id }
            | UploadEvent::ItemProgress { item_id, .. }
            | UploadEvent::ItemCompleted { item_id, .. }
            | UploadEvent::ItemFailed { item_id, .. }
            | UploadEvent::ItemRemoved { item_id } => Some(item_id),
            UploadEvent::SessionStarted { .. } | UploadEvent::SessionFinished { .. } => None,
        }
    }
}
