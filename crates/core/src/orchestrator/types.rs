//! Types for the upload orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::validator::RejectReason;

/// Operations the orchestrator refuses. Per-item transfer failures are
/// never reported here; they are recorded on the item.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// `start()` while a session is still active.
    #[error("an upload session is already active")]
    SessionActive,

    /// Item not found.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Invalid item state for operation.
    #[error("invalid item state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// `start()` with nothing to upload.
    #[error("no pending items to upload")]
    NoPendingItems,

    /// The orchestrator was disposed.
    #[error("orchestrator has been disposed")]
    Disposed,
}

/// Per-file result of `enqueue`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    Accepted { name: String, item_id: String },
    Rejected { name: String, reason: RejectReason },
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EnqueueOutcome::Accepted { .. })
    }

    pub fn item_id(&self) -> Option<&str> {
        match self {
            EnqueueOutcome::Accepted { item_id, .. } => Some(item_id),
            EnqueueOutcome::Rejected { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            EnqueueOutcome::Accepted { .. } => None,
            EnqueueOutcome::Rejected { reason, .. } => Some(reason),
        }
    }
}
