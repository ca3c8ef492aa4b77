use std::collections::BTreeSet;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::validator::MediaSource;

/// Everything a transport needs to move one item.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub item_id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source: MediaSource,
    pub tags: BTreeSet<String>,
    pub description: String,
}

impl TransferRequest {
    /// True if there is metadata worth sending alongside the bytes.
    pub fn has_metadata(&self) -> bool {
        !self.tags.is_empty() || !self.description.is_empty()
    }
}

/// A byte-level progress report for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub item_id: String,
    /// Dispatch attempt the report belongs to.
    pub attempt: u32,
    pub bytes_sent: u64,
    /// `None` when the total is unknown.
    pub bytes_total: Option<u64>,
}

impl TransferProgress {
    /// `round(100 * sent / total)`, clamped. Unknown totals read as 0.
    pub fn percent(&self) -> u8 {
        match self.bytes_total {
            None => 0,
            Some(0) => 100,
            Some(total) => {
                let ratio = self.bytes_sent.min(total) as f64 / total as f64;
                (ratio * 100.0).round() as u8
            }
        }
    }
}

/// Handed to a transport so it can report progress for its item.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    item_id: String,
    attempt: u32,
    tx: UnboundedSender<TransferProgress>,
}

impl ProgressReporter {
    /// Reporter for the first attempt of `item_id`.
    pub fn new(item_id: impl Into<String>, tx: UnboundedSender<TransferProgress>) -> Self {
        Self {
            item_id: item_id.into(),
            attempt: 1,
            tx,
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Report progress. Dropped silently if the scheduler is gone.
    pub fn report(&self, bytes_sent: u64, bytes_total: Option<u64>) {
        let _ = self.tx.send(TransferProgress {
            item_id: self.item_id.clone(),
            attempt: self.attempt,
            bytes_sent,
            bytes_total,
        });
    }
}

/// Why a single transfer failed. Always captured on the item.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("upload aborted")]
    Aborted,

    #[error("failed to read source: {0}")]
    Io(String),

    #[error("credential unavailable: {0}")]
    Credential(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TransportError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, TransportError::Aborted)
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Network(_) => "network",
            TransportError::Server { .. } => "server",
            TransportError::Aborted => "aborted",
            TransportError::Io(_) => "io",
            TransportError::Credential(_) => "credential",
            TransportError::InvalidResponse(_) => "invalid_response",
            TransportError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn progress(sent: u64, total: Option<u64>) -> TransferProgress {
        TransferProgress {
            item_id: "i".to_string(),
            attempt: 1,
            bytes_sent: sent,
            bytes_total: total,
        }
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(progress(0, Some(200)).percent(), 0);
        assert_eq!(progress(1, Some(200)).percent(), 1);
        assert_eq!(progress(1, Some(3)).percent(), 33);
        assert_eq!(progress(2, Some(3)).percent(), 67);
        assert_eq!(progress(200, Some(200)).percent(), 100);
    }

    #[test]
    fn test_percent_edge_cases() {
        assert_eq!(progress(10, None).percent(), 0);
        assert_eq!(progress(0, Some(0)).percent(), 100);
        assert_eq!(progress(500, Some(100)).percent(), 100);
    }

    #[tokio::test]
    async fn test_reporter_sends_progress() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new("item-1", tx);
        reporter.report(5, Some(10));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.item_id, "item-1");
        assert_eq!(received.attempt, 1);
        assert_eq!(received.percent(), 50);

        ProgressReporter::new("item-1", reporter.tx.clone())
            .with_attempt(3)
            .report(1, Some(10));
        assert_eq!(rx.recv().await.unwrap().attempt, 3);
    }

    #[test]
    fn test_reporter_survives_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ProgressReporter::new("x", tx).report(1, Some(2));
    }

    #[test]
    fn test_error_display_and_kind() {
        let err = TransportError::Server {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "server error 500: boom");
        assert_eq!(err.kind(), "server");
        assert!(TransportError::Aborted.is_aborted());
        assert!(!err.is_aborted());
    }
}
