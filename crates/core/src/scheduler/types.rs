//! Session accounting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Counters for one `start()` invocation.
///
/// Outcome counters only grow. Items retried while the session is active
/// are admitted again as new attempts; a pending item removed from the
/// queue is withdrawn so `completed + failed` still reaches `total`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSession {
    pub total_items: u64,
    pub completed_items: u64,
    pub failed_items: u64,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub cancelled: bool,
    #[serde(skip)]
    batch: Vec<String>,
    #[serde(skip)]
    started: Instant,
    #[serde(skip)]
    finished: Option<Instant>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            total_items: 0,
            completed_items: 0,
            failed_items: 0,
            total_bytes: 0,
            transferred_bytes: 0,
            started_at: Utc::now(),
            finished_at: None,
            active: true,
            cancelled: false,
            batch: Vec::new(),
            started: Instant::now(),
            finished: None,
        }
    }

    /// Count one upload attempt of `item_id` against this session.
    pub fn admit(&mut self, item_id: &str, size_bytes: u64) {
        self.total_items += 1;
        self.total_bytes += size_bytes;
        if !self.batch.iter().any(|id| id == item_id) {
            self.batch.push(item_id.to_string());
        }
    }

    /// Take back one not-yet-dispatched attempt of `item_id`. Returns false
    /// if the item is not part of this session.
    pub fn withdraw(&mut self, item_id: &str, size_bytes: u64) -> bool {
        let Some(pos) = self.batch.iter().position(|id| id == item_id) else {
            return false;
        };
        self.batch.remove(pos);
        self.total_items = self.total_items.saturating_sub(1);
        self.total_bytes = self.total_bytes.saturating_sub(size_bytes);
        true
    }

    /// Distinct items admitted so far, in admission order.
    pub fn batch(&self) -> &[String] {
        &self.batch
    }

    pub fn record_success(&mut self, size_bytes: u64) {
        self.completed_items += 1;
        self.transferred_bytes += size_bytes;
    }

    pub fn record_failure(&mut self) {
        self.failed_items += 1;
    }

    /// Stop further dispatches. In-flight transfers still report back.
    pub fn cancel(&mut self) {
        self.active = false;
        self.cancelled = true;
    }

    pub fn finish(&mut self) {
        self.active = false;
        if self.finished.is_none() {
            self.finished = Some(Instant::now());
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self.finished {
            Some(finished) => finished.duration_since(self.started),
            None => self.started.elapsed(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total_items: self.total_items,
            completed_items: self.completed_items,
            failed_items: self.failed_items,
            total_bytes: self.total_bytes,
            transferred_bytes: self.transferred_bytes,
            cancelled: self.cancelled,
            started_at: self.started_at,
            finished_at: self.finished_at,
            elapsed_secs: self.elapsed().as_secs_f64(),
        }
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

/// What a finished session reports back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_items: u64,
    pub completed_items: u64,
    pub failed_items: u64,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_secs: f64,
}
