//! Overall percentage, counts and ETA derived from item state.
//!
//! The overall percentage is an unweighted mean of per-item percentages,
//! not a byte-weighted one: a single large file moves it as much as a
//! small one.
//!
//! Inside a session the mean runs over attempts rather than items. A
//! settled attempt keeps its 100 even if the item is later retried or
//! cleared, so the figure only goes down when new work is admitted
//! (a late enqueue or a retry adds an attempt at 0).

use serde::Serialize;

use crate::queue::{ItemStatus, UploadItem, UploadQueue};
use crate::scheduler::UploadSession;

/// Point-in-time view of batch progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub overall_percent: u8,
    pub total_items: u64,
    pub completed_items: u64,
    pub failed_items: u64,
    pub uploading_items: u64,
    pub pending_items: u64,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub elapsed_secs: f64,
    pub eta_secs: Option<u64>,
    pub active: bool,
}

/// Percentage an item contributes to the mean. Terminal items count as done.
pub fn effective_percent(item: &UploadItem) -> u8 {
    match item.status() {
        ItemStatus::Pending => 0,
        ItemStatus::Uploading => item.progress_percent(),
        ItemStatus::Completed | ItemStatus::Failed => 100,
    }
}

/// `elapsed / completed * total - elapsed`, or `None` before the first completion.
pub fn eta_secs(elapsed_secs: f64, completed_items: u64, total_items: u64) -> Option<u64> {
    if completed_items == 0 {
        return None;
    }
    let projected = elapsed_secs / completed_items as f64 * total_items as f64;
    Some((projected - elapsed_secs).max(0.0).round() as u64)
}

fn session_percent(batch: &[&UploadItem], session: &UploadSession) -> u8 {
    if session.total_items == 0 {
        return 0;
    }
    let settled = (session.completed_items + session.failed_items) * 100;
    let uploading: u64 = batch
        .iter()
        .filter(|i| i.status() == ItemStatus::Uploading)
        .map(|i| i.progress_percent() as u64)
        .sum();
    let mean = (settled + uploading) as f64 / session.total_items as f64;
    mean.round().min(100.0) as u8
}

/// Build a snapshot over the session's batch, or the whole queue when no
/// session has run yet.
pub fn aggregate(queue: &UploadQueue, session: Option<&UploadSession>) -> ProgressSnapshot {
    let items: Vec<&UploadItem> = match session {
        Some(session) => session
            .batch()
            .iter()
            .filter_map(|id| queue.get(id))
            .collect(),
        None => queue.iter().collect(),
    };

    let overall_percent = match session {
        Some(session) => session_percent(&items, session),
        None if items.is_empty() => 0,
        None => {
            let sum: u64 = items.iter().map(|i| effective_percent(i) as u64).sum();
            (sum as f64 / items.len() as f64).round() as u8
        }
    };
    let count = |status: ItemStatus| items.iter().filter(|i| i.status() == status).count() as u64;

    match session {
        Some(session) => {
            let elapsed_secs = session.elapsed().as_secs_f64();
            ProgressSnapshot {
                overall_percent,
                total_items: session.total_items,
                completed_items: session.completed_items,
                failed_items: session.failed_items,
                uploading_items: count(ItemStatus::Uploading),
                pending_items: count(ItemStatus::Pending),
                total_bytes: session.total_bytes,
                transferred_bytes: session.transferred_bytes,
                elapsed_secs,
                eta_secs: if session.active {
                    eta_secs(elapsed_secs, session.completed_items, session.total_items)
                } else {
                    None
                },
                active: session.active,
            }
        }
        None => ProgressSnapshot {
            overall_percent,
            total_items: items.len() as u64,
            completed_items: count(ItemStatus::Completed),
            failed_items: count(ItemStatus::Failed),
            uploading_items: count(ItemStatus::Uploading),
            pending_items: count(ItemStatus::Pending),
            total_bytes: items.iter().map(|i| i.size_bytes()).sum(),
            transferred_bytes: 0,
            elapsed_secs: 0.0,
            eta_secs: None,
            active: false,
        },
    }
}
