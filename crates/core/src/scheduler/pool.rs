//! The scheduler loop.
//!
//! One task per session owns a `JoinSet` of at most `max_concurrent`
//! transfers. Whenever a transfer resolves its slot is refilled with the
//! oldest `Pending` item, so a slow item never holds back the ones queued
//! behind it. Transfer outcomes are recorded on the item and never abort
//! the loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::progress::UploadEvent;
use crate::queue::ItemStatus;
use crate::transport::{ProgressReporter, TransferProgress, TransferRequest, TransportError};

use super::state::Shared;
use super::types::{SessionSummary, UploadSession};

struct TransferOutcome {
    item_id: String,
    size_bytes: u64,
    result: Result<String, TransportError>,
    duration: Duration,
}

/// Drains the queue for one session.
pub struct BatchScheduler {
    shared: Arc<Shared>,
    in_flight: JoinSet<TransferOutcome>,
    progress_tx: UnboundedSender<TransferProgress>,
    progress_rx: UnboundedReceiver<TransferProgress>,
}

impl BatchScheduler {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        Self {
            shared,
            in_flight: JoinSet::new(),
            progress_tx,
            progress_rx,
        }
    }

    /// Run until no item is `Pending` (or the session was cancelled) and
    /// every in-flight transfer has reported back.
    pub async fn run(mut self) -> SessionSummary {
        debug!(
            max_concurrent = self.shared.config.max_concurrent,
            "Scheduler started"
        );
        loop {
            self.fill_slots().await;

            if self.in_flight.is_empty() {
                if let Some(summary) = self.try_finish().await {
                    return summary;
                }
                // Pending work that could not be dispatched: park until the
                // queue or session changes.
                self.shared.wake.notified().await;
                continue;
            }

            tokio::select! {
                Some(joined) = self.in_flight.join_next() => self.apply_outcome(joined).await,
                Some(progress) = self.progress_rx.recv() => self.apply_progress(progress).await,
                _ = self.shared.wake.notified() => {}
            }
        }
    }

    /// Dispatch `Pending` items into free slots, oldest first.
    async fn fill_slots(&mut self) {
        let mut started = Vec::new();
        let shared = self.shared.clone();
        {
            let mut state = shared.state.lock().await;
            let token = match (&state.session_token, state.session_active()) {
                (Some(token), true) => token.clone(),
                _ => return,
            };

            while self.in_flight.len() < self.shared.config.max_concurrent {
                let Some(item) = state.queue.next_pending_mut() else {
                    break;
                };
                if let Err(e) = item.begin_upload() {
                    warn!(item_id = %item.id(), error = %e, "Cannot dispatch item");
                    break;
                }

                let attempt = item.attempt();
                let request = TransferRequest {
                    item_id: item.id().to_string(),
                    name: item.name().to_string(),
                    mime_type: item.mime_type().to_string(),
                    size_bytes: item.size_bytes(),
                    source: item.source().clone(),
                    tags: item.tags.clone(),
                    description: item.description.clone(),
                };
                info!(item_id = %request.item_id, name = %request.name, attempt, "Dispatching upload");
                started.push(UploadEvent::ItemStarted {
                    item_id: request.item_id.clone(),
                });
                self.spawn_transfer(request, attempt, token.child_token());
            }
        }
        self.shared.emit_all(started);
    }

    fn spawn_transfer(
        &mut self,
        request: TransferRequest,
        attempt: u32,
        cancel: tokio_util::sync::CancellationToken,
    ) {
        let transport = self.shared.transport.clone();
        let reporter = ProgressReporter::new(request.item_id.clone(), self.progress_tx.clone())
            .with_attempt(attempt);
        let item_id = request.item_id.clone();
        let size_bytes = request.size_bytes;

        metrics::UPLOADS_IN_FLIGHT.inc();
        self.in_flight.spawn(async move {
            let started = Instant::now();
            let result = AssertUnwindSafe(transport.transfer(request, reporter, cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(TransportError::Internal("transport panicked".to_string())));
            TransferOutcome {
                item_id,
                size_bytes,
                result,
                duration: started.elapsed(),
            }
        });
    }

    async fn apply_outcome(&mut self, joined: Result<TransferOutcome, JoinError>) {
        metrics::UPLOADS_IN_FLIGHT.dec();
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Transfer task did not complete");
                return;
            }
        };

        let label = match &outcome.result {
            Ok(_) => "completed",
            Err(e) if e.is_aborted() => "aborted",
            Err(_) => "failed",
        };
        metrics::UPLOADS_TOTAL.with_label_values(&[label]).inc();
        metrics::UPLOAD_DURATION
            .with_label_values(&[label])
            .observe(outcome.duration.as_secs_f64());

        let event = {
            let mut state = self.shared.state.lock().await;
            let state = &mut *state;
            let item = state.queue.get_mut(&outcome.item_id);

            match outcome.result {
                Ok(remote_id) => {
                    if let Some(item) = item {
                        if let Err(e) = item.complete(remote_id.clone()) {
                            warn!(item_id = %outcome.item_id, error = %e, "Dropping stale completion");
                        }
                    }
                    if let Some(session) = state.session.as_mut() {
                        session.record_success(outcome.size_bytes);
                    }
                    metrics::UPLOAD_BYTES.inc_by(outcome.size_bytes);
                    info!(
                        item_id = %outcome.item_id,
                        %remote_id,
                        duration_ms = outcome.duration.as_millis() as u64,
                        "Upload completed"
                    );
                    UploadEvent::ItemCompleted {
                        item_id: outcome.item_id,
                        remote_id,
                    }
                }
                Err(error) => {
                    let message = error.to_string();
                    if let Some(item) = item {
                        if let Err(e) = item.fail(message.clone()) {
                            warn!(item_id = %outcome.item_id, error = %e, "Dropping stale failure");
                        }
                    }
                    if let Some(session) = state.session.as_mut() {
                        session.record_failure();
                    }
                    warn!(item_id = %outcome.item_id, kind = error.kind(), error = %message, "Upload failed");
                    UploadEvent::ItemFailed {
                        item_id: outcome.item_id,
                        error: message,
                    }
                }
            }
        };
        self.shared.emit(&event);
    }

    /// Reports left over from an earlier attempt of a retried item are dropped.
    async fn apply_progress(&mut self, progress: TransferProgress) {
        let percent = progress.percent();
        let changed = {
            let mut state = self.shared.state.lock().await;
            match state.queue.get_mut(&progress.item_id) {
                Some(item) if item.attempt() == progress.attempt => item.record_progress(percent),
                Some(item) => {
                    debug!(
                        item_id = %progress.item_id,
                        stale = progress.attempt,
                        current = item.attempt(),
                        "Dropping progress from earlier attempt"
                    );
                    false
                }
                None => false,
            }
        };
        if changed {
            self.shared.emit(&UploadEvent::ItemProgress {
                item_id: progress.item_id,
                percent,
                bytes_sent: progress.bytes_sent,
                bytes_total: progress.bytes_total,
            });
        }
    }

    /// Close the session if there is nothing left to dispatch.
    async fn try_finish(&mut self) -> Option<SessionSummary> {
        let summary = {
            let mut state = self.shared.state.lock().await;
            if state.session_active() && state.queue.has_pending() {
                return None;
            }

            // With the pool empty nothing can legitimately be uploading.
            let mut orphaned = 0;
            for item in state.queue.iter_mut() {
                if item.status() == ItemStatus::Uploading {
                    let _ = item.fail(TransportError::Aborted.to_string());
                    orphaned += 1;
                }
            }

            let session = state.session.get_or_insert_with(UploadSession::new);
            for _ in 0..orphaned {
                session.record_failure();
            }
            session.finish();
            let summary = session.summary();

            state.session_token = None;
            state.last_summary = Some(summary.clone());
            summary
        };

        let outcome = if summary.cancelled {
            "cancelled"
        } else {
            "finished"
        };
        metrics::SESSIONS_TOTAL.with_label_values(&[outcome]).inc();
        info!(
            total = summary.total_items,
            completed = summary.completed_items,
            failed = summary.failed_items,
            cancelled = summary.cancelled,
            elapsed_secs = summary.elapsed_secs,
            "Upload session finished"
        );
        self.shared.emit(&UploadEvent::SessionFinished {
            summary: summary.clone(),
        });
        self.shared.running.send_replace(false);
        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::UploadItem;
    use crate::testing::{fixtures, MockTransport};
    use tokio_util::sync::CancellationToken;

    async fn shared_with(
        transport: Arc<MockTransport>,
        max_concurrent: usize,
        items: usize,
    ) -> Arc<Shared> {
        let shared = Arc::new(Shared::new(fixtures::batch_config(max_concurrent), transport));
        {
            let mut state = shared.state.lock().await;
            let mut session = UploadSession::new();
            for i in 0..items {
                let item =
                    UploadItem::new(fixtures::image(&format!("img-{}.png", i), 100), None);
                session.admit(item.id(), item.size_bytes());
                state.queue.push(item).unwrap();
            }
            state.session = Some(session);
            state.session_token = Some(CancellationToken::new());
            shared.running.send_replace(true);
        }
        shared
    }

    #[tokio::test]
    async fn test_drains_all_items() {
        let transport = Arc::new(MockTransport::new());
        let shared = shared_with(transport.clone(), 2, 5).await;

        let summary = BatchScheduler::new(shared.clone()).run().await;

        assert_eq!(summary.total_items, 5);
        assert_eq!(summary.completed_items, 5);
        assert_eq!(summary.failed_items, 0);
        assert_eq!(transport.calls().await.len(), 5);
        assert!(!shared.is_running());
    }

    #[tokio::test]
    async fn test_respects_concurrency_bound() {
        let transport = Arc::new(MockTransport::new().with_delay(Duration::from_millis(20)));
        let shared = shared_with(transport.clone(), 3, 10).await;

        BatchScheduler::new(shared).run().await;

        assert!(transport.max_in_flight() <= 3);
        assert_eq!(transport.max_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let transport = Arc::new(MockTransport::new());
        transport
            .fail_name(
                "img-0.png",
                TransportError::Server {
                    status: 500,
                    message: "boom".to_string(),
                },
            )
            .await;
        let shared = shared_with(transport.clone(), 1, 4).await;

        let summary = BatchScheduler::new(shared.clone()).run().await;

        assert_eq!(summary.completed_items, 3);
        assert_eq!(summary.failed_items, 1);
        let state = shared.state.lock().await;
        let failed: Vec<_> = state
            .queue
            .iter()
            .filter(|i| i.status() == ItemStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error_message(), Some("server error 500: boom"));
    }

    #[tokio::test]
    async fn test_idle_scheduler_parks_until_woken() {
        let transport = Arc::new(MockTransport::new());
        // No slots: the item stays pending and nothing is dispatched
        let shared = shared_with(transport.clone(), 0, 1).await;

        let handle = tokio::spawn(BatchScheduler::new(shared.clone()).run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        {
            let mut state = shared.state.lock().await;
            let state = &mut *state;
            state.session.as_mut().unwrap().cancel();
        }
        shared.wake.notify_one();

        let summary = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler should finish once woken")
            .unwrap();
        assert!(summary.cancelled);
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_progress_from_earlier_attempt_is_dropped() {
        let shared = shared_with(Arc::new(MockTransport::new()), 1, 1).await;
        let item_id = {
            let mut state = shared.state.lock().await;
            let item = state.queue.next_pending_mut().unwrap();
            item.begin_upload().unwrap();
            item.fail("reset").unwrap();
            item.reset_for_retry().unwrap();
            item.begin_upload().unwrap();
            assert_eq!(item.attempt(), 2);
            item.id().to_string()
        };

        let mut scheduler = BatchScheduler::new(shared.clone());
        let report = |attempt: u32, sent: u64| TransferProgress {
            item_id: item_id.clone(),
            attempt,
            bytes_sent: sent,
            bytes_total: Some(100),
        };
        scheduler.apply_progress(report(1, 90)).await;
        assert_eq!(
            shared.state.lock().await.queue.get(&item_id).unwrap().progress_percent(),
            0
        );

        scheduler.apply_progress(report(2, 25)).await;
        assert_eq!(
            shared.state.lock().await.queue.get(&item_id).unwrap().progress_percent(),
            25
        );
    }

    #[tokio::test]
    async fn test_panicking_transport_fails_item() {
        let transport = Arc::new(MockTransport::new());
        transport.panic_name("img-1.png").await;
        let shared = shared_with(transport, 2, 3).await;

        let summary = BatchScheduler::new(shared).run().await;

        assert_eq!(summary.completed_items, 2);
        assert_eq!(summary.failed_items, 1);
    }
}
