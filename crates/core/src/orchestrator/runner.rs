//! Upload orchestrator implementation.
//!
//! All queue and session mutations go through one mutex in [`Shared`]; the
//! scheduler task is the only place transfers are started.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::MutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::metrics;
use crate::preview::PreviewGenerator;
use crate::progress::{aggregate, ProgressSnapshot, UploadEvent, UploadEventCallback};
use crate::queue::{ItemSnapshot, ItemStatus, UploadItem};
use crate::scheduler::{BatchScheduler, BatchState, SessionSummary, Shared, UploadSession};
use crate::transport::UploadTransport;
use crate::validator::{self, FileDescriptor};

use super::config::BatchConfig;
use super::types::{EnqueueOutcome, OrchestratorError};

/// The upload orchestrator - validates, queues and uploads media files.
pub struct UploadOrchestrator {
    shared: Arc<Shared>,
    previews: Option<Arc<dyn PreviewGenerator>>,
}

impl UploadOrchestrator {
    /// Create a new orchestrator. Without a preview generator items carry
    /// no preview.
    ///
    /// Fails if `config` has a zero bound.
    pub fn new(
        config: BatchConfig,
        transport: Arc<dyn UploadTransport>,
        previews: Option<Arc<dyn PreviewGenerator>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            transport = transport.name(),
            max_concurrent = config.max_concurrent,
            max_items = config.max_items,
            "Creating upload orchestrator"
        );
        Ok(Self {
            shared: Arc::new(Shared::new(config, transport)),
            previews,
        })
    }

    /// Receive every [`UploadEvent`] through `callback`.
    pub fn with_event_callback(self, callback: UploadEventCallback) -> Self {
        self.shared.set_event_callback(callback);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.shared.config
    }

    /// Validate and append files. Each file gets its own outcome; rejected
    /// files never reach the queue.
    pub async fn enqueue(
        &self,
        files: Vec<FileDescriptor>,
    ) -> Result<Vec<EnqueueOutcome>, OrchestratorError> {
        let mut outcomes = Vec::with_capacity(files.len());

        for file in files {
            {
                let state = self.lock_live().await?;
                if let Err(reason) = validator::validate(&file, &self.shared.config, state.queue.len())
                {
                    metrics::VALIDATION_REJECTIONS
                        .with_label_values(&[reason.code()])
                        .inc();
                    warn!(name = %file.name, %reason, "Rejected file");
                    outcomes.push(EnqueueOutcome::Rejected {
                        name: file.name,
                        reason,
                    });
                    continue;
                }
            }

            let preview = match &self.previews {
                Some(generator) => match generator.generate(&file).await {
                    Ok(preview) => preview,
                    Err(e) => {
                        warn!(name = %file.name, error = %e, "Preview generation failed");
                        None
                    }
                },
                None => None,
            };

            let name = file.name.clone();
            let item = UploadItem::new(file, preview);
            let item_id = item.id().to_string();
            let size_bytes = item.size_bytes();

            {
                let mut state = self.lock_live().await?;
                if let Err(reason) = state.queue.push(item) {
                    metrics::VALIDATION_REJECTIONS
                        .with_label_values(&[reason.code()])
                        .inc();
                    warn!(%name, %reason, "Rejected file");
                    outcomes.push(EnqueueOutcome::Rejected { name, reason });
                    continue;
                }
                if let Some(session) = state.session.as_mut().filter(|s| s.active) {
                    session.admit(&item_id, size_bytes);
                    self.shared.wake.notify_one();
                }
            }

            info!(%item_id, %name, size_bytes, "Enqueued file");
            self.shared.emit(&UploadEvent::ItemQueued {
                item_id: item_id.clone(),
                name: name.clone(),
            });
            outcomes.push(EnqueueOutcome::Accepted { name, item_id });
        }

        Ok(outcomes)
    }

    /// Start a session over every `Pending` item.
    ///
    /// If a cancelled session is still draining its in-flight transfers,
    /// waits for it first.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        loop {
            let state = self.lock_live().await?;
            if state.session_active() {
                return Err(OrchestratorError::SessionActive);
            }
            if self.shared.is_running() {
                drop(state);
                debug!("Waiting for previous session to drain");
                self.shared.wait_idle().await;
                continue;
            }
            return self.begin_session(state);
        }
    }

    /// `start()` followed by `wait_for_session()`.
    pub async fn run(&self) -> Result<SessionSummary, OrchestratorError> {
        self.start().await?;
        self.wait_for_session()
            .await
            .ok_or(OrchestratorError::NoPendingItems)
    }

    /// Wait until no session is running and return the last summary, if
    /// any session ever ran.
    pub async fn wait_for_session(&self) -> Option<SessionSummary> {
        self.shared.wait_idle().await;
        self.shared.state.lock().await.last_summary.clone()
    }

    /// Move a `Failed` item back to `Pending`. Starts a session if none is
    /// active.
    pub async fn retry(&self, item_id: &str) -> Result<(), OrchestratorError> {
        let mut state = self.lock_live().await?;
        let item = state
            .queue
            .get_mut(item_id)
            .ok_or_else(|| OrchestratorError::ItemNotFound(item_id.to_string()))?;
        if item.status() != ItemStatus::Failed {
            return Err(OrchestratorError::InvalidState {
                expected: ItemStatus::Failed.to_string(),
                actual: item.status().to_string(),
            });
        }
        reset(item)?;
        info!(%item_id, "Retrying item");
        let size_bytes = item.size_bytes();

        self.readmit_or_start(state, vec![(item_id.to_string(), size_bytes)])
            .await
    }

    /// Retry every `Failed` item. Returns how many were reset; with none,
    /// nothing is started.
    pub async fn retry_all(&self) -> Result<usize, OrchestratorError> {
        let mut state = self.lock_live().await?;
        let mut retried = Vec::new();
        for item in state
            .queue
            .iter_mut()
            .filter(|i| i.status() == ItemStatus::Failed)
        {
            reset(item)?;
            retried.push((item.id().to_string(), item.size_bytes()));
        }
        if retried.is_empty() {
            return Ok(0);
        }

        let count = retried.len();
        info!(count, "Retrying all failed items");
        self.readmit_or_start(state, retried).await?;
        Ok(count)
    }

    /// Stop dispatching and abort in-flight transfers. `Pending` items are
    /// left for a later `start()`. Returns false if no session was active.
    pub async fn cancel(&self) -> Result<bool, OrchestratorError> {
        let mut state = self.lock_live().await?;
        Ok(self.cancel_locked(&mut state))
    }

    /// Cancel, release every preview and refuse further operations.
    pub async fn dispose(&self) {
        let mut state = self.shared.state.lock().await;
        if state.disposed {
            return;
        }
        self.cancel_locked(&mut state);
        let released = state.queue.drain().len();
        state.disposed = true;
        info!(released, "Orchestrator disposed");
    }

    pub async fn is_disposed(&self) -> bool {
        self.shared.state.lock().await.disposed
    }

    /// Remove one item and release its preview. Uploading items cannot be
    /// removed.
    pub async fn remove_item(&self, item_id: &str) -> Result<(), OrchestratorError> {
        {
            let mut state = self.lock_live().await?;
            let item = state
                .queue
                .get(item_id)
                .ok_or_else(|| OrchestratorError::ItemNotFound(item_id.to_string()))?;
            if item.status() == ItemStatus::Uploading {
                return Err(OrchestratorError::InvalidState {
                    expected: "pending, completed or failed".to_string(),
                    actual: item.status().to_string(),
                });
            }
            if let Some(mut item) = state.queue.remove(item_id) {
                item.release_preview();
                withdraw_pending(&mut state, &item);
            }
        }
        info!(%item_id, "Removed item");
        self.shared.emit(&UploadEvent::ItemRemoved {
            item_id: item_id.to_string(),
        });
        Ok(())
    }

    /// Remove every `Completed` item. Returns how many were removed.
    pub async fn clear_completed(&self) -> Result<usize, OrchestratorError> {
        let removed = {
            let mut state = self.lock_live().await?;
            state.queue.clear_completed()
        };
        info!(count = removed.len(), "Cleared completed items");
        self.emit_removed(&removed);
        Ok(removed.len())
    }

    pub async fn set_description(
        &self,
        item_id: &str,
        description: impl Into<String>,
    ) -> Result<(), OrchestratorError> {
        let description = description.into();
        self.edit(item_id, |item| item.description = description)
            .await
    }

    pub async fn add_tag(&self, item_id: &str, tag: &str) -> Result<(), OrchestratorError> {
        let tag = tag.trim().to_string();
        self.edit(item_id, |item| {
            if !tag.is_empty() {
                item.tags.insert(tag);
            }
        })
        .await
    }

    pub async fn remove_tag(&self, item_id: &str, tag: &str) -> Result<(), OrchestratorError> {
        self.edit(item_id, |item| {
            item.tags.remove(tag.trim());
        })
        .await
    }

    /// Set the selection flag on `ids`. Returns how many items matched.
    pub async fn select(&self, ids: &[String], selected: bool) -> Result<usize, OrchestratorError> {
        let ids: BTreeSet<String> = ids.iter().cloned().collect();
        let mut state = self.lock_live().await?;
        Ok(state.queue.select(&ids, selected))
    }

    pub async fn select_all(&self, selected: bool) -> Result<(), OrchestratorError> {
        let mut state = self.lock_live().await?;
        state.queue.select_all(selected);
        Ok(())
    }

    pub async fn selected_ids(&self) -> Vec<String> {
        self.shared.state.lock().await.queue.selected_ids()
    }

    /// Add `tag` to every selected item that can still be edited. Returns
    /// how many were tagged.
    pub async fn tag_selected(&self, tag: &str) -> Result<usize, OrchestratorError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(0);
        }
        let mut state = self.lock_live().await?;
        let mut tagged = 0;
        for item in state
            .queue
            .iter_mut()
            .filter(|i| i.is_selected() && i.status().is_editable())
        {
            item.tags.insert(tag.to_string());
            tagged += 1;
        }
        debug!(%tag, tagged, "Tagged selected items");
        Ok(tagged)
    }

    /// Remove every selected item that is not uploading. Returns how many
    /// were removed.
    pub async fn remove_selected(&self) -> Result<usize, OrchestratorError> {
        let removed = {
            let mut state = self.lock_live().await?;
            let removed = state.queue.remove_selected();
            for item in &removed {
                withdraw_pending(&mut state, item);
            }
            removed
        };
        info!(count = removed.len(), "Removed selected items");
        self.emit_removed(&removed);
        Ok(removed.len())
    }

    pub async fn items(&self) -> Vec<ItemSnapshot> {
        self.shared.state.lock().await.queue.snapshots()
    }

    pub async fn item(&self, item_id: &str) -> Option<ItemSnapshot> {
        self.shared
            .state
            .lock()
            .await
            .queue
            .get(item_id)
            .map(UploadItem::snapshot)
    }

    /// Current (or last) session.
    pub async fn session(&self) -> Option<UploadSession> {
        self.shared.state.lock().await.session.clone()
    }

    pub async fn progress(&self) -> ProgressSnapshot {
        let state = self.shared.state.lock().await;
        aggregate(&state.queue, state.session.as_ref())
    }

    /// True while a scheduler task is draining the queue.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    async fn lock_live(&self) -> Result<MutexGuard<'_, BatchState>, OrchestratorError> {
        let state = self.shared.state.lock().await;
        if state.disposed {
            return Err(OrchestratorError::Disposed);
        }
        Ok(state)
    }

    fn begin_session(&self, mut state: MutexGuard<'_, BatchState>) -> Result<(), OrchestratorError> {
        if !state.queue.has_pending() {
            return Err(OrchestratorError::NoPendingItems);
        }

        let mut session = UploadSession::new();
        for item in state
            .queue
            .iter()
            .filter(|i| i.status() == ItemStatus::Pending)
        {
            session.admit(item.id(), item.size_bytes());
        }
        let (total_items, total_bytes) = (session.total_items, session.total_bytes);

        state.session = Some(session);
        state.session_token = Some(CancellationToken::new());
        self.shared.running.send_replace(true);
        drop(state);

        info!(total_items, total_bytes, "Upload session started");
        self.shared.emit(&UploadEvent::SessionStarted {
            total_items,
            total_bytes,
        });
        tokio::spawn(BatchScheduler::new(self.shared.clone()).run());
        Ok(())
    }

    /// Admit retried items into the active session, or start a new one.
    async fn readmit_or_start(
        &self,
        mut state: MutexGuard<'_, BatchState>,
        items: Vec<(String, u64)>,
    ) -> Result<(), OrchestratorError> {
        if let Some(session) = state.session.as_mut().filter(|s| s.active) {
            for (id, size_bytes) in &items {
                session.admit(id, *size_bytes);
            }
            drop(state);
            self.shared.wake.notify_one();
            return Ok(());
        }
        drop(state);
        self.start().await
    }

    fn cancel_locked(&self, state: &mut BatchState) -> bool {
        let Some(session) = state.session.as_mut().filter(|s| s.active) else {
            return false;
        };
        session.cancel();
        if let Some(token) = &state.session_token {
            token.cancel();
        }
        info!(
            pending = state.queue.count_status(ItemStatus::Pending),
            uploading = state.queue.count_status(ItemStatus::Uploading),
            "Upload session cancelled"
        );
        self.shared.wake.notify_one();
        true
    }

    async fn edit(
        &self,
        item_id: &str,
        apply: impl FnOnce(&mut UploadItem),
    ) -> Result<(), OrchestratorError> {
        let mut state = self.lock_live().await?;
        let item = state
            .queue
            .get_mut(item_id)
            .ok_or_else(|| OrchestratorError::ItemNotFound(item_id.to_string()))?;
        if !item.status().is_editable() {
            return Err(OrchestratorError::InvalidState {
                expected: "pending or failed".to_string(),
                actual: item.status().to_string(),
            });
        }
        apply(item);
        Ok(())
    }

    fn emit_removed(&self, removed: &[UploadItem]) {
        for item in removed {
            self.shared.emit(&UploadEvent::ItemRemoved {
                item_id: item.id().to_string(),
            });
        }
    }
}

/// A removed `Pending` item will never report back, so the active session
/// stops counting it.
fn withdraw_pending(state: &mut BatchState, item: &UploadItem) {
    if item.status() != ItemStatus::Pending {
        return;
    }
    if let Some(session) = state.session.as_mut().filter(|s| s.active) {
        if session.withdraw(item.id(), item.size_bytes()) {
            debug!(item_id = %item.id(), "Withdrew item from active session");
        }
    }
}

fn reset(item: &mut UploadItem) -> Result<(), OrchestratorError> {
    item.reset_for_retry()
        .map_err(|e| OrchestratorError::InvalidState {
            expected: ItemStatus::Failed.to_string(),
            actual: e.from.to_string(),
        })
}
