//! State shared between the orchestrator façade and the scheduler task.

use std::sync::{Arc, RwLock};

use tokio::sync::{watch, Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::BatchConfig;
use crate::progress::{UploadEvent, UploadEventCallback};
use crate::queue::UploadQueue;
use crate::transport::UploadTransport;

use super::types::{SessionSummary, UploadSession};

/// Queue and session behind the single synchronization point.
#[derive(Debug)]
pub(crate) struct BatchState {
    pub queue: UploadQueue,
    pub session: Option<UploadSession>,
    pub session_token: Option<CancellationToken>,
    pub last_summary: Option<SessionSummary>,
    pub disposed: bool,
}

impl BatchState {
    pub fn new(max_items: usize) -> Self {
        Self {
            queue: UploadQueue::new(max_items),
            session: None,
            session_token: None,
            last_summary: None,
            disposed: false,
        }
    }

    pub fn session_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.active)
    }
}

pub(crate) struct Shared {
    pub config: BatchConfig,
    pub state: Mutex<BatchState>,
    pub transport: Arc<dyn UploadTransport>,
    /// Nudges the scheduler to look at the queue again.
    pub wake: Notify,
    /// True while a scheduler task owns the pool. Set under `state` when a
    /// session begins, cleared by the scheduler after `SessionFinished`.
    pub running: watch::Sender<bool>,
    events: RwLock<Option<UploadEventCallback>>,
}

impl Shared {
    pub fn new(config: BatchConfig, transport: Arc<dyn UploadTransport>) -> Self {
        let state = BatchState::new(config.max_items);
        let (running, _) = watch::channel(false);
        Self {
            config,
            state: Mutex::new(state),
            transport,
            wake: Notify::new(),
            running,
            events: RwLock::new(None),
        }
    }

    pub fn set_event_callback(&self, callback: UploadEventCallback) {
        if let Ok(mut slot) = self.events.write() {
            *slot = Some(callback);
        }
    }

    pub fn emit(&self, event: &UploadEvent) {
        let callback = match self.events.read() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        if let Some(callback) = callback {
            callback(event);
        }
    }

    pub fn emit_all(&self, events: Vec<UploadEvent>) {
        for event in &events {
            self.emit(event);
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Resolve once no scheduler task is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.running.subscribe();
        let _ = rx.wait_for(|running| !*running).await;
    }
}
