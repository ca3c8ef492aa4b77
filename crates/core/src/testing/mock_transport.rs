//! Mock upload transport for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::transport::{ProgressReporter, TransferRequest, TransportError, UploadTransport};

/// A recorded transfer for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTransfer {
    /// The request that was made.
    pub request: TransferRequest,
    /// When the transfer started.
    pub timestamp: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Fail(TransportError),
    Panic,
}

/// Mock implementation of the UploadTransport trait.
///
/// Provides controllable behavior for testing:
/// - Record every transfer for assertions
/// - Script failures per file name (each scripted outcome is used once)
/// - Simulate slow transfers and track the in-flight high-water mark
/// - Honour cancellation by returning `Aborted`
#[derive(Debug)]
pub struct MockTransport {
    /// Recorded transfers.
    calls: Arc<RwLock<Vec<RecordedTransfer>>>,
    /// Outcomes to use for upcoming transfers of a given file name.
    scripted: Arc<RwLock<HashMap<String, VecDeque<Scripted>>>>,
    /// If set, the next transfer will fail with this error.
    next_error: Arc<RwLock<Option<TransportError>>>,
    /// How long each transfer takes.
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    id_counter: AtomicU64,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock transport where every transfer succeeds immediately.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            scripted: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            id_counter: AtomicU64::new(0),
        }
    }

    /// Make each transfer take `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next transfer of `name` with `error`.
    pub async fn fail_name(&self, name: &str, error: TransportError) {
        self.scripted
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .push_back(Scripted::Fail(error));
    }

    /// Panic inside the next transfer of `name`.
    pub async fn panic_name(&self, name: &str) {
        self.scripted
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .push_back(Scripted::Panic);
    }

    /// Set an error to be returned by the next transfer, whatever its name.
    pub async fn set_next_error(&self, error: TransportError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get all recorded transfers.
    pub async fn calls(&self) -> Vec<RecordedTransfer> {
        self.calls.read().await.clone()
    }

    /// Names of transferred files, in dispatch order.
    pub async fn called_names(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .map(|c| c.request.name.clone())
            .collect()
    }

    /// Clear recorded transfers.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Transfers running right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of transfers that ever ran at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn scripted_for(&self, name: &str) -> Option<Scripted> {
        if let Some(error) = self.next_error.write().await.take() {
            return Some(Scripted::Fail(error));
        }
        self.scripted
            .write()
            .await
            .get_mut(name)
            .and_then(|queue| queue.pop_front())
    }

    async fn run(
        &self,
        request: &TransferRequest,
        progress: &ProgressReporter,
        scripted: Option<Scripted>,
        cancel: &CancellationToken,
    ) -> Result<String, TransportError> {
        let total = request.size_bytes;
        progress.report(total / 2, Some(total));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Aborted),
            _ = tokio::time::sleep(self.delay) => {}
        }

        match scripted {
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Panic) => panic!("scripted transport panic for {}", request.name),
            None => {
                progress.report(total, Some(total));
                let n = self.id_counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(format!("remote-{}", n))
            }
        }
    }
}

#[async_trait]
impl UploadTransport for MockTransport {
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<String, TransportError> {
        self.calls.write().await.push(RecordedTransfer {
            request: request.clone(),
            timestamp: Utc::now(),
        });
        let scripted = self.scripted_for(&request.name).await;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.run(&request, &progress, scripted, &cancel).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::MediaSource;
    use bytes::Bytes;
    use std::collections::BTreeSet;
    use tokio::sync::mpsc;

    fn request(name: &str) -> TransferRequest {
        TransferRequest {
            item_id: format!("id-{}", name),
            name: name.to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 10,
            source: MediaSource::Memory(Bytes::from_static(b"0123456789")),
            tags: BTreeSet::new(),
            description: String::new(),
        }
    }

    fn reporter() -> ProgressReporter {
        let (tx, _rx) = mpsc::unbounded_channel();
        ProgressReporter::new("x", tx)
    }

    #[tokio::test]
    async fn test_success_records_call() {
        let transport = MockTransport::new();
        let id = transport
            .transfer(request("a.png"), reporter(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(id, "remote-1");
        assert_eq!(transport.called_names().await, vec!["a.png"]);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_used_once() {
        let transport = MockTransport::new();
        transport
            .fail_name("a.png", TransportError::Network("reset".to_string()))
            .await;

        let first = transport
            .transfer(request("a.png"), reporter(), CancellationToken::new())
            .await;
        assert_eq!(first, Err(TransportError::Network("reset".to_string())));

        let second = transport
            .transfer(request("a.png"), reporter(), CancellationToken::new())
            .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_next_error_applies_to_any_name() {
        let transport = MockTransport::new();
        transport.set_next_error(TransportError::Aborted).await;
        let result = transport
            .transfer(request("z.png"), reporter(), CancellationToken::new())
            .await;
        assert_eq!(result, Err(TransportError::Aborted));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_delay() {
        let transport = MockTransport::new().with_delay(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = transport
            .transfer(request("slow.png"), reporter(), cancel)
            .await;
        assert_eq!(result, Err(TransportError::Aborted));
        assert_eq!(transport.in_flight(), 0);
    }
}
