//! Per-item network transfer.

mod http;
mod types;

pub use http::HttpUploadTransport;
pub use types::{ProgressReporter, TransferProgress, TransferRequest, TransportError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Moves one item's bytes to the remote store.
///
/// Implementations report progress through `progress` as bytes are consumed
/// and must return `TransportError::Aborted` promptly once `cancel` fires.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Transfer the item and return the remote identifier.
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<String, TransportError>;

    /// Name of this transport, for logs.
    fn name(&self) -> &'static str;
}
