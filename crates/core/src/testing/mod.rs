//! Testing utilities and mock implementations.
//!
//! Mock implementations of the transport and preview seams, so the whole
//! orchestrator can be exercised without a network or a real store.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediaflow_core::testing::{fixtures, MockPreviewGenerator, MockTransport};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.fail_name("broken.png", TransportError::Network("reset".into())).await;
//!
//! let orchestrator = UploadOrchestrator::new(config, transport.clone(), None)?;
//! orchestrator.enqueue(vec![fixtures::image("broken.png", 1024)]).await?;
//! ```

mod mock_preview;
mod mock_transport;

pub use mock_preview::MockPreviewGenerator;
pub use mock_transport::{MockTransport, RecordedTransfer};

/// Test fixtures and helper functions.
pub mod fixtures {
    use bytes::Bytes;

    use crate::orchestrator::BatchConfig;
    use crate::validator::FileDescriptor;

    /// In-memory file of `size` bytes with the given MIME type.
    pub fn file(name: &str, mime_type: &str, size: usize) -> FileDescriptor {
        FileDescriptor::from_bytes(name, mime_type, Bytes::from(vec![0u8; size]))
    }

    /// In-memory PNG of `size` bytes.
    pub fn image(name: &str, size: usize) -> FileDescriptor {
        file(name, "image/png", size)
    }

    /// In-memory MP4 of `size` bytes.
    pub fn video(name: &str, size: usize) -> FileDescriptor {
        file(name, "video/mp4", size)
    }

    /// `count` images named `img-0.png`, `img-1.png`, ...
    pub fn images(count: usize, size: usize) -> Vec<FileDescriptor> {
        (0..count)
            .map(|i| image(&format!("img-{}.png", i), size))
            .collect()
    }

    /// Default batch config with a different concurrency bound.
    pub fn batch_config(max_concurrent: usize) -> BatchConfig {
        BatchConfig {
            max_concurrent,
            ..BatchConfig::default()
        }
    }
}
