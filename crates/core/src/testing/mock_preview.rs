//! Mock preview generator for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::preview::{
    PreviewError, PreviewGenerator, PreviewHandle, PreviewRegistry, PreviewSource, PreviewStats,
};
use crate::validator::{FileDescriptor, MediaSource};

/// Mock implementation of the PreviewGenerator trait.
///
/// Every file gets a preview registered in an in-memory registry, so tests
/// can assert how many were created and revoked.
#[derive(Clone)]
pub struct MockPreviewGenerator {
    registry: PreviewRegistry,
    /// If set, the next generation will fail with this error.
    next_error: Arc<RwLock<Option<PreviewError>>>,
    generated: Arc<AtomicUsize>,
}

impl Default for MockPreviewGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPreviewGenerator {
    pub fn new() -> Self {
        Self {
            registry: PreviewRegistry::new(),
            next_error: Arc::new(RwLock::new(None)),
            generated: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set an error to be returned by the next generation.
    pub async fn set_next_error(&self, error: PreviewError) {
        *self.next_error.write().await = Some(error);
    }

    pub fn generated_count(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PreviewStats {
        self.registry.stats()
    }
}

#[async_trait]
impl PreviewGenerator for MockPreviewGenerator {
    async fn generate(&self, file: &FileDescriptor) -> Result<Option<PreviewHandle>, PreviewError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        let source = match &file.source {
            MediaSource::Path(path) => PreviewSource::File(path.clone()),
            MediaSource::Memory(data) => PreviewSource::Memory {
                mime_type: file.mime_type.clone(),
                data: data.clone(),
            },
        };
        self.generated.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.registry.register(source)))
    }
}
