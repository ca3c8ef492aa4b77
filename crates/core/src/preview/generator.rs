use async_trait::async_trait;
use thiserror::Error;

use crate::validator::{FileDescriptor, MediaSource};

use super::handle::PreviewHandle;
use super::registry::{PreviewRegistry, PreviewSource};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Preview source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Preview generation failed: {0}")]
    Failed(String),
}

/// Produces a renderable preview for an accepted item.
#[async_trait]
pub trait PreviewGenerator: Send + Sync {
    /// Returns `Ok(None)` when the file type has no preview.
    async fn generate(&self, file: &FileDescriptor) -> Result<Option<PreviewHandle>, PreviewError>;
}

/// Registers the item's own bytes (or path) as its preview, for MIME types
/// matching one of the configured prefixes.
pub struct LocalPreviewGenerator {
    registry: PreviewRegistry,
    mime_prefixes: Vec<String>,
}

impl LocalPreviewGenerator {
    pub fn new(registry: PreviewRegistry, mime_prefixes: Vec<String>) -> Self {
        Self {
            registry,
            mime_prefixes,
        }
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }

    fn supports(&self, mime_type: &str) -> bool {
        self.mime_prefixes
            .iter()
            .any(|prefix| mime_type.starts_with(prefix.as_str()))
    }
}

#[async_trait]
impl PreviewGenerator for LocalPreviewGenerator {
    async fn generate(&self, file: &FileDescriptor) -> Result<Option<PreviewHandle>, PreviewError> {
        if !self.supports(&file.mime_type) {
            return Ok(None);
        }

        let source = match &file.source {
            MediaSource::Path(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(PreviewError::SourceUnavailable(path.display().to_string()));
                }
                PreviewSource::File(path.clone())
            }
            MediaSource::Memory(data) => PreviewSource::Memory {
                mime_type: file.mime_type.clone(),
                data: data.clone(),
            },
        };

        Ok(Some(self.registry.register(source)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn generator() -> LocalPreviewGenerator {
        LocalPreviewGenerator::new(
            PreviewRegistry::new(),
            vec!["image/".to_string(), "video/".to_string()],
        )
    }

    #[tokio::test]
    async fn test_image_gets_preview() {
        let gen = generator();
        let file = FileDescriptor::from_bytes("a.png", "image/png", Bytes::from_static(b"png"));

        let handle = gen.generate(&file).await.unwrap().unwrap();
        assert!(gen.registry().resolve(handle.url()).is_some());
    }

    #[tokio::test]
    async fn test_audio_has_no_preview() {
        let gen = generator();
        let file = FileDescriptor::from_bytes("a.mp3", "audio/mpeg", Bytes::from_static(b"id3"));

        assert!(gen.generate(&file).await.unwrap().is_none());
        assert_eq!(gen.registry().stats().created, 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let gen = generator();
        let file = FileDescriptor {
            name: "gone.png".to_string(),
            size_bytes: 1,
            mime_type: "image/png".to_string(),
            source: MediaSource::Path("/nonexistent/gone.png".into()),
            tags: Default::default(),
            description: String::new(),
        };

        assert!(matches!(
            gen.generate(&file).await,
            Err(PreviewError::SourceUnavailable(_))
        ));
    }
}
