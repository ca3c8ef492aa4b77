use std::fmt;
use std::sync::Arc;

/// Something that can revoke a preview URL.
pub trait PreviewRevoker: Send + Sync {
    fn revoke(&self, url: &str);
}

/// Exclusive owner of one preview URL.
///
/// The URL is revoked exactly once: `release()` consumes the handle, and
/// `Drop` only revokes if `release()` was never called.
pub struct PreviewHandle {
    url: String,
    revoker: Option<Arc<dyn PreviewRevoker>>,
}

impl PreviewHandle {
    pub fn new(url: impl Into<String>, revoker: Arc<dyn PreviewRevoker>) -> Self {
        Self {
            url: url.into(),
            revoker: Some(revoker),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Revoke the URL now.
    pub fn release(mut self) {
        self.revoke();
    }

    fn revoke(&mut self) {
        if let Some(revoker) = self.revoker.take() {
            revoker.revoke(&self.url);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if self.revoker.is_some() {
            tracing::debug!("Preview {} dropped without release, revoking", self.url);
            self.revoke();
        }
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("url", &self.url)
            .field("released", &self.revoker.is_none())
            .finish()
    }
}
