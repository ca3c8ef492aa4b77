use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::handle::{PreviewHandle, PreviewRevoker};

/// What a preview URL resolves to.
#[derive(Debug, Clone)]
pub enum PreviewSource {
    File(PathBuf),
    Memory { mime_type: String, data: Bytes },
}

/// Counters for registered and revoked previews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreviewStats {
    pub created: u64,
    pub revoked: u64,
    pub live: usize,
    /// Revocations of URLs that were not live. Always 0 unless a handle
    /// was revoked twice.
    pub stale_revocations: u64,
}

#[derive(Default)]
struct RegistryInner {
    live: HashMap<String, PreviewSource>,
    stats: PreviewStats,
}

/// In-memory table of revocable local preview URLs.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source and return the handle that owns its URL.
    pub fn register(&self, source: PreviewSource) -> PreviewHandle {
        let url = format!("preview://{}", Uuid::new_v4());
        {
            let mut inner = self.lock();
            inner.live.insert(url.clone(), source);
            inner.stats.created += 1;
            inner.stats.live = inner.live.len();
        }
        debug!("Registered preview {}", url);
        PreviewHandle::new(url, Arc::new(self.clone()))
    }

    /// Look up a live preview URL.
    pub fn resolve(&self, url: &str) -> Option<PreviewSource> {
        self.lock().live.get(url).cloned()
    }

    pub fn stats(&self) -> PreviewStats {
        self.lock().stats
    }

    // A panic while holding the lock leaves the table usable; recover the guard.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreviewRevoker for PreviewRegistry {
    fn revoke(&self, url: &str) {
        let mut inner = self.lock();
        if inner.live.remove(url).is_some() {
            inner.stats.revoked += 1;
            inner.stats.live = inner.live.len();
            debug!("Revoked preview {}", url);
        } else {
            inner.stats.stale_revocations += 1;
            warn!("Preview {} revoked but was not live", url);
        }
    }
}
