//! Batch limits supplied at orchestrator construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::ConfigError;

/// Limits applied to every upload batch.
///
/// Immutable once handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Upper bound on simultaneous in-flight transfers.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Upper bound on queue size.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Largest accepted file, in bytes.
    #[serde(default = "default_max_item_size")]
    pub max_item_size_bytes: u64,

    /// Accepted MIME types. A `type/*` entry accepts the whole family.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: BTreeSet<String>,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_items() -> usize {
    100
}

fn default_max_item_size() -> u64 {
    100 * 1024 * 1024 // 100 MiB
}

fn default_allowed_mime_types() -> BTreeSet<String> {
    [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/heic",
        "video/mp4",
        "video/quicktime",
        "video/webm",
        "audio/mpeg",
        "audio/wav",
        "audio/flac",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_items: default_max_items(),
            max_item_size_bytes: default_max_item_size(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

impl BatchConfig {
    /// Reject bounds the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_concurrent must be positive".to_string(),
            ));
        }
        if self.max_items == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_items must be positive".to_string(),
            ));
        }
        if self.max_item_size_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_item_size_bytes must be positive".to_string(),
            ));
        }
        if self.allowed_mime_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "batch.allowed_mime_types cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true if the MIME type is allowed, either exactly or via a
    /// `type/*` wildcard entry.
    pub fn allows_mime_type(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if self.allowed_mime_types.contains(&mime_type) {
            return true;
        }
        match mime_type.split_once('/') {
            Some((family, _)) => self.allowed_mime_types.contains(&format!("{}/*", family)),
            None => false,
        }
    }
}
