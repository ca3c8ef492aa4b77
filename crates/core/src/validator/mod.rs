//! Pre-enqueue validation of raw file descriptors.
//!
//! Validation is pure and synchronous. Each rejected file gets its own
//! `RejectReason` so callers can report one diagnostic per file.

mod types;

pub use types::{mime_type_for_path, FileDescriptor, MediaSource, RejectReason};

use crate::orchestrator::BatchConfig;

/// Validate a single file against the batch limits.
///
/// Checks run in a fixed order: MIME type, size, then queue capacity.
pub fn validate(
    file: &FileDescriptor,
    config: &BatchConfig,
    current_queue_size: usize,
) -> Result<(), RejectReason> {
    if !config.allows_mime_type(&file.mime_type) {
        return Err(RejectReason::UnsupportedType {
            mime_type: file.mime_type.clone(),
        });
    }

    if file.size_bytes > config.max_item_size_bytes {
        return Err(RejectReason::TooLarge {
            size_bytes: file.size_bytes,
            max_bytes: config.max_item_size_bytes,
        });
    }

    if current_queue_size + 1 > config.max_items {
        return Err(RejectReason::QueueFull {
            max_items: config.max_items,
        });
    }

    Ok(())
}
