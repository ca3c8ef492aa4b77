//! FIFO queue of upload items and the per-item state machine.

mod store;
mod types;

pub use store::UploadQueue;
pub use types::{ItemSnapshot, ItemStatus, TransitionError, UploadItem};
