//! Aggregate progress and the event sink consumers subscribe to.

mod aggregator;
mod events;

pub use aggregator::{aggregate, effective_percent, eta_secs, ProgressSnapshot};
pub use events::{UploadEvent, UploadEventCallback};
