//! Bounded, continuously refilling worker pool that drains the queue.

mod pool;
mod state;
mod types;

pub use pool::BatchScheduler;
pub(crate) use state::{BatchState, Shared};
pub use types::{SessionSummary, UploadSession};
