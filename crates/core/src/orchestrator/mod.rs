//! Upload orchestrator façade.
//!
//! Wires validation, previews, the queue and the scheduler together:
//! - **Enqueue**: validate each file, attach a preview, append to the queue
//! - **Session**: one active session at a time, drained by a bounded pool
//! - **Recovery**: retry failed items, cancel, clean up

mod config;
mod runner;
mod types;

pub use config::BatchConfig;
pub use runner::UploadOrchestrator;
pub use types::{EnqueueOutcome, OrchestratorError};
