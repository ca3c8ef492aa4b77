//! Local previews for accepted items.
//!
//! A preview is a revocable local URL (`preview://<uuid>`) held in a
//! `PreviewRegistry`. Each URL is owned by exactly one `PreviewHandle`,
//! which revokes it once: on `release()` or, failing that, on drop.

mod generator;
mod handle;
mod registry;

pub use generator::{LocalPreviewGenerator, PreviewError, PreviewGenerator};
pub use handle::{PreviewHandle, PreviewRevoker};
pub use registry::{PreviewRegistry, PreviewSource, PreviewStats};
