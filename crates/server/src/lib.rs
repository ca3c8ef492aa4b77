//! HTTP surface for the mediaflow upload orchestrator.
//!
//! The binary in `main.rs` wires configuration, transport and previews into
//! an [`state::AppState`] and serves [`api::create_router`].

pub mod api;
pub mod metrics;
pub mod state;
