//! HTTP surface for the journal document generator.
//!
//! The binary in `main.rs` only wires configuration and signals; routes,
//! shared state and metrics live here so they can be exercised in-process.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
