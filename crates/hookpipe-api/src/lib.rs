//! HTTP API for hookpipe.
//!
//! Exposes the authenticated pipeline trigger endpoint and health checks.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;
