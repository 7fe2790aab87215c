//! Core domain types for hookpipe.
//!
//! This crate contains:
//! - Pipeline, step, and run result types
//! - Trigger token verification
//! - The shared error taxonomy

pub mod auth;
pub mod error;
pub mod pipeline;

pub use auth::TriggerAuthenticator;
pub use error::{Error, Result};
