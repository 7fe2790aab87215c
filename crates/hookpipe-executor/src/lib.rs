//! Step execution engine for hookpipe.
//!
//! Provides:
//! - `StepRunner` trait and the shell subprocess implementation
//! - `PipelineExecutor`, the single-flight sequential run engine

pub mod pipeline;
pub mod runner;

pub use pipeline::PipelineExecutor;
pub use runner::{ProcessRunner, StepRunner};
