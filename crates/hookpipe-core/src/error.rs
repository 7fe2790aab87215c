//! Error types for hookpipe.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unauthorized")]
    Unauthorized,

    #[error("pipeline already running")]
    ExecutionInProgress,

    #[error("step '{step}' could not be started: {message}")]
    SpawnFailed { step: String, message: String },

    #[error("step '{step}' exited with code {exit_code}")]
    StepFailed { step: String, exit_code: i32 },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
