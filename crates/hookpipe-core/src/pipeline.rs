//! Pipeline domain types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Environment variable the shared secret is provisioned through.
/// The secret is never read from config files and never logged.
pub const SECRET_ENV_VAR: &str = "HOOKPIPE_SECRET";

/// Pipeline identity and shared secret. Immutable after construction.
#[derive(Clone)]
pub struct PipelineConfig {
    pub pipeline_name: String,
    pub secret: Vec<u8>,
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("pipeline_name", &self.pipeline_name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One named external command plus its environment overrides.
///
/// Steps are held in an ordered sequence; insertion order is execution
/// order. Each step's env map is independent of every other step's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Outcome of a single executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Terminal failure detail for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailure {
    pub step_name: String,
    /// None when the step could not be started at all.
    pub exit_code: Option<i32>,
    pub message: String,
}

/// Aggregate outcome of one pipeline run.
///
/// `completed_steps` holds every step that produced a result, in execution
/// order; on failure the last entry is the failing step's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub succeeded: bool,
    pub completed_steps: Vec<StepResult>,
    pub failure: Option<RunFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_result_success_is_exit_zero() {
        let result = StepResult {
            step_name: "build".to_string(),
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_millis(5),
        };
        assert!(result.succeeded());
    }

    #[test]
    fn test_step_result_nonzero_exit_is_failure() {
        let result = StepResult {
            step_name: "deploy".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "boom".to_string(),
            duration: Duration::from_millis(5),
        };
        assert!(!result.succeeded());
    }

    #[test]
    fn test_pipeline_config_debug_redacts_secret() {
        let config = PipelineConfig {
            pipeline_name: "my-app".to_string(),
            secret: b"super-secret".to_vec(),
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("my-app"));
        assert!(!rendered.contains("super-secret"));
    }
}
