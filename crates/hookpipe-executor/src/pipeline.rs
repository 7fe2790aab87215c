//! Sequential single-flight pipeline execution.

use hookpipe_core::pipeline::{PipelineRunResult, PipelineStep, RunFailure};
use hookpipe_core::{Error, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::runner::StepRunner;

/// Runs the configured steps in insertion order, at most one run at a time.
///
/// Overlapping deployments to the same environment are unsafe, so a second
/// `run()` while one is active is rejected immediately rather than queued.
pub struct PipelineExecutor {
    steps: Vec<PipelineStep>,
    runner: Arc<dyn StepRunner>,
    run_lock: Mutex<()>,
}

impl PipelineExecutor {
    /// The step list is fixed at construction; it is read-only for the
    /// executor's lifetime.
    pub fn new(steps: Vec<PipelineStep>, runner: Arc<dyn StepRunner>) -> Self {
        Self {
            steps,
            runner,
            run_lock: Mutex::new(()),
        }
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Execute all steps in order, stopping at the first failure.
    ///
    /// Fails with `ExecutionInProgress` when a run is already active.
    /// The run lock is a guard bound to this call's scope, so it is
    /// released on every exit path, including panics mid-step.
    pub async fn run(&self) -> Result<PipelineRunResult> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| Error::ExecutionInProgress)?;

        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, steps = self.steps.len(), "pipeline run started");

        let mut completed_steps = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            match self.runner.execute(step).await {
                Ok(result) if result.succeeded() => {
                    info!(run_id = %run_id, step = %result.step_name, "step succeeded");
                    completed_steps.push(result);
                }
                Ok(result) => {
                    error!(
                        run_id = %run_id,
                        step = %result.step_name,
                        exit_code = result.exit_code,
                        "step failed, aborting run"
                    );
                    let failure = RunFailure {
                        step_name: result.step_name.clone(),
                        exit_code: Some(result.exit_code),
                        message: Error::StepFailed {
                            step: result.step_name.clone(),
                            exit_code: result.exit_code,
                        }
                        .to_string(),
                    };
                    completed_steps.push(result);
                    return Ok(PipelineRunResult {
                        succeeded: false,
                        completed_steps,
                        failure: Some(failure),
                    });
                }
                Err(Error::SpawnFailed { step, message }) => {
                    error!(
                        run_id = %run_id,
                        step = %step,
                        message = %message,
                        "step could not be started, aborting run"
                    );
                    let failure = RunFailure {
                        step_name: step.clone(),
                        exit_code: None,
                        message: Error::SpawnFailed { step, message }.to_string(),
                    };
                    return Ok(PipelineRunResult {
                        succeeded: false,
                        completed_steps,
                        failure: Some(failure),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(run_id = %run_id, steps = completed_steps.len(), "pipeline run succeeded");
        Ok(PipelineRunResult {
            succeeded: true,
            completed_steps,
            failure: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hookpipe_core::pipeline::StepResult;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Outcome a scripted runner produces for a given step name.
    #[derive(Clone)]
    enum Outcome {
        Exit(i32),
        SpawnFault,
    }

    /// Runner that replays scripted outcomes and records invocations.
    struct ScriptedRunner {
        outcomes: HashMap<String, Outcome>,
        invoked: StdMutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl ScriptedRunner {
        fn new(outcomes: &[(&str, Outcome)]) -> Self {
            Self {
                outcomes: outcomes
                    .iter()
                    .map(|(name, o)| (name.to_string(), o.clone()))
                    .collect(),
                invoked: StdMutex::new(Vec::new()),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn invoked(&self) -> Vec<String> {
            self.invoked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepRunner for ScriptedRunner {
        async fn execute(&self, step: &PipelineStep) -> hookpipe_core::Result<StepResult> {
            self.invoked.lock().unwrap().push(step.name.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.outcomes.get(&step.name) {
                Some(Outcome::SpawnFault) => Err(Error::SpawnFailed {
                    step: step.name.clone(),
                    message: "no such file or directory".to_string(),
                }),
                Some(Outcome::Exit(code)) => Ok(StepResult {
                    step_name: step.name.clone(),
                    exit_code: *code,
                    stdout: format!("{} output\n", step.name),
                    stderr: String::new(),
                    duration: Duration::from_millis(1),
                }),
                None => panic!("unexpected step '{}'", step.name),
            }
        }
    }

    fn steps(names: &[&str]) -> Vec<PipelineStep> {
        names
            .iter()
            .map(|name| PipelineStep {
                name: name.to_string(),
                command: format!("run {}", name),
                env: HashMap::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_all_steps_succeed_in_order() {
        let runner = Arc::new(ScriptedRunner::new(&[
            ("build", Outcome::Exit(0)),
            ("deploy", Outcome::Exit(0)),
        ]));
        let executor = PipelineExecutor::new(steps(&["build", "deploy"]), runner.clone());

        let result = executor.run().await.unwrap();

        assert!(result.succeeded);
        assert!(result.failure.is_none());
        assert_eq!(result.completed_steps.len(), 2);
        assert_eq!(result.completed_steps[0].step_name, "build");
        assert_eq!(result.completed_steps[1].step_name, "deploy");
        assert_eq!(runner.invoked(), vec!["build", "deploy"]);
    }

    #[tokio::test]
    async fn test_failing_step_aborts_remaining() {
        let runner = Arc::new(ScriptedRunner::new(&[
            ("build", Outcome::Exit(0)),
            ("test", Outcome::Exit(1)),
            ("deploy", Outcome::Exit(0)),
        ]));
        let executor = PipelineExecutor::new(steps(&["build", "test", "deploy"]), runner.clone());

        let result = executor.run().await.unwrap();

        assert!(!result.succeeded);
        // The failing step's record is retained; deploy never ran.
        assert_eq!(result.completed_steps.len(), 2);
        assert_eq!(result.completed_steps[0].step_name, "build");
        assert_eq!(result.completed_steps[1].step_name, "test");
        assert_eq!(result.completed_steps[1].exit_code, 1);
        assert_eq!(runner.invoked(), vec!["build", "test"]);

        let failure = result.failure.unwrap();
        assert_eq!(failure.step_name, "test");
        assert_eq!(failure.exit_code, Some(1));
        // The failure message is the taxonomy error's rendering.
        assert_eq!(failure.message, "step 'test' exited with code 1");
    }

    #[tokio::test]
    async fn test_spawn_fault_aborts_run() {
        let runner = Arc::new(ScriptedRunner::new(&[
            ("build", Outcome::Exit(0)),
            ("deploy", Outcome::SpawnFault),
        ]));
        let executor = PipelineExecutor::new(steps(&["build", "deploy"]), runner.clone());

        let result = executor.run().await.unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.completed_steps.len(), 1);
        let failure = result.failure.unwrap();
        assert_eq!(failure.step_name, "deploy");
        assert_eq!(failure.exit_code, None);
        assert_eq!(
            failure.message,
            "step 'deploy' could not be started: no such file or directory"
        );
    }

    #[tokio::test]
    async fn test_concurrent_run_rejected_without_waiting() {
        let runner = Arc::new(
            ScriptedRunner::new(&[("build", Outcome::Exit(0))])
                .with_delay(Duration::from_millis(200)),
        );
        let executor = Arc::new(PipelineExecutor::new(steps(&["build"]), runner));

        let first = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run().await })
        };

        // Let the first run acquire the lock.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        let second = executor.run().await;
        assert!(matches!(second, Err(Error::ExecutionInProgress)));
        // Reject-on-conflict, not queued behind the active run.
        assert!(started.elapsed() < Duration::from_millis(100));

        let first = first.await.unwrap().unwrap();
        assert!(first.succeeded);
    }

    #[tokio::test]
    async fn test_executor_idle_after_success() {
        let runner = Arc::new(ScriptedRunner::new(&[("build", Outcome::Exit(0))]));
        let executor = PipelineExecutor::new(steps(&["build"]), runner.clone());

        let first = executor.run().await.unwrap();
        assert!(first.succeeded);

        // The lock was released; a new run is accepted and runs the steps again.
        let second = executor.run().await.unwrap();
        assert!(second.succeeded);
        assert_eq!(runner.invoked(), vec!["build", "build"]);
    }

    #[tokio::test]
    async fn test_executor_idle_after_failure() {
        let runner = Arc::new(ScriptedRunner::new(&[("build", Outcome::Exit(2))]));
        let executor = PipelineExecutor::new(steps(&["build"]), runner);

        let first = executor.run().await.unwrap();
        assert!(!first.succeeded);

        // The lock was released; a new run is accepted.
        let second = executor.run().await.unwrap();
        assert!(!second.succeeded);
    }

    #[tokio::test]
    async fn test_executor_idle_after_spawn_fault() {
        let runner = Arc::new(ScriptedRunner::new(&[("build", Outcome::SpawnFault)]));
        let executor = PipelineExecutor::new(steps(&["build"]), runner);

        let first = executor.run().await.unwrap();
        assert!(!first.succeeded);

        let second = executor.run().await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_empty_pipeline_succeeds() {
        let runner = Arc::new(ScriptedRunner::new(&[]));
        let executor = PipelineExecutor::new(Vec::new(), runner);

        let result = executor.run().await.unwrap();
        assert!(result.succeeded);
        assert!(result.completed_steps.is_empty());
    }
}
