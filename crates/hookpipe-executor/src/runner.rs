//! Process spawning and output streaming for pipeline steps.

use async_trait::async_trait;
use hookpipe_core::pipeline::{PipelineStep, SECRET_ENV_VAR, StepResult};
use hookpipe_core::{Error, Result};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

/// Maximum line length streamed to the log sink (64 KiB).
/// Longer lines are truncated.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Runs one pipeline step to completion.
///
/// An implementation must not leave a child process running past the
/// call's return: cancellation terminates the child, never abandons it.
/// `ProcessRunner` does this through `kill_on_drop`, which signals the
/// child the moment the in-flight future is dropped but leaves reaping
/// to the runtime in the background, so the kill is immediate while the
/// wait on the corpse completes asynchronously.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn execute(&self, step: &PipelineStep) -> Result<StepResult>;
}

/// Step runner that executes commands through a shell subprocess.
///
/// Each step's env overrides are merged over the baseline environment;
/// overrides win on key collision. The baseline is the parent process
/// environment minus the shared-secret variable, so a step can never
/// read the trigger secret.
pub struct ProcessRunner {
    shell: String,
    base_env: HashMap<String, String>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::with_shell("/bin/sh")
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            base_env: scrub_secret(std::env::vars()),
        }
    }

    /// Replace the baseline environment. Step overrides still win.
    pub fn with_base_env(mut self, base_env: HashMap<String, String>) -> Self {
        self.base_env = base_env;
        self
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepRunner for ProcessRunner {
    async fn execute(&self, step: &PipelineStep) -> Result<StepResult> {
        info!(step = %step.name, command = %step.command, "executing step");
        let started = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&step.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.env_clear();
        cmd.envs(&self.base_env);
        cmd.envs(&step.env);

        let mut child = cmd.spawn().map_err(|e| Error::SpawnFailed {
            step: step.name.clone(),
            message: e.to_string(),
        })?;

        // stdout/stderr are always piped, but avoid panicking if a pipe
        // is somehow missing.
        let stdout_pipe = child.stdout.take().ok_or_else(|| Error::SpawnFailed {
            step: step.name.clone(),
            message: "stdout pipe not available".to_string(),
        })?;
        let stderr_pipe = child.stderr.take().ok_or_else(|| Error::SpawnFailed {
            step: step.name.clone(),
            message: "stderr pipe not available".to_string(),
        })?;

        let stdout_handle = tokio::spawn(stream_lines(
            stdout_pipe,
            step.name.clone(),
            OutputStream::Stdout,
        ));
        let stderr_handle = tokio::spawn(stream_lines(
            stderr_pipe,
            step.name.clone(),
            OutputStream::Stderr,
        ));

        let status = child.wait().await.map_err(|e| {
            Error::Internal(format!("wait on step '{}' failed: {}", step.name, e))
        })?;

        // Drain both pipes fully before acting on the exit status.
        let stdout = stdout_handle.await.unwrap_or_default();
        let stderr = stderr_handle.await.unwrap_or_default();

        // Exit by signal carries no code; report -1.
        let exit_code = status.code().unwrap_or(-1);
        info!(
            step = %step.name,
            exit_code,
            duration_ms = started.elapsed().as_millis() as u64,
            "step finished"
        );

        Ok(StepResult {
            step_name: step.name.clone(),
            exit_code,
            stdout,
            stderr,
            duration: started.elapsed(),
        })
    }
}

/// Drop the shared-secret variable from a captured environment.
fn scrub_secret(vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter(|(key, _)| key != SECRET_ENV_VAR)
        .collect()
}

enum OutputStream {
    Stdout,
    Stderr,
}

/// Stream one pipe line-by-line to the log sink while collecting it.
async fn stream_lines<R>(pipe: R, step_name: String, stream: OutputStream) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut line = String::new();
    let mut collected = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                if line.len() > MAX_LINE_LENGTH {
                    line.truncate(MAX_LINE_LENGTH);
                    line.push_str("... [truncated]\n");
                }
                collected.push_str(&line);
                match stream {
                    OutputStream::Stdout => info!(step = %step_name, "{}", line.trim_end()),
                    OutputStream::Stderr => warn!(step = %step_name, "{}", line.trim_end()),
                }
            }
            Err(e) => {
                warn!(step = %step_name, "error reading step output: {}", e);
                break;
            }
        }
    }

    collected
}
