//! Subprocess-backed tool runner.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::invocation::BuildInvocation;

use super::{CapturedLog, ExecutionOutcome, ToolRunner};

/// Runner that executes the build tool as a child process.
///
/// stdout and stderr are drained on independent tasks so each stream makes
/// progress regardless of the other; a child flooding one pipe can never
/// block on a full OS buffer while the harness reads the other.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }
}

/// Collects every line from the stream until EOF.
fn drain_lines<R>(reader: R, stream: &'static str) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut captured = Vec::new();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => captured.push(line),
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(stream, error = %e, "error reading child output");
                    break;
                }
            }
        }
        captured
    })
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &BuildInvocation,
        timeout: Duration,
    ) -> Result<(ExecutionOutcome, CapturedLog)> {
        tracing::info!(
            program = %invocation.program.display(),
            working_dir = ?invocation.working_dir,
            args = ?invocation.args,
            "launching build tool"
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ProcessLaunch {
                program: invocation.program.display().to_string(),
                source: e,
            })?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let stdout_task = drain_lines(stdout, "stdout");
        let stderr_task = drain_lines(stderr, "stderr");

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(Error::io(&invocation.working_dir, e)),
            Err(_) => {
                tracing::warn!(timeout = ?timeout, "build timed out, killing child");
                let _ = child.start_kill();
                let _ = child.wait().await;
                // Pipes close once the child dies; reap the drains too.
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                return Err(Error::Timeout(timeout));
            }
        };

        // Both drains must finish before the outcome is finalized so no
        // lines emitted right before exit are lost.
        let stdout_lines = stdout_task.await.unwrap_or_default();
        let stderr_lines = stderr_task.await.unwrap_or_default();

        // Termination by signal carries no exit code; map it to -1.
        let exit_code = status.code().unwrap_or(-1);
        let outcome = ExecutionOutcome::from_exit_code(exit_code);

        tracing::info!(
            exit_code,
            status = ?outcome.status,
            stdout_lines = stdout_lines.len(),
            stderr_lines = stderr_lines.len(),
            "build tool finished"
        );

        Ok((
            outcome,
            CapturedLog {
                stdout_lines,
                stderr_lines,
            },
        ))
    }

    fn name(&self) -> &str {
        "process"
    }
}
