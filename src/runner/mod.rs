//! Build tool runners: launch the external tool and capture its output.

mod process;

pub use process::ProcessRunner;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::invocation::BuildInvocation;

/// Terminal state of a build invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The tool exited with code 0.
    Successful,
    /// The tool exited with a non-zero code.
    Failure,
}

/// Exit code and derived status of a finished build.
///
/// `status` is `Failure` iff `exit_code != 0`. A failure here is a normal,
/// inspectable outcome for the test body, not a harness error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Exit code of the tool, passed through verbatim.
    pub exit_code: i32,
    /// Derived success/failure status.
    pub status: ExecutionStatus,
}

impl ExecutionOutcome {
    /// Derives the outcome from a raw exit code.
    pub fn from_exit_code(exit_code: i32) -> Self {
        let status = if exit_code == 0 {
            ExecutionStatus::Successful
        } else {
            ExecutionStatus::Failure
        };
        Self { exit_code, status }
    }

    /// Whether the build succeeded.
    pub fn is_successful(&self) -> bool {
        self.status == ExecutionStatus::Successful
    }
}

/// Full stdout/stderr capture of a build invocation, split into lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapturedLog {
    /// Standard output lines in emission order.
    pub stdout_lines: Vec<String>,
    /// Standard error lines in emission order.
    pub stderr_lines: Vec<String>,
}

impl CapturedLog {
    /// Whether any stdout line contains the pattern.
    pub fn stdout_contains(&self, pattern: &str) -> bool {
        self.stdout_lines.iter().any(|l| l.contains(pattern))
    }

    /// Whether any stderr line contains the pattern.
    pub fn stderr_contains(&self, pattern: &str) -> bool {
        self.stderr_lines.iter().any(|l| l.contains(pattern))
    }

    /// Stdout joined back into one string.
    pub fn stdout(&self) -> String {
        self.stdout_lines.join("\n")
    }

    /// Stderr joined back into one string.
    pub fn stderr(&self) -> String {
        self.stderr_lines.join("\n")
    }
}

/// Trait for build tool runners.
///
/// The harness is driven through this seam so tests can substitute a mock
/// runner without launching real processes.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs the invocation to completion, capturing both streams fully
    /// before the outcome is finalized.
    async fn run(
        &self,
        invocation: &BuildInvocation,
        timeout: Duration,
    ) -> Result<(ExecutionOutcome, CapturedLog)>;

    /// Returns the name of this runner.
    fn name(&self) -> &str;
}
