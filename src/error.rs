//! Error types for the buildbox harness.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for harness operations.
///
/// A non-zero exit code from the build tool is deliberately *not* represented
/// here: it is a normal, inspectable outcome (`ExecutionStatus::Failure`).
/// Every variant below aborts the current test case.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing test configuration. Raised before any I/O.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem operation failed during sandbox setup or artifact capture.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The named fixture project does not exist under the fixture root.
    #[error("fixture project not found: {0}")]
    FixtureNotFound(PathBuf),

    /// The build tool executable could not be started.
    #[error("failed to launch {program}: {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The build did not finish within the configured timeout; the child
    /// process has been killed and reaped.
    #[error("build timed out after {0:?}, process killed")]
    Timeout(Duration),

    /// A result was requested before the harness published it.
    #[error("result kind {kind} not resolved for test {test}")]
    NotResolved { kind: &'static str, test: String },
}

impl Error {
    /// Wraps an IO error with the path that triggered it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
