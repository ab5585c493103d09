//! Per-test result store.
//!
//! Results are keyed by [`TestId`], written once per case by the harness and
//! read any number of times by the test body. Looking up a kind before the
//! harness publishes it is a programming error surfaced as
//! [`Error::NotResolved`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::runner::{CapturedLog, ExecutionOutcome};
use crate::sandbox::TestId;

/// Handle to the cache directory a build ran against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHandle {
    /// The cache directory of the sandbox layout.
    pub path: PathBuf,
}

/// The kinds of result a test body can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Exit code and status.
    Execution,
    /// Captured stdout/stderr.
    Log,
    /// Cache directory handle.
    Cache,
}

impl ResultKind {
    fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Execution => "execution",
            ResultKind::Log => "log",
            ResultKind::Cache => "cache",
        }
    }
}

/// Everything published for one completed test case.
#[derive(Debug, Clone)]
pub struct ResultBundle {
    /// Exit code and status of the build.
    pub outcome: ExecutionOutcome,
    /// Full output capture.
    pub log: CapturedLog,
    /// Cache directory handle.
    pub cache: CacheHandle,
}

/// Per-suite-run store mapping test identity to published results.
///
/// Publishing twice under the same identity overwrites silently; the
/// lifecycle only publishes once per case, so last-write-wins is never
/// observable in practice.
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: Mutex<HashMap<TestId, ResultBundle>>,
}

impl ResultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the result bundle for a test case.
    pub fn publish(&self, id: TestId, bundle: ResultBundle) {
        self.inner
            .lock()
            .expect("result store lock poisoned")
            .insert(id, bundle);
    }

    /// Resolves the execution outcome for a test case.
    pub fn execution(&self, id: &TestId) -> Result<ExecutionOutcome> {
        self.get(id, ResultKind::Execution, |b| b.outcome)
    }

    /// Resolves the captured log for a test case.
    pub fn log(&self, id: &TestId) -> Result<CapturedLog> {
        self.get(id, ResultKind::Log, |b| b.log.clone())
    }

    /// Resolves the cache handle for a test case.
    pub fn cache(&self, id: &TestId) -> Result<CacheHandle> {
        self.get(id, ResultKind::Cache, |b| b.cache.clone())
    }

    /// Drops everything published for a test case.
    pub fn discard(&self, id: &TestId) {
        self.inner
            .lock()
            .expect("result store lock poisoned")
            .remove(id);
    }

    fn get<T>(&self, id: &TestId, kind: ResultKind, pick: impl Fn(&ResultBundle) -> T) -> Result<T> {
        let inner = self.inner.lock().expect("result store lock poisoned");
        inner.get(id).map(pick).ok_or_else(|| Error::NotResolved {
            kind: kind.as_str(),
            test: id.to_string(),
        })
    }
}
