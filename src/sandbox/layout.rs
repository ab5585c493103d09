//! Deterministic sandbox path resolution.
//!
//! `SandboxLayout::resolve` is a pure function of test identity and cache
//! scope. It never touches the filesystem, so tests can assert path shapes
//! without running a build.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Relative location of the build tool's artifact cache inside its scope
/// directory.
pub const CACHE_SUBDIR: &str = ".m2/repository";

/// Relative location of the staged fixture project inside the case directory.
pub const PROJECT_SUBDIR: &str = "project";

/// Unique identity of one test invocation: suite plus method.
///
/// The suite may be a dotted qualified name (`basic.FailureIT`); dots become
/// nested path segments under the suite base directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestId {
    suite: String,
    method: String,
}

impl TestId {
    /// Creates a test identity, rejecting anything that does not resolve to
    /// non-empty path segments.
    ///
    /// Every dot-separated segment of the suite must be non-blank (a suite
    /// like `"."` or `"a..b"` would collapse into another test's directory),
    /// and neither part may carry a path separator.
    pub fn new(suite: impl Into<String>, method: impl Into<String>) -> Result<Self> {
        let suite = suite.into();
        let method = method.into();
        if suite.split('.').any(|segment| segment.trim().is_empty()) {
            return Err(Error::Config(format!(
                "test suite name {suite:?} has an empty path segment"
            )));
        }
        if method.trim().is_empty() {
            return Err(Error::Config(format!(
                "test method name is empty for suite {suite}"
            )));
        }
        for (part, value) in [("suite", &suite), ("method", &method)] {
            if value.contains(['/', '\\']) {
                return Err(Error::Config(format!(
                    "test {part} name {value:?} contains a path separator"
                )));
            }
        }
        Ok(Self { suite, method })
    }

    /// The suite's qualified name.
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// The test method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Suite name with dots mapped to path separators.
    fn suite_path(&self) -> PathBuf {
        self.suite.split('.').collect()
    }
}

impl std::fmt::Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.suite, self.method)
    }
}

/// Policy for the build tool's artifact cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// One cache per suite, shared by every test case in it. Cases sharing
    /// the cache may race on its contents; that is the scope's intent
    /// (pre-warmed dependencies amortized across cases).
    Global,
    /// A fresh cache per test case.
    #[default]
    PerTest,
}

/// Absolute directory paths owned by one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLayout {
    /// Root directory for the whole suite run.
    pub base_dir: PathBuf,
    /// Per-suite directory under the base.
    pub suite_dir: PathBuf,
    /// Per-case directory; always unique per [`TestId`].
    pub case_dir: PathBuf,
    /// Artifact cache; hoisted to `suite_dir` when scope is Global.
    pub cache_dir: PathBuf,
    /// Where the fixture project is staged; always unique per [`TestId`].
    pub project_dir: PathBuf,
}

impl SandboxLayout {
    /// Resolves the sandbox layout for a test case. Pure; no I/O.
    pub fn resolve(base: &Path, id: &TestId, scope: CacheScope) -> SandboxLayout {
        let suite_dir = base.join(id.suite_path());
        let case_dir = suite_dir.join(id.method());
        let cache_dir = match scope {
            CacheScope::Global => suite_dir.join(CACHE_SUBDIR),
            CacheScope::PerTest => case_dir.join(CACHE_SUBDIR),
        };
        let project_dir = case_dir.join(PROJECT_SUBDIR);
        SandboxLayout {
            base_dir: base.to_path_buf(),
            suite_dir,
            case_dir,
            cache_dir,
            project_dir,
        }
    }
}
