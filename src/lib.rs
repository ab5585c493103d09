//! buildbox - integration-test harness for CLI build tools
//!
//! Runs an external build tool against fixture project trees inside isolated
//! sandbox directories, captures its output and exit status, and publishes
//! typed results back to the calling test for assertion. The harness is a
//! library: a host test runner drives the [`Harness`] lifecycle and the
//! harness never defines process exit codes of its own.

pub mod config;
pub mod error;
pub mod fixture;
pub mod harness;
pub mod invocation;
pub mod runner;
pub mod sandbox;
pub mod store;

pub use config::{CaseConfig, HarnessConfig};
pub use error::{Error, Result};
pub use fixture::stage_fixture;
pub use harness::{CaseState, Harness};
pub use invocation::BuildInvocation;
pub use runner::{CapturedLog, ExecutionOutcome, ExecutionStatus, ProcessRunner, ToolRunner};
pub use sandbox::{provision, CacheScope, SandboxLayout, TestId};
pub use store::{CacheHandle, ResultBundle, ResultKind, ResultStore};
