//! Test lifecycle orchestration.
//!
//! The [`Harness`] drives each test case through a fixed pipeline: provision
//! sandbox directories, stage the fixture project, run the build tool, and
//! publish results. A host test runner drives it through four entry points:
//! [`Harness::suite_start`], [`Harness::case_start`], [`Harness::invoke`],
//! and [`Harness::case_end`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{CaseConfig, HarnessConfig};
use crate::error::{Error, Result};
use crate::fixture::stage_fixture;
use crate::invocation::BuildInvocation;
use crate::runner::{ExecutionOutcome, ProcessRunner, ToolRunner};
use crate::sandbox::{provision, SandboxLayout, TestId};
use crate::store::{CacheHandle, ResultBundle, ResultStore};

/// Lifecycle state of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    /// Case registered, nothing on disk yet.
    Created,
    /// Sandbox directories exist on disk.
    CaseDirectoriesReady,
    /// Fixture project staged into the project directory.
    FixtureStaged,
    /// Build tool has run to completion.
    Invoked,
    /// Result bundle published to the store.
    ResultsPublished,
    /// Control handed back to the test body.
    CaseComplete,
    /// A fatal setup or execution error stopped the case before results
    /// could be published. Distinct from a build that exited non-zero,
    /// which publishes a Failure outcome normally.
    Aborted,
}

/// Per-case bookkeeping held between lifecycle entry points.
#[derive(Debug)]
struct CaseContext {
    config: CaseConfig,
    layout: SandboxLayout,
    state: CaseState,
}

/// Summary written to `result.json` in the case directory after a run.
#[derive(Debug, Serialize)]
struct CaseReport<'a> {
    run_id: &'a str,
    test: String,
    project: &'a str,
    args: &'a [String],
    exit_code: i32,
    status: crate::runner::ExecutionStatus,
    duration_secs: f64,
    finished_at: DateTime<Utc>,
}

/// Integration-test harness controller.
///
/// One instance serves one suite run. Cases are keyed by [`TestId`]; their
/// sandbox paths never overlap, so a host runner may drive cases
/// concurrently (cache directories are shared only under
/// [`crate::sandbox::CacheScope::Global`]).
pub struct Harness {
    config: HarnessConfig,
    runner: Box<dyn ToolRunner>,
    store: ResultStore,
    run_id: String,
    suite_started: Mutex<bool>,
    cases: Mutex<HashMap<TestId, CaseContext>>,
}

impl Harness {
    /// Creates a harness that runs the build tool as a real subprocess.
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_runner(config, Box::new(ProcessRunner::new()))
    }

    /// Creates a harness with a custom runner (mock runners in tests).
    pub fn with_runner(config: HarnessConfig, runner: Box<dyn ToolRunner>) -> Self {
        Self {
            config,
            runner,
            store: ResultStore::new(),
            run_id: uuid::Uuid::new_v4().to_string(),
            suite_started: Mutex::new(false),
            cases: Mutex::new(HashMap::new()),
        }
    }

    /// Unique identifier of this suite run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The result store backing this suite run.
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// One-time suite setup: establishes the base directory.
    pub fn suite_start(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.base_dir)
            .map_err(|e| Error::io(&self.config.base_dir, e))?;
        *self.suite_started.lock().expect("suite lock poisoned") = true;

        tracing::info!(
            run_id = %self.run_id,
            base_dir = ?self.config.base_dir,
            runner = self.runner.name(),
            "suite initialized"
        );
        Ok(())
    }

    /// Per-case setup: resolves and provisions the sandbox, then stages the
    /// fixture project. Returns the layout so the test body can inspect it.
    pub fn case_start(&self, id: &TestId, config: CaseConfig) -> Result<SandboxLayout> {
        if !*self.suite_started.lock().expect("suite lock poisoned") {
            return Err(Error::Config(format!(
                "case {id} started before suite_start"
            )));
        }

        let layout = SandboxLayout::resolve(&self.config.base_dir, id, config.cache);
        self.register(id, &config, &layout);

        if let Err(e) = provision(&layout) {
            return Err(self.abort(id, e));
        }
        self.transition(id, CaseState::CaseDirectoriesReady);

        if let Err(e) = stage_fixture(&self.config.fixture_root, &config.project, &layout.project_dir)
        {
            return Err(self.abort(id, e));
        }
        self.transition(id, CaseState::FixtureStaged);

        tracing::info!(test = %id, project = %config.project, case_dir = ?layout.case_dir, "case ready");
        Ok(layout)
    }

    /// Runs the build tool for a staged case and publishes the results.
    pub async fn invoke(&self, id: &TestId) -> Result<ExecutionOutcome> {
        let (config, layout) = {
            let cases = self.cases.lock().expect("case lock poisoned");
            let context = cases.get(id).ok_or_else(|| {
                Error::Config(format!("case {id} invoked before case_start"))
            })?;
            if context.state != CaseState::FixtureStaged {
                return Err(Error::Config(format!(
                    "case {id} invoked in state {:?}",
                    context.state
                )));
            }
            (context.config.clone(), context.layout.clone())
        };

        let invocation = BuildInvocation::assemble(&self.config.tool, &layout, &config);
        let started = Instant::now();

        let (outcome, log) = match self
            .runner
            .run(&invocation, config.timeout_duration())
            .await
        {
            Ok(run) => run,
            Err(e) => return Err(self.abort(id, e)),
        };
        self.transition(id, CaseState::Invoked);

        if let Err(e) = self.write_artifacts(id, &config, &layout, &invocation, &outcome, &log, started)
        {
            return Err(self.abort(id, e));
        }

        self.store.publish(
            id.clone(),
            ResultBundle {
                outcome,
                log,
                cache: CacheHandle {
                    path: layout.cache_dir.clone(),
                },
            },
        );
        self.transition(id, CaseState::ResultsPublished);

        Ok(outcome)
    }

    /// Hands control back to the test body; the harness takes no further
    /// action for this case except teardown logging.
    pub fn case_end(&self, id: &TestId) {
        let mut cases = self.cases.lock().expect("case lock poisoned");
        if let Some(context) = cases.get_mut(id) {
            if context.state != CaseState::Aborted {
                context.state = CaseState::CaseComplete;
            }
            tracing::info!(test = %id, state = ?context.state, "case finished");
        }
    }

    /// Suite teardown logging. Sandbox directories are created, never
    /// deleted, by the harness; cleanup is the caller's concern.
    pub fn suite_end(&self) {
        let cases = self.cases.lock().expect("case lock poisoned");
        let aborted = cases
            .values()
            .filter(|c| c.state == CaseState::Aborted)
            .count();
        tracing::info!(
            run_id = %self.run_id,
            cases = cases.len(),
            aborted,
            "suite finished"
        );
    }

    /// Current lifecycle state of a case, if it has started.
    pub fn case_state(&self, id: &TestId) -> Option<CaseState> {
        self.cases
            .lock()
            .expect("case lock poisoned")
            .get(id)
            .map(|c| c.state)
    }

    /// Resolves the execution outcome for a completed case.
    pub fn execution(&self, id: &TestId) -> Result<ExecutionOutcome> {
        self.store.execution(id)
    }

    /// Resolves the captured log for a completed case.
    pub fn log(&self, id: &TestId) -> Result<crate::runner::CapturedLog> {
        self.store.log(id)
    }

    /// Resolves the cache handle for a completed case.
    pub fn cache(&self, id: &TestId) -> Result<CacheHandle> {
        self.store.cache(id)
    }

    /// Registers a fresh case context, replacing any previous registration
    /// for the same identity (a re-run must not keep stale configuration)
    /// and dropping results published by an earlier run.
    fn register(&self, id: &TestId, config: &CaseConfig, layout: &SandboxLayout) {
        self.store.discard(id);
        self.cases.lock().expect("case lock poisoned").insert(
            id.clone(),
            CaseContext {
                config: config.clone(),
                layout: layout.clone(),
                state: CaseState::Created,
            },
        );
        tracing::debug!(test = %id, "case registered");
    }

    fn transition(&self, id: &TestId, state: CaseState) {
        let mut cases = self.cases.lock().expect("case lock poisoned");
        if let Some(context) = cases.get_mut(id) {
            context.state = state;
        }
        tracing::debug!(test = %id, state = ?state, "case state transition");
    }

    fn abort(&self, id: &TestId, error: Error) -> Error {
        let mut cases = self.cases.lock().expect("case lock poisoned");
        if let Some(context) = cases.get_mut(id) {
            context.state = CaseState::Aborted;
        }
        tracing::error!(test = %id, error = %error, "case aborted");
        error
    }

    #[allow(clippy::too_many_arguments)]
    fn write_artifacts(
        &self,
        id: &TestId,
        config: &CaseConfig,
        layout: &SandboxLayout,
        invocation: &BuildInvocation,
        outcome: &ExecutionOutcome,
        log: &crate::runner::CapturedLog,
        started: Instant,
    ) -> Result<()> {
        let stdout_path = layout.case_dir.join("mvn-stdout.log");
        let stderr_path = layout.case_dir.join("mvn-stderr.log");
        std::fs::write(&stdout_path, log.stdout()).map_err(|e| Error::io(&stdout_path, e))?;
        std::fs::write(&stderr_path, log.stderr()).map_err(|e| Error::io(&stderr_path, e))?;

        let report = CaseReport {
            run_id: &self.run_id,
            test: id.to_string(),
            project: &config.project,
            args: &invocation.args,
            exit_code: outcome.exit_code,
            status: outcome.status,
            duration_secs: started.elapsed().as_secs_f64(),
            finished_at: Utc::now(),
        };
        let report_path = layout.case_dir.join("result.json");
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::Config(format!("failed to serialize case report: {e}")))?;
        std::fs::write(&report_path, json).map_err(|e| Error::io(&report_path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CapturedLog, ExecutionStatus};
    use crate::sandbox::CacheScope;
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Runner that returns a canned outcome without launching anything.
    struct MockRunner {
        exit_code: i32,
    }

    #[async_trait]
    impl ToolRunner for MockRunner {
        async fn run(
            &self,
            invocation: &BuildInvocation,
            _timeout: Duration,
        ) -> crate::error::Result<(ExecutionOutcome, CapturedLog)> {
            Ok((
                ExecutionOutcome::from_exit_code(self.exit_code),
                CapturedLog {
                    stdout_lines: invocation.args.clone(),
                    stderr_lines: vec![],
                },
            ))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    /// Runner that always fails to launch.
    struct FailingRunner;

    #[async_trait]
    impl ToolRunner for FailingRunner {
        async fn run(
            &self,
            _invocation: &BuildInvocation,
            _timeout: Duration,
        ) -> crate::error::Result<(ExecutionOutcome, CapturedLog)> {
            Err(Error::ProcessLaunch {
                program: "mvn".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn create_fixture(root: &Path, name: &str) {
        let project = root.join(name);
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("pom.xml"), "<project/>").unwrap();
    }

    fn harness_with(temp: &TempDir, runner: Box<dyn ToolRunner>) -> Harness {
        let fixtures = temp.path().join("fixtures");
        create_fixture(&fixtures, "basic_project");
        let config = HarnessConfig::new("/usr/bin/mvn", fixtures, temp.path().join("its"));
        Harness::with_runner(config, runner)
    }

    fn id(method: &str) -> TestId {
        TestId::new("HarnessIT", method).expect("valid id")
    }

    #[tokio::test]
    async fn full_lifecycle_publishes_results() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 0 }));
        let test = id("lifecycle");

        harness.suite_start().expect("suite_start");
        let layout = harness
            .case_start(&test, CaseConfig::new("basic_project").with_goals(["verify"]))
            .expect("case_start");
        assert!(layout.project_dir.join("pom.xml").is_file());
        assert_eq!(harness.case_state(&test), Some(CaseState::FixtureStaged));

        let outcome = harness.invoke(&test).await.expect("invoke");
        assert!(outcome.is_successful());
        assert_eq!(harness.case_state(&test), Some(CaseState::ResultsPublished));

        harness.case_end(&test);
        assert_eq!(harness.case_state(&test), Some(CaseState::CaseComplete));
        harness.suite_end();

        // Published results resolve repeatedly.
        assert!(harness.execution(&test).expect("execution").is_successful());
        assert!(harness.log(&test).expect("log").stdout_contains("verify"));
        assert_eq!(harness.cache(&test).expect("cache").path, layout.cache_dir);
    }

    #[tokio::test]
    async fn results_are_unresolved_before_invoke() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 0 }));
        let test = id("early_lookup");

        harness.suite_start().expect("suite_start");
        harness
            .case_start(&test, CaseConfig::new("basic_project"))
            .expect("case_start");

        assert!(matches!(
            harness.execution(&test),
            Err(Error::NotResolved { .. })
        ));
    }

    #[tokio::test]
    async fn nonzero_exit_publishes_failure_outcome() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 1 }));
        let test = id("failing_build");

        harness.suite_start().expect("suite_start");
        harness
            .case_start(&test, CaseConfig::new("basic_project"))
            .expect("case_start");
        let outcome = harness.invoke(&test).await.expect("invoke");

        assert_eq!(outcome.status, ExecutionStatus::Failure);
        assert_eq!(outcome.exit_code, 1);
        // The case is not aborted; the failure is an inspectable result.
        assert_eq!(harness.case_state(&test), Some(CaseState::ResultsPublished));
    }

    #[tokio::test]
    async fn launch_failure_aborts_without_publishing() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(FailingRunner));
        let test = id("aborted");

        harness.suite_start().expect("suite_start");
        harness
            .case_start(&test, CaseConfig::new("basic_project"))
            .expect("case_start");

        let err = harness.invoke(&test).await.expect_err("invoke should fail");
        assert!(matches!(err, Error::ProcessLaunch { .. }));
        assert_eq!(harness.case_state(&test), Some(CaseState::Aborted));
        assert!(matches!(
            harness.execution(&test),
            Err(Error::NotResolved { .. })
        ));

        // case_end never promotes an aborted case to complete.
        harness.case_end(&test);
        assert_eq!(harness.case_state(&test), Some(CaseState::Aborted));
    }

    #[tokio::test]
    async fn missing_fixture_aborts_case_start() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 0 }));
        let test = id("no_fixture");

        harness.suite_start().expect("suite_start");
        let err = harness
            .case_start(&test, CaseConfig::new("missing_project"))
            .expect_err("case_start should fail");

        assert!(matches!(err, Error::FixtureNotFound(_)));
        assert_eq!(harness.case_state(&test), Some(CaseState::Aborted));
    }

    #[tokio::test]
    async fn case_start_requires_suite_start() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 0 }));

        let err = harness
            .case_start(&id("too_early"), CaseConfig::new("basic_project"))
            .expect_err("case_start should fail");
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn invoke_requires_staged_case() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 0 }));

        harness.suite_start().expect("suite_start");
        let err = harness
            .invoke(&id("never_started"))
            .await
            .expect_err("invoke should fail");
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn invoke_writes_case_artifacts() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 0 }));
        let test = id("artifacts");

        harness.suite_start().expect("suite_start");
        let layout = harness
            .case_start(&test, CaseConfig::new("basic_project").with_goals(["verify"]))
            .expect("case_start");
        harness.invoke(&test).await.expect("invoke");

        assert!(layout.case_dir.join("mvn-stdout.log").is_file());
        assert!(layout.case_dir.join("mvn-stderr.log").is_file());

        let report =
            std::fs::read_to_string(layout.case_dir.join("result.json")).expect("report");
        assert!(report.contains("\"exit_code\": 0"));
        assert!(report.contains(harness.run_id()));
    }

    #[tokio::test]
    async fn restarting_a_case_replaces_its_configuration() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 0 }));
        let test = id("restarted");

        harness.suite_start().expect("suite_start");
        harness
            .case_start(&test, CaseConfig::new("basic_project").with_goals(["clean"]))
            .expect("first case_start");
        harness.invoke(&test).await.expect("first invoke");

        // A second case_start must supersede the first run entirely: earlier
        // results are no longer resolvable and the new goals take effect.
        harness
            .case_start(&test, CaseConfig::new("basic_project").with_goals(["verify"]))
            .expect("second case_start");
        assert!(matches!(
            harness.execution(&test),
            Err(Error::NotResolved { .. })
        ));

        harness.invoke(&test).await.expect("second invoke");
        let log = harness.log(&test).expect("log");
        assert!(log.stdout_contains("verify"));
        assert!(!log.stdout_contains("clean"));
    }

    #[tokio::test]
    async fn global_scope_cases_share_one_cache() {
        let temp = TempDir::new().expect("temp dir");
        let harness = harness_with(&temp, Box::new(MockRunner { exit_code: 0 }));

        harness.suite_start().expect("suite_start");
        let config = CaseConfig::new("basic_project").with_cache(CacheScope::Global);
        let a = harness
            .case_start(&id("global_a"), config.clone())
            .expect("case_start a");
        let b = harness
            .case_start(&id("global_b"), config)
            .expect("case_start b");

        assert_eq!(a.cache_dir, b.cache_dir);
        assert_ne!(a.project_dir, b.project_dir);
    }
}
