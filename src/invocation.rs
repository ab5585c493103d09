//! Build invocation assembly.
//!
//! Argument order is a contract: defaults, then profiles, then debug, then
//! goals. Later flags override earlier ones in the target tool, and log
//! assertions in test bodies depend on stable ordering.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::CaseConfig;
use crate::sandbox::SandboxLayout;

/// Flag prefix pointing the tool's artifact cache at the sandbox.
const CACHE_FLAG_PREFIX: &str = "-Dmaven.repo.local=";

/// Baseline flags passed on every invocation: non-interactive mode plus the
/// version banner (keeps the tool version visible in every captured log).
const BASELINE_FLAGS: [&str; 2] = ["--batch-mode", "-V"];

/// Profile-selection flag prefix; profiles are joined by comma.
const PROFILE_FLAG_PREFIX: &str = "-P";

/// Debug/verbose output flag.
const DEBUG_FLAG: &str = "-X";

/// One execution of the build tool: program, working directory, arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    /// The build tool executable.
    pub program: PathBuf,
    /// Current directory for the child process (the staged project).
    pub working_dir: PathBuf,
    /// Arguments in their significant order.
    pub args: Vec<String>,
    /// Extra environment variables for the child process.
    pub env: HashMap<String, String>,
}

impl BuildInvocation {
    /// Assembles the invocation for a test case.
    ///
    /// Rebuilding from the same configuration and layout always yields an
    /// identical argument sequence.
    pub fn assemble(tool: &Path, layout: &SandboxLayout, config: &CaseConfig) -> Self {
        let mut args = Vec::new();

        args.push(format!(
            "{CACHE_FLAG_PREFIX}{}",
            layout.cache_dir.display()
        ));
        args.extend(BASELINE_FLAGS.iter().map(|f| f.to_string()));

        if !config.profiles.is_empty() {
            args.push(format!("{PROFILE_FLAG_PREFIX}{}", config.profiles.join(",")));
        }

        if config.debug {
            args.push(DEBUG_FLAG.to_string());
        }

        args.extend(config.goals.iter().cloned());

        Self {
            program: tool.to_path_buf(),
            working_dir: layout.project_dir.clone(),
            args,
            env: config.env.clone(),
        }
    }
}
