//! Harness and per-case configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sandbox::CacheScope;

/// Suite-level harness configuration.
///
/// The build tool executable must be named explicitly; there is no default
/// and no implicit PATH probing. A caller who wants PATH resolution passes a
/// bare program name deliberately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Path to (or bare name of) the build tool executable.
    pub tool: PathBuf,

    /// Read-only root under which fixture projects live.
    pub fixture_root: PathBuf,

    /// Base directory for all sandbox trees of this suite run.
    pub base_dir: PathBuf,
}

impl HarnessConfig {
    /// Creates a harness configuration.
    pub fn new(
        tool: impl Into<PathBuf>,
        fixture_root: impl Into<PathBuf>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool: tool.into(),
            fixture_root: fixture_root.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Loads a harness configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }
}

/// Configuration for one test case.
///
/// Immutable once supplied; every field feeds either the sandbox layout or
/// the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseConfig {
    /// Name of the fixture project to stage.
    pub project: String,

    /// Build goals, appended in declared order.
    #[serde(default)]
    pub goals: Vec<String>,

    /// Profiles to activate, joined into a single `-P` flag.
    #[serde(default)]
    pub profiles: Vec<String>,

    /// Whether to pass the tool's debug flag (`-X`).
    #[serde(default)]
    pub debug: bool,

    /// Cache scope for this case.
    #[serde(default)]
    pub cache: CacheScope,

    /// Extra environment variables for the build process.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Timeout in seconds for the build invocation.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    900 // 15 minutes
}

impl CaseConfig {
    /// Creates a case configuration for the named fixture project.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            goals: Vec::new(),
            profiles: Vec::new(),
            debug: false,
            cache: CacheScope::default(),
            env: HashMap::new(),
            timeout: default_timeout(),
        }
    }

    /// Loads a case configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Sets the build goals.
    pub fn with_goals<I, S>(mut self, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.goals = goals.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the active profiles.
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    /// Enables the debug flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the cache scope.
    pub fn with_cache(mut self, cache: CacheScope) -> Self {
        self.cache = cache;
        self
    }

    /// Adds an environment variable for the build process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    /// Returns the timeout as a Duration.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_config_has_sensible_defaults() {
        let config = CaseConfig::new("basic_project");

        assert_eq!(config.project, "basic_project");
        assert!(config.goals.is_empty());
        assert!(config.profiles.is_empty());
        assert!(!config.debug);
        assert_eq!(config.cache, CacheScope::PerTest);
        assert_eq!(config.timeout, 900);
    }

    #[test]
    fn case_config_builder_works() {
        let config = CaseConfig::new("proj")
            .with_goals(["clean", "verify"])
            .with_profiles(["ci"])
            .with_debug(true)
            .with_cache(CacheScope::Global)
            .with_env("JAVA_HOME", "/opt/jdk")
            .with_timeout(60);

        assert_eq!(config.goals, vec!["clean", "verify"]);
        assert_eq!(config.profiles, vec!["ci"]);
        assert!(config.debug);
        assert_eq!(config.cache, CacheScope::Global);
        assert_eq!(config.env.get("JAVA_HOME").map(String::as_str), Some("/opt/jdk"));
        assert_eq!(config.timeout_duration(), Duration::from_secs(60));
    }

    #[test]
    fn case_config_parses_minimal_yaml() {
        let yaml = r#"
project: basic_project
"#;
        let config: CaseConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.project, "basic_project");
        assert!(config.goals.is_empty());
        assert_eq!(config.cache, CacheScope::PerTest);
    }

    #[test]
    fn case_config_parses_full_yaml() {
        let yaml = r#"
project: multi_module
goals:
  - clean
  - verify
profiles:
  - ci
  - release
debug: true
cache: global
timeout: 1800
"#;
        let config: CaseConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.goals, vec!["clean", "verify"]);
        assert_eq!(config.profiles, vec!["ci", "release"]);
        assert!(config.debug);
        assert_eq!(config.cache, CacheScope::Global);
        assert_eq!(config.timeout, 1800);
    }

    #[test]
    fn harness_config_round_trips_through_toml() {
        let config = HarnessConfig::new("/usr/bin/mvn", "/its/projects", "/tmp/its");
        let toml = toml::to_string(&config).unwrap();
        let parsed: HarnessConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.tool, PathBuf::from("/usr/bin/mvn"));
        assert_eq!(parsed.fixture_root, PathBuf::from("/its/projects"));
    }
}
