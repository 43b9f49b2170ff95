//! Build file loading
//!
//! A build file names the documentation set, binds external tools to
//! catalog steps, and lists steps to leave out of the run. Everything
//! else about the build lives with the tools themselves.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docsmith_engine::{
    BuildContext, BuildPlugin, ExecutorRegistry, PluginCapabilities, PluginHost, ProcessExecutor,
};
use docsmith_types::BuildStep;
use serde::Deserialize;

use crate::error::CliError;

/// One external tool invocation bound to a build step
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSpec {
    /// Program to run
    pub command: String,
    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the invocation
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl ToolSpec {
    fn executor(&self) -> ProcessExecutor {
        let mut executor = ProcessExecutor::new(&self.command).args(self.args.clone());
        if let Some(cwd) = &self.cwd {
            executor = executor.current_dir(cwd);
        }
        for (key, value) in &self.env {
            executor = executor.env(key, value);
        }
        executor
    }
}

/// Parsed build file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildFile {
    /// Name of the documentation set
    pub project: String,
    /// Steps to leave out of this build
    #[serde(default)]
    pub skip: Vec<BuildStep>,
    /// Per-step tool bindings
    #[serde(default)]
    pub tools: HashMap<BuildStep, ToolSpec>,
    /// Fallback tool for steps without a specific binding
    #[serde(default)]
    pub default_tool: Option<ToolSpec>,
}

impl BuildFile {
    /// Load and validate a build file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError::BuildFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file: BuildFile = toml::from_str(&text).map_err(|e| CliError::BuildFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate().map_err(|message| CliError::BuildFile {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(file)
    }

    fn validate(&self) -> Result<(), String> {
        for step in &self.skip {
            if !step.can_skip() {
                return Err(format!("step {step} cannot be skipped"));
            }
        }
        if let Some(step) = self.tools.keys().find(|s| s.position().is_none()) {
            return Err(format!("{step} is not an executable catalog step"));
        }
        Ok(())
    }

    /// Executor bindings described by this build file.
    pub fn executor_registry(&self) -> ExecutorRegistry {
        let mut registry = ExecutorRegistry::new();
        for (step, spec) in &self.tools {
            registry.register(*step, Arc::new(spec.executor()));
        }
        if let Some(spec) = &self.default_tool {
            registry.register_default(Arc::new(spec.executor()));
        }
        registry
    }

    /// Plug-in host carrying the build file's skip list.
    pub fn plugin_host(&self) -> Result<PluginHost, CliError> {
        let mut host = PluginHost::new();
        if !self.skip.is_empty() {
            host.register(
                Arc::new(SkipListPlugin {
                    steps: self.skip.iter().copied().collect(),
                }),
                self.skip.clone(),
                PluginCapabilities::SKIP,
            )
            .map_err(CliError::Engine)?;
        }
        Ok(host)
    }
}

/// Skip predicate backed by the build file's `skip` list
struct SkipListPlugin {
    steps: HashSet<BuildStep>,
}

impl BuildPlugin for SkipListPlugin {
    fn name(&self) -> &str {
        "build-file-skip-list"
    }

    fn should_skip(&self, step: BuildStep, _ctx: &BuildContext) -> bool {
        self.steps.contains(&step)
    }
}
