//! Step executors
//!
//! An executor is the opaque work unit bound to a catalog step. The
//! engine invokes it at most once per run and observes only its
//! aggregate outcome; anything the work does internally (parallelism,
//! external processes, I/O) is its own business, as long as every
//! failure is translated into an error instead of escaping uncaught.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use docsmith_errors::{Error, Result, StepError};
use docsmith_events::{AppEvent, EventEmitter, GeneralEvent};
use docsmith_types::BuildStep;

use crate::context::BuildContext;

/// The opaque work unit bound to a build step.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run the work for `step`.
    ///
    /// A long-running executor may poll `ctx.is_cancel_requested()` and
    /// return `Error::Cancelled` to abort early; the engine records the
    /// step as canceled, not failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying work fails; the run stops at
    /// this step.
    async fn execute(&self, step: BuildStep, ctx: &BuildContext) -> Result<()>;
}

/// Executor adapter over a plain closure. Useful for embedders and tests.
pub struct FnExecutor<F> {
    func: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(BuildStep, &BuildContext) -> Result<()> + Send + Sync,
{
    /// Wrap a closure as an executor.
    #[must_use]
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> StepExecutor for FnExecutor<F>
where
    F: Fn(BuildStep, &BuildContext) -> Result<()> + Send + Sync,
{
    async fn execute(&self, step: BuildStep, ctx: &BuildContext) -> Result<()> {
        (self.func)(step, ctx)
    }
}

/// Executor that runs an external tool and translates its exit status.
///
/// Spawn failure, non-zero exit, and signal death all become
/// [`StepError`] values; the tail of the tool's stderr is carried in the
/// error so the failure report is useful without digging through logs.
pub struct ProcessExecutor {
    tool: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

/// Longest stderr tail carried into an error message.
const STDERR_TAIL_BYTES: usize = 2048;

impl ProcessExecutor {
    /// Create an executor for the given tool.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Append arguments to the tool invocation.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the tool.
    #[must_use]
    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable for the tool.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The tool this executor invokes.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }
}

#[async_trait]
impl StepExecutor for ProcessExecutor {
    async fn execute(&self, step: BuildStep, ctx: &BuildContext) -> Result<()> {
        let mut cmd = tokio::process::Command::new(&self.tool);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StepError::ToolNotFound {
                    tool: self.tool.clone(),
                }
                .into());
            }
            Err(err) => return Err(Error::from(err)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            let mut context = HashMap::new();
            context.insert("step".to_string(), step.to_string());
            context.insert("tool".to_string(), self.tool.clone());
            ctx.emit(AppEvent::General(GeneralEvent::DebugLog {
                message: stdout.trim_end().to_string(),
                context,
            }));
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        match output.status.code() {
            Some(code) => Err(StepError::ToolFailed {
                tool: self.tool.clone(),
                code,
                stderr_tail: tail(&stderr, STDERR_TAIL_BYTES),
            }
            .into()),
            None => Err(StepError::ToolKilled {
                tool: self.tool.clone(),
            }
            .into()),
        }
    }
}

/// Registry mapping catalog steps to their executors.
///
/// A step resolves to its specific binding first, then to the default
/// binding. A step with neither fails the run; nothing is silently
/// skipped.
#[derive(Default)]
pub struct ExecutorRegistry {
    bindings: HashMap<BuildStep, Arc<dyn StepExecutor>>,
    default: Option<Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an executor to one step.
    pub fn register(&mut self, step: BuildStep, executor: Arc<dyn StepExecutor>) {
        self.bindings.insert(step, executor);
    }

    /// Bind one executor to several steps.
    pub fn register_many<I>(&mut self, steps: I, executor: Arc<dyn StepExecutor>)
    where
        I: IntoIterator<Item = BuildStep>,
    {
        for step in steps {
            self.bindings.insert(step, Arc::clone(&executor));
        }
    }

    /// Bind the fallback executor used by steps without a specific binding.
    pub fn register_default(&mut self, executor: Arc<dyn StepExecutor>) {
        self.default = Some(executor);
    }

    /// Resolve the executor for a step, specific binding first.
    #[must_use]
    pub fn get(&self, step: BuildStep) -> Option<&Arc<dyn StepExecutor>> {
        self.bindings.get(&step).or(self.default.as_ref())
    }

    /// Whether the step would resolve to any executor.
    #[must_use]
    pub fn is_bound(&self, step: BuildStep) -> bool {
        self.bindings.contains_key(&step) || self.default.is_some()
    }
}

fn tail(text: &str, max_bytes: usize) -> String {
    let trimmed = text.trim_end();
    if trimmed.len() <= max_bytes {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - max_bytes;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_prefers_specific_binding_over_default() {
        let mut registry = ExecutorRegistry::new();
        let specific: Arc<dyn StepExecutor> = Arc::new(FnExecutor::new(|_: BuildStep, _: &BuildContext| Ok(())));
        let fallback: Arc<dyn StepExecutor> = Arc::new(FnExecutor::new(|_: BuildStep, _: &BuildContext| {
            Err(Error::internal("fallback ran"))
        }));
        registry.register(BuildStep::Initializing, Arc::clone(&specific));
        registry.register_default(fallback);

        assert!(registry.is_bound(BuildStep::Initializing));
        assert!(registry.is_bound(BuildStep::CompilingHelpFile));
        assert!(Arc::ptr_eq(
            registry.get(BuildStep::Initializing).unwrap(),
            &specific
        ));
    }

    #[test]
    fn unbound_registry_resolves_nothing() {
        let registry = ExecutorRegistry::new();
        assert!(registry.get(BuildStep::Initializing).is_none());
        assert!(!registry.is_bound(BuildStep::Initializing));
    }

    #[test]
    fn tail_keeps_the_end_of_long_output() {
        let text = "a".repeat(10) + "END";
        assert_eq!(tail(&text, 3), "END");
        assert_eq!(tail("short", 100), "short");
    }

    #[tokio::test]
    async fn process_executor_translates_exit_codes() {
        let ctx = BuildContext::new("docs");
        let ok = ProcessExecutor::new("true");
        assert!(ok.execute(BuildStep::Initializing, &ctx).await.is_ok());

        let fail = ProcessExecutor::new("false");
        let err = fail
            .execute(BuildStep::Initializing, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Step(StepError::ToolFailed { code: 1, .. })
        ));
    }

    #[tokio::test]
    async fn process_executor_reports_missing_tools() {
        let ctx = BuildContext::new("docs");
        let missing = ProcessExecutor::new("docsmith-no-such-tool");
        let err = missing
            .execute(BuildStep::Initializing, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Step(StepError::ToolNotFound { .. })));
    }
}
