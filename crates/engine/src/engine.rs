//! The build engine state machine
//!
//! The engine walks the step catalog in order and supervises one run to
//! a terminal state. For each step: sample the cancellation flag, ask
//! the plug-in host for a skip decision, run pre-hooks, invoke the
//! step's executor, run post-hooks, then record the outcome and notify
//! observers. A failure anywhere stops the run; no later step starts on
//! a half-built output tree.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use chrono::Utc;
use docsmith_errors::{Error, StepError};
use docsmith_events::{AppEvent, BuildEvent, EventEmitter, FailureContext};
use docsmith_types::{BuildReport, BuildStep, StepOutcome};
use futures::FutureExt;

use crate::context::BuildContext;
use crate::executor::ExecutorRegistry;
use crate::plugins::PluginHost;

/// Drives one build run through the step catalog.
///
/// The engine itself holds no per-run state: every run owns its
/// [`BuildContext`], which `run` consumes and returns as a report.
/// Independent runs may execute concurrently on separate contexts.
pub struct BuildEngine {
    executors: ExecutorRegistry,
    plugins: PluginHost,
}

impl BuildEngine {
    /// Create an engine over a set of executor bindings.
    #[must_use]
    pub fn new(executors: ExecutorRegistry) -> Self {
        Self {
            executors,
            plugins: PluginHost::new(),
        }
    }

    /// Attach a plug-in host. Registration must already be complete.
    #[must_use]
    pub fn with_plugins(mut self, plugins: PluginHost) -> Self {
        self.plugins = plugins;
        self
    }

    /// The plug-in host attached to this engine.
    #[must_use]
    pub fn plugins(&self) -> &PluginHost {
        &self.plugins
    }

    /// Run the full catalog and resolve the context to a terminal state.
    ///
    /// Always returns a report with exactly one of `Completed`,
    /// `Canceled`, or `Failed` as its outcome; it never panics on
    /// executor or hook faults (those are caught and recorded as the
    /// failure that ended the run).
    pub async fn run(&self, mut ctx: BuildContext) -> BuildReport {
        let order = BuildStep::execution_order();
        let run_started = Instant::now();

        ctx.emit(AppEvent::Build(BuildEvent::RunStarted {
            run_id: ctx.run_id(),
            project: ctx.project().to_string(),
            step_count: order.len(),
        }));

        for (idx, &step) in order.iter().enumerate() {
            // Cancellation wins over everything not yet started.
            if ctx.is_cancel_requested() {
                return Self::finish_canceled(ctx, run_started);
            }

            if step.can_skip() {
                match self.plugins.skip_decision(step, &ctx) {
                    Ok(Some(plugin)) => {
                        ctx.record(step, StepOutcome::Skipped, Utc::now(), Duration::ZERO);
                        ctx.emit(AppEvent::Build(BuildEvent::StepSkipped { step, plugin }));
                        continue;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        return Self::fail_step(
                            ctx,
                            step,
                            Duration::ZERO,
                            err,
                            run_started,
                        );
                    }
                }
            }

            ctx.set_current(step);
            ctx.emit(AppEvent::Build(BuildEvent::StepStarted {
                step,
                position: idx + 1,
                total: order.len(),
            }));

            let step_started = Instant::now();

            if let Err(err) = self.plugins.run_pre_hooks(step, &ctx).await {
                return Self::fail_step(ctx, step, step_started.elapsed(), err, run_started);
            }

            match self.invoke_executor(step, &ctx).await {
                Ok(()) => {
                    if let Err(err) = self.plugins.run_post_hooks(step, &ctx).await {
                        return Self::fail_step(
                            ctx,
                            step,
                            step_started.elapsed(),
                            err,
                            run_started,
                        );
                    }
                    let elapsed = step_started.elapsed();
                    ctx.record(step, StepOutcome::Succeeded, Utc::now(), elapsed);
                    ctx.emit(AppEvent::Build(BuildEvent::StepSucceeded { step, elapsed }));
                }
                Err(err) if err.is_cancellation() => {
                    // A cooperative abort mid-step is a cancellation,
                    // never a failure; no later step starts.
                    let elapsed = step_started.elapsed();
                    ctx.record(step, StepOutcome::Canceled, Utc::now(), elapsed);
                    ctx.emit(AppEvent::Build(BuildEvent::StepCanceled { step, elapsed }));
                    return Self::finish_canceled(ctx, run_started);
                }
                Err(err) => {
                    return Self::fail_step(ctx, step, step_started.elapsed(), err, run_started);
                }
            }
        }

        Self::finish_completed(ctx, run_started)
    }

    /// Invoke the step's executor, keeping its faults inside the engine:
    /// a panic is recorded as the unexpected-error class, an unbound
    /// step as a dedicated error.
    async fn invoke_executor(&self, step: BuildStep, ctx: &BuildContext) -> Result<(), Error> {
        let Some(executor) = self.executors.get(step) else {
            return Err(StepError::NoExecutor { step }.into());
        };
        AssertUnwindSafe(executor.execute(step, ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(StepError::from_panic(payload.as_ref()).into()))
    }

    fn finish_completed(mut ctx: BuildContext, run_started: Instant) -> BuildReport {
        let steps_run = ctx
            .history()
            .iter()
            .filter(|r| r.outcome == StepOutcome::Succeeded)
            .count();
        let steps_skipped = ctx.history().len() - steps_run;
        ctx.set_current(BuildStep::Completed);
        ctx.emit(AppEvent::Build(BuildEvent::RunCompleted {
            run_id: ctx.run_id(),
            elapsed: run_started.elapsed(),
            steps_run,
            steps_skipped,
        }));
        ctx.into_report(run_started.elapsed())
    }

    fn finish_canceled(mut ctx: BuildContext, run_started: Instant) -> BuildReport {
        ctx.set_current(BuildStep::Canceled);
        ctx.emit(AppEvent::Build(BuildEvent::RunCanceled {
            run_id: ctx.run_id(),
            elapsed: run_started.elapsed(),
        }));
        ctx.into_report(run_started.elapsed())
    }

    fn fail_step(
        mut ctx: BuildContext,
        step: BuildStep,
        step_elapsed: Duration,
        err: Error,
        run_started: Instant,
    ) -> BuildReport {
        let failure = FailureContext::from_error(&err);
        ctx.record(step, StepOutcome::Failed, Utc::now(), step_elapsed);
        ctx.set_last_error(err);
        ctx.emit(AppEvent::Build(BuildEvent::StepFailed {
            step,
            elapsed: step_elapsed,
            failure: failure.clone(),
        }));
        ctx.set_current(BuildStep::Failed);
        ctx.emit(AppEvent::Build(BuildEvent::RunFailed {
            run_id: ctx.run_id(),
            step,
            elapsed: run_started.elapsed(),
            failure,
        }));
        ctx.into_report(run_started.elapsed())
    }
}
