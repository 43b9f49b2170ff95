//! Per-run build context
//!
//! One `BuildContext` exists per run and is never shared across runs.
//! After a run starts, only the engine mutates it; the one exception is
//! the cancellation token, which any external actor may set at any time
//! through a cloned [`CancelToken`] handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use docsmith_errors::{Error, UserFacingError};
use docsmith_events::{EventEmitter, EventSender};
use docsmith_types::{BuildReport, BuildStep, StepOutcome, StepRecord, Uuid};

/// Clonable handle to a run's cancellation flag.
///
/// The flag is sticky: once requested there is no un-cancel for that
/// run. The engine samples it before each step; executors may poll it
/// cooperatively and bail out of long-running work early.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the run holding this token.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Mutable record of one build run's progress
#[derive(Debug)]
pub struct BuildContext {
    /// Unique identifier of the run
    run_id: Uuid,
    /// Documentation set being built
    project: String,
    /// Current step; `BuildStep::None` before the run starts, a terminal
    /// value once it ends
    current_step: BuildStep,
    /// Append-only audit trail, one entry per resolved step
    history: Vec<StepRecord>,
    /// Wall-clock time the context was created
    started_at: DateTime<Utc>,
    /// Cancellation flag, set externally and read at step boundaries
    cancel: CancelToken,
    /// The error that ended the run, set exactly once on `Failed`
    last_error: Option<Error>,
    /// Event sender for progress reporting
    event_sender: Option<EventSender>,
}

impl EventEmitter for BuildContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl BuildContext {
    /// Create a new context for one run.
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            project: project.into(),
            current_step: BuildStep::None,
            history: Vec::new(),
            started_at: Utc::now(),
            cancel: CancelToken::new(),
            last_error: None,
            event_sender: None,
        }
    }

    /// Set the event sender progress notifications go to.
    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Use an externally created cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Unique identifier of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Name of the documentation set being built.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The step the run is currently in (or its pre-start/terminal value).
    #[must_use]
    pub fn current_step(&self) -> BuildStep {
        self.current_step
    }

    /// The audit trail so far, in catalog order.
    #[must_use]
    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    /// The error that ended the run, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// A clonable handle to this run's cancellation flag.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether cancellation has been requested for this run.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_requested()
    }

    /// Wall-clock time the context was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Idempotent progress snapshot.
    ///
    /// Derived entirely from recorded data, so repeated calls without an
    /// intervening transition return identical values.
    #[must_use]
    pub fn snapshot(&self) -> BuildProgress {
        BuildProgress {
            current_step: self.current_step,
            resolved: self.history.len(),
            total: BuildStep::execution_order().len(),
            last_outcome: self.history.last().map(|r| r.outcome),
            recorded_ms: self.history.iter().map(|r| r.duration_ms).sum(),
        }
    }

    pub(crate) fn set_current(&mut self, step: BuildStep) {
        self.current_step = step;
    }

    pub(crate) fn record(
        &mut self,
        step: BuildStep,
        outcome: StepOutcome,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) {
        self.current_step = step;
        self.history.push(StepRecord {
            step,
            outcome,
            started_at,
            duration_ms: duration_ms(duration),
        });
    }

    pub(crate) fn set_last_error(&mut self, error: Error) {
        debug_assert!(self.last_error.is_none(), "last_error set twice");
        self.last_error = Some(error);
    }

    /// Convert the finished context into its report.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the run has not reached a terminal
    /// state yet.
    #[must_use]
    pub fn into_report(self, duration: Duration) -> BuildReport {
        debug_assert!(self.current_step.is_terminal(), "run not finished");
        let failed_step = self
            .history
            .iter()
            .rev()
            .find(|r| r.outcome == StepOutcome::Failed)
            .map(|r| r.step);
        BuildReport {
            run_id: self.run_id,
            project: self.project,
            outcome: self.current_step,
            history: self.history,
            duration_ms: duration_ms(duration),
            failed_step,
            error: self
                .last_error
                .as_ref()
                .map(|e| e.user_message().into_owned()),
        }
    }
}

/// Point-in-time view of a run's progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildProgress {
    /// The step the run is currently in
    pub current_step: BuildStep,
    /// Number of catalog steps already resolved (succeeded or skipped)
    pub resolved: usize,
    /// Total number of catalog steps
    pub total: usize,
    /// Outcome of the most recently resolved step
    pub last_outcome: Option<StepOutcome>,
    /// Sum of recorded step durations
    pub recorded_ms: u64,
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_sticky_and_shared() {
        let ctx = BuildContext::new("docs");
        let handle = ctx.cancel_token();
        assert!(!ctx.is_cancel_requested());
        handle.request();
        assert!(ctx.is_cancel_requested());
        handle.request();
        assert!(ctx.is_cancel_requested());
    }

    #[test]
    fn snapshot_is_stable_without_transitions() {
        let mut ctx = BuildContext::new("docs");
        ctx.record(
            BuildStep::Initializing,
            StepOutcome::Succeeded,
            Utc::now(),
            Duration::from_millis(12),
        );
        let first = ctx.snapshot();
        let second = ctx.snapshot();
        assert_eq!(first, second);
        assert_eq!(first.resolved, 1);
        assert_eq!(first.current_step, BuildStep::Initializing);
        assert_eq!(first.recorded_ms, 12);
    }

    #[test]
    fn report_names_the_failing_step() {
        let mut ctx = BuildContext::new("docs");
        ctx.record(
            BuildStep::Initializing,
            StepOutcome::Succeeded,
            Utc::now(),
            Duration::from_millis(1),
        );
        ctx.record(
            BuildStep::ClearWorkFolder,
            StepOutcome::Failed,
            Utc::now(),
            Duration::from_millis(1),
        );
        ctx.set_last_error(Error::internal("disk full"));
        ctx.set_current(BuildStep::Failed);
        let report = ctx.into_report(Duration::from_millis(2));
        assert_eq!(report.outcome, BuildStep::Failed);
        assert_eq!(report.failed_step, Some(BuildStep::ClearWorkFolder));
        assert!(report.error.unwrap().contains("disk full"));
    }
}
