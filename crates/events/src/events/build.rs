use crate::events::FailureContext;
use docsmith_types::{BuildStep, StepOutcome, Uuid};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Build engine events: one per run transition and one per history
/// append, emitted in history order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// A run started walking the step catalog
    RunStarted {
        run_id: Uuid,
        project: String,
        step_count: usize,
    },

    /// A step's work unit is about to be invoked
    StepStarted {
        step: BuildStep,
        position: usize,
        total: usize,
    },

    /// A skip decision applied; the step's work unit never ran
    StepSkipped { step: BuildStep, plugin: String },

    /// The step's work unit (and its post-hooks) succeeded
    StepSucceeded { step: BuildStep, elapsed: Duration },

    /// The step failed; the run stops after this event's run-level twin
    StepFailed {
        step: BuildStep,
        elapsed: Duration,
        failure: FailureContext,
    },

    /// The step observed the cancellation request and aborted early
    StepCanceled { step: BuildStep, elapsed: Duration },

    /// Terminal: every catalog step succeeded or was skipped
    RunCompleted {
        run_id: Uuid,
        elapsed: Duration,
        steps_run: usize,
        steps_skipped: usize,
    },

    /// Terminal: the cancellation request was honored
    RunCanceled { run_id: Uuid, elapsed: Duration },

    /// Terminal: a step failed and no later step was started
    RunFailed {
        run_id: Uuid,
        step: BuildStep,
        elapsed: Duration,
        failure: FailureContext,
    },
}

impl BuildEvent {
    /// The per-step outcome this event records, when it records one.
    #[must_use]
    pub fn step_outcome(&self) -> Option<(BuildStep, StepOutcome)> {
        match self {
            Self::StepSkipped { step, .. } => Some((*step, StepOutcome::Skipped)),
            Self::StepSucceeded { step, .. } => Some((*step, StepOutcome::Succeeded)),
            Self::StepFailed { step, .. } => Some((*step, StepOutcome::Failed)),
            Self::StepCanceled { step, .. } => Some((*step, StepOutcome::Canceled)),
            _ => None,
        }
    }

    /// Whether this event ends a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RunCompleted { .. } | Self::RunCanceled { .. } | Self::RunFailed { .. }
        )
    }
}
