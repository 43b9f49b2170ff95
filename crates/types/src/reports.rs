//! Report type definitions for build runs

use crate::step::{BuildStep, StepOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in a run's append-only history.
///
/// Entries appear in catalog order; a skipped step still occupies its
/// catalog position with a zero duration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// The catalog step this entry records
    pub step: BuildStep,
    /// How the step resolved
    pub outcome: StepOutcome,
    /// Wall-clock time the step began (or was skipped)
    pub started_at: DateTime<Utc>,
    /// Time spent in the step's work unit and hooks
    pub duration_ms: u64,
}

/// Final report for one build run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildReport {
    /// Unique identifier of the run
    pub run_id: Uuid,
    /// Documentation set that was built
    pub project: String,
    /// Terminal state of the run (`Completed`, `Canceled`, or `Failed`)
    pub outcome: BuildStep,
    /// Per-step history up to and including the last step that resolved
    pub history: Vec<StepRecord>,
    /// Total execution time
    pub duration_ms: u64,
    /// The step whose failure ended the run, when `outcome` is `Failed`
    pub failed_step: Option<BuildStep>,
    /// User-facing description of the failure, when `outcome` is `Failed`
    pub error: Option<String>,
}

impl BuildReport {
    /// Whether the run reached `Completed`.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == BuildStep::Completed
    }

    /// Number of steps whose work unit actually ran and succeeded.
    #[must_use]
    pub fn steps_run(&self) -> usize {
        self.history
            .iter()
            .filter(|r| r.outcome == StepOutcome::Succeeded)
            .count()
    }

    /// Number of steps recorded as skipped.
    #[must_use]
    pub fn steps_skipped(&self) -> usize {
        self.history
            .iter()
            .filter(|r| r.outcome == StepOutcome::Skipped)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step: BuildStep, outcome: StepOutcome) -> StepRecord {
        StepRecord {
            step,
            outcome,
            started_at: Utc::now(),
            duration_ms: 5,
        }
    }

    #[test]
    fn report_counts_by_outcome() {
        let report = BuildReport {
            run_id: Uuid::new_v4(),
            project: "docs".into(),
            outcome: BuildStep::Completed,
            history: vec![
                record(BuildStep::Initializing, StepOutcome::Succeeded),
                record(BuildStep::ClearWorkFolder, StepOutcome::Skipped),
                record(BuildStep::ValidatingDocumentationSources, StepOutcome::Succeeded),
            ],
            duration_ms: 15,
            failed_step: None,
            error: None,
        };
        assert!(report.succeeded());
        assert_eq!(report.steps_run(), 2);
        assert_eq!(report.steps_skipped(), 1);
    }
}
