//! Step execution error types
//!
//! The opaque work bound to a build step usually drives an external
//! tool; every way that work can fail is translated into one of these
//! variants rather than escaping the step boundary uncaught.

use std::borrow::Cow;

use crate::UserFacingError;
use docsmith_types::BuildStep;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StepError {
    #[error("{tool} exited with code {code}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr_tail: String,
    },

    #[error("{tool} was terminated by a signal")]
    ToolKilled { tool: String },

    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("malformed intermediate artifact {path}: {message}")]
    MalformedArtifact { path: String, message: String },

    #[error("expected artifact missing: {path}")]
    MissingArtifact { path: String },

    #[error("step execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("no executor bound to step {step}")]
    NoExecutor { step: BuildStep },

    #[error("unexpected error: {message}")]
    Unexpected { message: String },
}

impl StepError {
    /// Wrap a caught panic payload as an unexpected error.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "step panicked".to_string());
        Self::Unexpected { message }
    }
}

impl UserFacingError for StepError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ToolNotFound { .. } => {
                Some("Install the tool or correct its path in the build file.")
            }
            Self::ToolFailed { .. } => {
                Some("Inspect the tool output above; the build log keeps the full history.")
            }
            Self::MalformedArtifact { .. } | Self::MissingArtifact { .. } => {
                Some("An earlier step produced incomplete output; re-run the build from scratch.")
            }
            Self::NoExecutor { .. } => {
                Some("Bind a tool to this step in the build file or register a default executor.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::ToolKilled { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ToolFailed { .. } => "step.tool_failed",
            Self::ToolKilled { .. } => "step.tool_killed",
            Self::ToolNotFound { .. } => "step.tool_not_found",
            Self::MalformedArtifact { .. } => "step.malformed_artifact",
            Self::MissingArtifact { .. } => "step.missing_artifact",
            Self::ExecutionFailed { .. } => "step.execution_failed",
            Self::NoExecutor { .. } => "step.no_executor",
            Self::Unexpected { .. } => "step.unexpected",
        };
        Some(code)
    }
}
