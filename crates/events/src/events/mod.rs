use serde::{Deserialize, Serialize};

use crate::meta::{EventLevel, EventSource};
use docsmith_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the taxonomy provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

// Declare all domain modules
pub mod build;
pub mod general;

// Re-export all domain events
pub use build::*;
pub use general::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Build engine events (run and step transitions)
    Build(BuildEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Build(_) => EventSource::BUILD,
        }
    }

    /// Default severity for routing this event to logging systems.
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::General(event) => match event {
                GeneralEvent::Warning { .. } => EventLevel::Warn,
                GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. } => {
                    EventLevel::Error
                }
                GeneralEvent::DebugLog { .. } => EventLevel::Debug,
                _ => EventLevel::Info,
            },
            Self::Build(event) => match event {
                BuildEvent::StepFailed { .. } | BuildEvent::RunFailed { .. } => EventLevel::Error,
                BuildEvent::StepCanceled { .. } | BuildEvent::RunCanceled { .. } => {
                    EventLevel::Warn
                }
                _ => EventLevel::Info,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsmith_errors::{Error, StepError};

    #[test]
    fn failure_context_carries_the_taxonomy_code() {
        let err: Error = StepError::ToolFailed {
            tool: "hhc".into(),
            code: 2,
            stderr_tail: String::new(),
        }
        .into();
        let failure = FailureContext::from_error(&err);
        assert_eq!(failure.code.as_deref(), Some("step.tool_failed"));
        assert!(failure.message.contains("hhc"));
    }

    #[test]
    fn events_serialize_with_domain_tag() {
        let event = AppEvent::General(GeneralEvent::warning("low disk space"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "general");
        assert_eq!(json["event"]["type"], "Warning");
    }

    #[test]
    fn failed_events_route_as_errors() {
        let event = AppEvent::General(GeneralEvent::OperationFailed {
            operation: "build".into(),
            error: "boom".into(),
        });
        assert_eq!(event.level(), EventLevel::Error);
    }
}
