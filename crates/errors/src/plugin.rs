//! Plug-in hook error types

use std::borrow::Cow;

use crate::UserFacingError;
use docsmith_types::BuildStep;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PluginError {
    #[error("plug-in {plugin} aborted {step}: {message}")]
    HookAborted {
        plugin: String,
        step: BuildStep,
        message: String,
    },

    #[error("plug-in {plugin} panicked in a hook for {step}: {message}")]
    HookPanicked {
        plugin: String,
        step: BuildStep,
        message: String,
    },

    #[error("invalid plug-in registration for {plugin}: {reason}")]
    InvalidRegistration { plugin: String, reason: String },
}

impl UserFacingError for PluginError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::HookAborted { .. } => {
                Some("The plug-in vetoed the build; check its configuration.")
            }
            Self::HookPanicked { .. } => Some("Report this to the plug-in author."),
            Self::InvalidRegistration { .. } => {
                Some("Plug-ins may only attach to executable catalog steps, before the run starts.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::HookAborted { .. } => "plugin.hook_aborted",
            Self::HookPanicked { .. } => "plugin.hook_panicked",
            Self::InvalidRegistration { .. } => "plugin.invalid_registration",
        };
        Some(code)
    }
}
