//! CLI error handling

use std::fmt;
use std::path::PathBuf;

use docsmith_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Build file could not be read or parsed
    BuildFile { path: PathBuf, message: String },
    /// Engine error surfaced outside a run
    Engine(docsmith_errors::Error),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::BuildFile { path, message } => {
                write!(f, "Build file error in {}: {message}", path.display())
            }
            CliError::Engine(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Engine(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::BuildFile { .. } => None,
        }
    }
}

impl From<docsmith_errors::Error> for CliError {
    fn from(err: docsmith_errors::Error) -> Self {
        CliError::Engine(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}
