//! CLI error handling

use std::fmt;

use fetchr_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(fetchr_errors::Error),
    /// Transfer error
    Fetch(fetchr_errors::Error),
    /// Interrupted by the user
    Cancelled,
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Fetch(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this download.")?;
                }
                Ok(())
            }
            CliError::Cancelled => write!(f, "Download cancelled"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) | CliError::Fetch(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Cancelled => None,
        }
    }
}

impl From<fetchr_errors::Error> for CliError {
    fn from(e: fetchr_errors::Error) -> Self {
        if e.is_cancelled() {
            CliError::Cancelled
        } else {
            CliError::Fetch(e)
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl CliError {
    /// Underlying library error, if any
    pub fn source_error(&self) -> Option<&fetchr_errors::Error> {
        match self {
            CliError::Config(e) | CliError::Fetch(e) => Some(e),
            CliError::Cancelled | CliError::Io(_) => None,
        }
    }

    /// Failure class shown in JSON output
    pub fn failure_kind(&self) -> Option<String> {
        match self {
            CliError::Config(e) | CliError::Fetch(e) => Some(e.failure_kind().to_string()),
            CliError::Cancelled => Some(fetchr_errors::FailureKind::Cancelled.to_string()),
            CliError::Io(_) => None,
        }
    }
}
