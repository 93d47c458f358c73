//! Error types for the Outlook authentication core.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::auth::AuthError;

/// Guidance shown to users whenever no usable token exists.
pub const AUTHENTICATION_REQUIRED_MESSAGE: &str =
    "Authentication required. Please use the 'authenticate' tool to sign in to your Microsoft account first.";

/// Primary error type for crate-level operations.
#[derive(Error, Debug)]
pub enum OutlookError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("Authentication error: {0}")]
    Authentication(AuthError),
}

impl OutlookError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::AuthenticationRequired(_) => ErrorCategory::Unauthenticated,
            Self::Authentication(inner) => inner.category(),
        }
    }

    /// Whether the same call may succeed later without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transient)
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        self.category().into()
    }

    /// Text a tool handler can hand back to the end user instead of the raw error.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthenticationRequired(_) => AUTHENTICATION_REQUIRED_MESSAGE.to_string(),
            Self::Configuration(msg) => format!(
                "The server is missing its Microsoft application credentials: {msg}"
            ),
            other => format!("Authentication failed: {other}"),
        }
    }
}

impl From<AuthError> for OutlookError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::AuthenticationRequired(reason) => Self::AuthenticationRequired(reason),
            AuthError::Configuration(msg) => Self::Configuration(msg),
            other => Self::Authentication(other),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, OutlookError>;
