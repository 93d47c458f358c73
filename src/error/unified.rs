//! Error classification and recovery.

use serde::{Deserialize, Serialize};

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or invalid client credentials. Reported once, never retried.
    Configuration,
    /// Identity provider or network trouble. The next call retries implicitly.
    Transient,
    /// No usable token on any path; the user has to sign in again.
    Unauthenticated,
    /// Token or index files could not be read or written.
    Storage,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverySuggestion {
    Reauthenticate,
    RetryLater,
    CheckConfiguration,
    CheckStorage,
    ContactSupport,
}

impl From<ErrorCategory> for RecoverySuggestion {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Configuration => Self::CheckConfiguration,
            ErrorCategory::Transient => Self::RetryLater,
            ErrorCategory::Unauthenticated => Self::Reauthenticate,
            ErrorCategory::Storage => Self::CheckStorage,
            ErrorCategory::Unknown => Self::ContactSupport,
        }
    }
}
