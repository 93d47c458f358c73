use thiserror::Error;

use crate::error::{ErrorCategory, AUTHENTICATION_REQUIRED_MESSAGE};

/// Authentication and token storage errors.
///
/// Only [`AuthError::AuthenticationRequired`] ever crosses the authentication
/// gate; the remaining variants stay inside the storage and refresh layers,
/// which report failure to their callers as `None`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Token refresh rejected (HTTP {status}): {message}")]
    RefreshRejected { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timed out waiting for the identity provider")]
    Timeout,
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    pub(crate) fn required(reason: impl Into<String>) -> Self {
        Self::AuthenticationRequired(reason.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthenticationRequired(_) => ErrorCategory::Unauthenticated,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::RefreshRejected { .. }
            | Self::InvalidResponse(_)
            | Self::Network(_)
            | Self::Timeout => ErrorCategory::Transient,
            Self::Io(_) | Self::Serialization(_) => ErrorCategory::Storage,
        }
    }

    /// Text a tool handler can hand back to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthenticationRequired(_) => AUTHENTICATION_REQUIRED_MESSAGE.to_string(),
            other => format!("Authentication failed: {other}"),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_failures_are_transient() {
        let err = AuthError::RefreshRejected {
            status: 400,
            message: "invalid_grant".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Transient);
        assert!(err.user_message().contains("invalid_grant"));
        assert_eq!(AuthError::Timeout.category(), ErrorCategory::Transient);
    }

    #[test]
    fn storage_conversions() {
        let io = AuthError::from(std::io::Error::other("denied"));
        assert_eq!(io.category(), ErrorCategory::Storage);
        let parse = AuthError::from(serde_json::from_str::<u8>("x").unwrap_err());
        assert!(matches!(parse, AuthError::Serialization(_)));
    }

    #[test]
    fn required_carries_guidance() {
        let err = AuthError::required("no accounts configured");
        assert_eq!(err.category(), ErrorCategory::Unauthenticated);
        assert_eq!(err.user_message(), AUTHENTICATION_REQUIRED_MESSAGE);
    }
}
