//! Error types for the SSO end-to-end helpers.

use crate::models::StatusMismatch;
use thiserror::Error;

/// Result alias used across the crate.
pub type E2eResult<T> = Result<T, E2eError>;

/// Configuration errors raised while loading [`crate::E2eConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Errors produced by the provisioning helpers and the browser flow.
#[derive(Debug, Error)]
pub enum E2eError {
    // Users service
    /// Transport-level failure talking to the Users service.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A create request answered with something other than 201 or 400.
    #[error("got unexpected status {status} for {email}")]
    UnexpectedStatus { email: String, status: u16 },

    /// One or more users did not answer with the expected status.
    #[error("{} user(s) returned an unexpected status: {}", .0.len(), format_mismatches(.0))]
    StatusMismatch(Vec<StatusMismatch>),

    // Tokens
    /// Service token could not be signed.
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    // Browser
    /// Could not open a WebDriver session.
    #[error("Failed to start browser session: {0}")]
    SessionStart(String),

    /// A WebDriver command failed.
    #[error("Browser command failed: {0}")]
    Browser(String),

    /// No element matched the selector.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The page never navigated to a URL matching the pattern.
    #[error("Timed out waiting for navigation to /{pattern}/ (last URL: {last_url})")]
    NavigationTimeout { pattern: String, last_url: String },

    /// The page reported a URL that could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Config
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl E2eError {
    /// Whether this error came from the browser side of the flow.
    #[must_use]
    pub fn is_browser_error(&self) -> bool {
        matches!(
            self,
            E2eError::SessionStart(_)
                | E2eError::Browser(_)
                | E2eError::ElementNotFound(_)
                | E2eError::NavigationTimeout { .. }
        )
    }
}

fn format_mismatches(mismatches: &[StatusMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| format!("{} (expected {}, got {})", m.email, m.expected, m.actual))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<fantoccini::error::CmdError> for E2eError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        E2eError::Browser(e.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for E2eError {
    fn from(e: fantoccini::error::NewSessionError) -> Self {
        E2eError::SessionStart(e.to_string())
    }
}
