//! Error types for hydra-connect
//!
//! This module defines the failure taxonomy of the connector.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::types::Method;
use thiserror::Error;

/// The main error type for hydra-connect
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Session Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cannot find hydra_session cookie")]
    SessionCookieMissing,

    #[error("Logout returned status: {status}")]
    LogoutFailed { status: u16 },

    // ============================================================================
    // Operation Errors
    // ============================================================================
    #[error("{method} operation returned status: {status}{}", format_detail(.message))]
    OperationFailed {
        method: Method,
        status: u16,
        message: Option<String>,
    },

    #[error("Download file operation returned status: {status}")]
    DownloadFailed { status: u16 },

    #[error("Unknown protocol: {scheme}")]
    UnsupportedProtocol { scheme: String },

    #[error("Too many redirects (more than {max})")]
    TooManyRedirects { max: u32 },

    #[error("Redirect with status {status} has no Location header")]
    MissingRedirectLocation { status: u16 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

fn format_detail(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(" ({m})"),
        _ => String::new(),
    }
}

impl Error {
    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an operation error for a generic GET/PUT/DELETE
    pub fn operation(method: Method, status: u16, message: Option<String>) -> Self {
        Self::OperationFailed {
            method,
            status,
            message,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::LogoutFailed { status }
            | Error::OperationFailed { status, .. }
            | Error::DownloadFailed { status }
            | Error::MissingRedirectLocation { status } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error means the caller lacks a valid identity
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::AuthenticationFailed { .. } | Error::SessionCookieMissing => true,
            _ => matches!(self.status(), Some(401 | 403)),
        }
    }
}

/// Result type alias for hydra-connect
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::auth("Bad username or password.");
        assert_eq!(
            err.to_string(),
            "Authentication failed: Bad username or password."
        );

        let err = Error::LogoutFailed { status: 403 };
        assert_eq!(err.to_string(), "Logout returned status: 403");

        let err = Error::DownloadFailed { status: 404 };
        assert_eq!(
            err.to_string(),
            "Download file operation returned status: 404"
        );

        let err = Error::UnsupportedProtocol {
            scheme: "ftp".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown protocol: ftp");
    }

    #[test]
    fn test_operation_failed_display() {
        let err = Error::operation(Method::GET, 404, None);
        assert_eq!(err.to_string(), "GET operation returned status: 404");

        let err = Error::operation(
            Method::PUT,
            403,
            Some("You must be logged in".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "PUT operation returned status: 403 (You must be logged in)"
        );

        let err = Error::operation(Method::DELETE, 500, Some(String::new()));
        assert_eq!(err.to_string(), "DELETE operation returned status: 500");
    }

    #[test]
    fn test_status() {
        assert_eq!(Error::LogoutFailed { status: 500 }.status(), Some(500));
        assert_eq!(Error::DownloadFailed { status: 404 }.status(), Some(404));
        assert_eq!(Error::operation(Method::GET, 401, None).status(), Some(401));
        assert_eq!(Error::SessionCookieMissing.status(), None);
        assert_eq!(Error::Cancelled.status(), None);
    }

    #[test]
    fn test_is_auth_error() {
        assert!(Error::auth("nope").is_auth_error());
        assert!(Error::SessionCookieMissing.is_auth_error());
        assert!(Error::operation(Method::PUT, 403, None).is_auth_error());
        assert!(Error::operation(Method::GET, 401, None).is_auth_error());

        assert!(!Error::operation(Method::GET, 404, None).is_auth_error());
        assert!(!Error::DownloadFailed { status: 500 }.is_auth_error());
        assert!(!Error::config("test").is_auth_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
