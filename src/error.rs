//! Error types and handling for Ekiwi
//!
//! This module defines the error types used throughout the crate. Remote
//! failures reported inside the response envelope are kept separate from
//! transport failures so callers can tell a rejected login from a dead
//! network link.

use thiserror::Error;

/// Result type alias for Ekiwi operations
pub type Result<T> = std::result::Result<T, EkiwiError>;

/// Remote error code that means the server-side login is no longer valid
pub const LOGIN_REQUIRED_CODE: i64 = 401;

/// Error reported by the provider inside an `{"error": {...}}` envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Remote API error {code}: {title} ({detail})")]
pub struct RemoteApiError {
    pub code: i64,
    pub title: String,
    pub detail: String,
    /// Server signalled an expired or invalid session
    pub login_required: bool,
}

impl RemoteApiError {
    pub fn new<S: Into<String>>(code: i64, title: S, detail: S) -> Self {
        Self {
            code,
            title: title.into(),
            detail: detail.into(),
            login_required: code == LOGIN_REQUIRED_CODE,
        }
    }
}

/// Main error type for Ekiwi
#[derive(Debug, Error)]
pub enum EkiwiError {
    /// Configuration-related errors, including unusable stored credentials
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Transport-level failures (connect, TLS, non-JSON body)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Response had an unexpected shape
    #[error("API error: {message}")]
    Api { message: String },

    /// Credential derivation or request signing failed
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Token cipher failures
    #[error("Cipher error: {message}")]
    Cipher { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Lookup of a label, interval or record that does not exist
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Error envelope returned by the provider
    #[error(transparent)]
    RemoteApi(#[from] RemoteApiError),
}

impl EkiwiError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        EkiwiError::Config {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        EkiwiError::Serialization {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        EkiwiError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        EkiwiError::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        EkiwiError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        EkiwiError::Api {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        EkiwiError::Auth {
            message: message.into(),
        }
    }

    /// Create a new cipher error
    pub fn cipher<S: Into<String>>(message: S) -> Self {
        EkiwiError::Cipher {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        EkiwiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        EkiwiError::NotFound { what: what.into() }
    }

    /// Remote error details, if this error came from an error envelope
    pub fn remote(&self) -> Option<&RemoteApiError> {
        match self {
            EkiwiError::RemoteApi(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the provider asked for a fresh login
    pub fn is_login_required(&self) -> bool {
        self.remote().is_some_and(|e| e.login_required)
    }
}

impl From<std::io::Error> for EkiwiError {
    fn from(err: std::io::Error) -> Self {
        EkiwiError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for EkiwiError {
    fn from(err: serde_yaml::Error) -> Self {
        EkiwiError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EkiwiError {
    fn from(err: serde_json::Error) -> Self {
        EkiwiError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for EkiwiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EkiwiError::timeout(err.to_string())
        } else {
            EkiwiError::network(err.to_string())
        }
    }
}
