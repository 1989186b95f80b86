//! Error types for gcalendar-mcp.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while managing credentials or talking to Google.
#[derive(Error, Debug)]
pub enum GcalError {
    #[error("No credentials found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse credentials at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Calendar API error: {0}")]
    Remote(String),

    #[error("OAuth callback error: {0}")]
    Callback(String),

    #[error("Token revocation failed: {0}")]
    Revoke(String),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GcalError {
    /// Missing or unreadable credentials are treated as "not signed in".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, GcalError::NotFound(_) | GcalError::Parse { .. })
    }
}

/// Result type alias for gcalendar operations.
pub type GcalResult<T> = Result<T, GcalError>;
