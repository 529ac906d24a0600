use std::time::Duration;
use thiserror::Error;

/// Failures reported by a page driver. These are per-target and never end a run
/// on their own; the crawler turns them into `PageRecord::error`.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Timeout {0}ms exceeded while {1}")]
    Timeout(u128, String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Operation not supported by this driver: {0}")]
    Unsupported(&'static str),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Driver session is not open")]
    Closed,
}

impl DriverError {
    pub fn timeout(limit: Duration, action: impl Into<String>) -> Self {
        DriverError::Timeout(limit.as_millis(), action.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout(..))
    }
}

/// Run-level failures. Only these may abort a mapping run.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Session setup failed: {0}")]
    SessionSetup(#[source] DriverError),

    #[error("Authentication failed ({status}): {notes}")]
    Authentication { status: String, notes: String },

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
