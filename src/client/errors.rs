// Error types for the web API client

use super::diagnostics::{diagnose_error, FailureReason};

/// Failure of a single HTTP exchange with the backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout, broken body stream
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response. `message` is the backend's `{error}` text when present
    #[error("{}", status_text(.code, .message))]
    Status { code: u16, message: Option<String> },

    /// 2xx response carrying an `{error}` payload
    #[error("{0}")]
    Rejected(String),

    /// 2xx response whose body is not the JSON we expect
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Local filesystem failure while saving a downloaded file
    #[error("IO error: {0}")]
    Io(String),
}

fn status_text(code: &u16, message: &Option<String>) -> String {
    match message {
        Some(msg) => msg.to_string(),
        None => format!("HTTP {}", code),
    }
}

impl TransportError {
    /// Backend-reported `{error}` text, if the server sent one
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            Self::Rejected(message) => Some(message),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::Malformed(e.to_string());
        }
        if let Some(status) = e.status() {
            return Self::Status {
                code: status.as_u16(),
                message: None,
            };
        }
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// Empty input or missing format selection, caught before any request
    #[error("Validation error: {0}")]
    Validation(String),

    /// Playlist references are never sent to the backend
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Formats or search lookup failed
    #[error("{0}")]
    Resolution(String),

    /// The download job could not be started
    #[error("{0}")]
    Submission(String),

    /// A status request failed at the transport level
    #[error("Connection lost: {0}")]
    Poll(String),

    /// The backend reported the job as failed
    #[error("{0}")]
    Job(String),

    /// Polling was stopped by the caller; the backend job may still be running
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ClientError {
    pub fn resolution(e: TransportError) -> Self {
        Self::Resolution(surface(e))
    }

    pub fn submission(e: TransportError) -> Self {
        Self::Submission(surface(e))
    }

    pub fn poll(e: TransportError) -> Self {
        Self::Poll(surface(e))
    }

    pub fn file(e: TransportError) -> Self {
        Self::Io(surface(e))
    }

    /// Human-readable suggestion for failures whose text came from the backend
    pub fn hint(&self) -> Option<FailureReason> {
        match self {
            Self::Resolution(msg) | Self::Submission(msg) | Self::Job(msg) => diagnose_error(msg),
            Self::Poll(msg) => match diagnose_error(msg) {
                Some(FailureReason::Unknown) | None => Some(FailureReason::NetworkTimeout),
                reason => reason,
            },
            _ => None,
        }
    }
}

// Backend `{error}` text goes through untouched; everything else keeps its Display
fn surface(e: TransportError) -> String {
    match e.backend_message() {
        Some(msg) => msg.to_string(),
        None => e.to_string(),
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
