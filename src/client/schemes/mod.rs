// Wire naming schemes
//
// Two incompatible backends are deployed behind the same front-end idea:
// - job scheme:     /api/* paths, {job_id}, type + format_id, text/size fields
// - session scheme: bare paths, {session_id}, mode + quality, no search
//
// Nothing suggests one is a newer version of the other, so they are kept as
// separate adapters and picked explicitly by configuration.

pub mod job;
pub mod session;

pub use job::JobScheme;
pub use session::SessionScheme;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::errors::TransportError;
use super::models::{
    clamp_progress, DownloadRequest, JobSnapshot, JobStatus, MediaType, SearchResult, VideoLocator,
    VideoMetadata,
};

/// Request/response codec for one backend flavour
pub trait ApiScheme: Send + Sync {
    /// Name of the scheme (for logging)
    fn name(&self) -> &'static str;

    fn formats_path(&self) -> &'static str;

    /// `None` when the backend has no search endpoint
    fn search_path(&self) -> Option<&'static str>;

    fn download_path(&self) -> &'static str;

    fn status_path(&self, job_id: &str) -> String;

    fn file_path(&self, job_id: &str) -> String;

    fn formats_body(&self, locator: VideoLocator<'_>) -> Value;

    fn parse_formats(&self, body: Value) -> Result<VideoMetadata, TransportError>;

    fn search_body(&self, query: &str) -> Value {
        serde_json::json!({ "query": query })
    }

    fn parse_search(&self, body: Value) -> Result<Vec<SearchResult>, TransportError>;

    /// Whether a download of this media type needs a selected format
    fn format_required(&self, media_type: MediaType) -> bool;

    fn download_body(&self, request: &DownloadRequest) -> Value;

    fn parse_job_id(&self, body: Value) -> Result<String, TransportError>;

    fn parse_status(&self, job_id: &str, body: Value) -> Result<JobSnapshot, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    /// `/api/*`, `job_id`, `type`/`format_id`
    #[default]
    Job,
    /// bare paths, `session_id`, `mode`/`quality`
    Session,
}

impl SchemeKind {
    pub fn build(&self) -> Arc<dyn ApiScheme> {
        match self {
            Self::Job => Arc::new(JobScheme),
            Self::Session => Arc::new(SessionScheme),
        }
    }

    /// Poll cadence each front-end used against its backend
    pub fn default_poll_interval_ms(&self) -> u64 {
        match self {
            Self::Job => 2000,
            Self::Session => 500,
        }
    }

    /// The session front-end polls right after submission; the job one waits a full interval
    pub fn default_poll_immediately(&self) -> bool {
        matches!(self, Self::Session)
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job => write!(f, "job"),
            Self::Session => write!(f, "session"),
        }
    }
}

impl FromStr for SchemeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "job" | "api" => Ok(Self::Job),
            "session" | "legacy" => Ok(Self::Session),
            other => Err(format!("Unknown API scheme: {} (expected job or session)", other)),
        }
    }
}

/// Reject 2xx bodies that carry `{error: "..."}`
pub(crate) fn reject_error_payload(body: &Value) -> Result<(), TransportError> {
    match body.get("error").and_then(Value::as_str) {
        Some(msg) => Err(TransportError::Rejected(msg.to_string())),
        None => Ok(()),
    }
}

/// String or number field as text
pub(crate) fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn required_text(body: &Value, key: &str) -> Result<String, TransportError> {
    text_field(body, key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TransportError::Malformed(format!("missing `{}` in response", key)))
}

/// Progress as a number in 0..=100; absent progress reads as 0
pub(crate) fn progress_field(body: &Value) -> Result<f64, TransportError> {
    match body.get("progress") {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => Ok(clamp_progress(n.as_f64().unwrap_or(0.0))),
        Some(Value::String(s)) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map(clamp_progress)
            .map_err(|_| TransportError::Malformed(format!("bad progress value: {}", s))),
        Some(other) => Err(TransportError::Malformed(format!("bad progress value: {}", other))),
    }
}

/// Job status; a body with only `{error}` (e.g. unknown job id) is a rejection
pub(crate) fn status_field(body: &Value) -> Result<JobStatus, TransportError> {
    let Some(raw) = body.get("status").and_then(Value::as_str) else {
        reject_error_payload(body)?;
        return Err(TransportError::Malformed("missing `status` in response".to_string()));
    };
    JobStatus::from_wire(raw)
        .ok_or_else(|| TransportError::Malformed(format!("unknown job status: {}", raw)))
}

/// Duration in whole seconds from a number field
pub(crate) fn duration_field(body: &Value) -> Option<u64> {
    body.get("duration")
        .and_then(Value::as_f64)
        .filter(|d| *d >= 0.0)
        .map(|d| d.round() as u64)
}
