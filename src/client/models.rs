// Common data models for the web API client

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifies a video on the backend side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: String,
}

/// What the formats endpoint is asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoLocator<'a> {
    Id(&'a str),
    Url(&'a str),
}

impl VideoRef {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: Some(url.into()),
            title: String::new(),
        }
    }

    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            url: None,
            title: String::new(),
        }
    }

    /// Preferred way to address this video: id first, then url. Blank values don't count.
    pub fn locator(&self) -> Option<VideoLocator<'_>> {
        fn non_blank(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        non_blank(&self.id)
            .map(VideoLocator::Id)
            .or_else(|| non_blank(&self.url).map(VideoLocator::Url))
    }
}

/// One selectable encoding of a video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatOption {
    pub id: String,
    pub quality: String,
    pub ext: String,
}

impl FormatOption {
    /// "720p (mp4)", or just the quality when the extension is unknown
    pub fn label(&self) -> String {
        if self.ext.is_empty() {
            self.quality.clone()
        } else {
            format!("{} ({})", self.quality, self.ext)
        }
    }
}

/// Keep backend order, drop repeated ids (first occurrence wins)
pub fn dedupe_formats(formats: Vec<FormatOption>) -> Vec<FormatOption> {
    let mut seen = HashSet::new();
    formats
        .into_iter()
        .filter(|f| seen.insert(f.id.clone()))
        .collect()
}

/// Video information returned by the formats endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration_secs: Option<u64>,
    /// Video formats (or the only list, for schemes that don't split audio)
    pub formats: Vec<FormatOption>,
    /// Audio bitrates, for schemes that report them separately
    pub audio_formats: Vec<FormatOption>,
}

impl VideoMetadata {
    /// Duration as M:SS
    pub fn duration_label(&self) -> Option<String> {
        self.duration_secs
            .map(|secs| format!("{}:{:02}", secs / 60, secs % 60))
    }
}

/// One candidate from the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub video: VideoRef,
    pub thumbnail: Option<String>,
    pub channel: Option<String>,
    pub duration: Option<String>,
}

/// What `MetadataClient::resolve` produced for an input
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The input was a URL; formats are ready
    Video(VideoMetadata),
    /// The input was a search query; formats are fetched per candidate on selection
    Candidates(Vec<SearchResult>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Audio,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Download job parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub format_id: Option<String>,
}

impl DownloadRequest {
    pub fn video(url: impl Into<String>, format_id: Option<String>) -> Self {
        Self {
            url: url.into(),
            media_type: MediaType::Video,
            format_id,
        }
    }

    pub fn audio(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            media_type: MediaType::Audio,
            format_id: None,
        }
    }

    pub fn with_format(mut self, format_id: impl Into<String>) -> Self {
        self.format_id = Some(format_id.into());
        self
    }

    /// Selected format id, ignoring blank selections
    pub fn selected_format(&self) -> Option<&str> {
        self.format_id.as_deref().filter(|f| !f.trim().is_empty())
    }
}

/// Job status as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Completed,
    Error,
}

impl JobStatus {
    /// Map a backend status string. `starting`/`queued` are pending, `processing`
    /// (merge/convert after the download) still counts as downloading.
    pub fn from_wire(status: &str) -> Option<Self> {
        match status.trim().to_lowercase().as_str() {
            "pending" | "starting" | "queued" => Some(Self::Pending),
            "downloading" | "processing" => Some(Self::Downloading),
            "completed" | "finished" | "done" => Some(Self::Completed),
            "error" | "failed" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Downloading => 1,
            Self::Completed | Self::Error => 2,
        }
    }

    /// Whether moving from `self` to `next` follows pending -> downloading -> terminal
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Downloading => write!(f, "downloading"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Client-side cached view of a backend job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    /// 0..=100
    pub progress: f64,
    pub text: String,
    pub downloaded_mb: Option<f64>,
    pub total_mb: Option<f64>,
    pub error: Option<String>,
}

impl JobSnapshot {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            progress: 0.0,
            text: String::new(),
            downloaded_mb: None,
            total_mb: None,
            error: None,
        }
    }

    /// Reason to show when the job ended in `error`
    pub fn failure_message(&self) -> String {
        self.error
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| Some(self.text.as_str()).filter(|t| !t.trim().is_empty()))
            .unwrap_or("Download failed")
            .to_string()
    }
}

pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

/// Parse sizes reported as numbers or as "12.34 MB" / "? MB" strings
pub fn parse_megabytes(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            let number = trimmed
                .strip_suffix("MB")
                .or_else(|| trimmed.strip_suffix("MiB"))
                .unwrap_or(trimmed);
            number.trim().parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Network configuration for the HTTP transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// HTTP or SOCKS5 proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Per-request timeout in seconds
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(30),
        }
    }
}
