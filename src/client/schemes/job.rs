use serde_json::{json, Value};

use super::{
    duration_field, progress_field, reject_error_payload, required_text, status_field, text_field,
    ApiScheme,
};
use crate::client::errors::TransportError;
use crate::client::models::{
    dedupe_formats, parse_megabytes, DownloadRequest, FormatOption, JobSnapshot, MediaType,
    SearchResult, VideoLocator, VideoMetadata, VideoRef,
};

/// `/api/*` backend: `{job_id}`, `type`/`format_id`, search support
pub struct JobScheme;

impl JobScheme {
    fn parse_format(entry: &Value) -> Option<FormatOption> {
        let id = text_field(entry, "id")?;
        Some(FormatOption {
            quality: text_field(entry, "quality").unwrap_or_else(|| id.clone()),
            ext: text_field(entry, "ext").unwrap_or_default(),
            id,
        })
    }

    fn parse_candidate(entry: &Value) -> Option<SearchResult> {
        let video = VideoRef {
            id: text_field(entry, "id"),
            url: text_field(entry, "url"),
            title: text_field(entry, "title").unwrap_or_default(),
        };
        video.locator()?;
        Some(SearchResult {
            video,
            thumbnail: text_field(entry, "thumbnail"),
            channel: text_field(entry, "channel"),
            duration: text_field(entry, "duration"),
        })
    }
}

impl ApiScheme for JobScheme {
    fn name(&self) -> &'static str {
        "job"
    }

    fn formats_path(&self) -> &'static str {
        "/api/formats"
    }

    fn search_path(&self) -> Option<&'static str> {
        Some("/api/search")
    }

    fn download_path(&self) -> &'static str {
        "/api/download"
    }

    fn status_path(&self, job_id: &str) -> String {
        format!("/api/status/{}", job_id)
    }

    fn file_path(&self, job_id: &str) -> String {
        format!("/api/file/{}", job_id)
    }

    fn formats_body(&self, locator: VideoLocator<'_>) -> Value {
        match locator {
            VideoLocator::Id(id) => json!({ "id": id }),
            VideoLocator::Url(url) => json!({ "url": url }),
        }
    }

    fn parse_formats(&self, body: Value) -> Result<VideoMetadata, TransportError> {
        reject_error_payload(&body)?;
        let entries = body
            .get("formats")
            .and_then(Value::as_array)
            .ok_or_else(|| TransportError::Malformed("missing `formats` list".to_string()))?;

        let formats = entries.iter().filter_map(Self::parse_format).collect();

        Ok(VideoMetadata {
            title: text_field(&body, "title").unwrap_or_default(),
            thumbnail: text_field(&body, "thumbnail"),
            duration_secs: duration_field(&body),
            formats: dedupe_formats(formats),
            audio_formats: Vec::new(),
        })
    }

    fn parse_search(&self, body: Value) -> Result<Vec<SearchResult>, TransportError> {
        reject_error_payload(&body)?;
        let entries = body
            .as_array()
            .ok_or_else(|| TransportError::Malformed("search response is not a list".to_string()))?;
        Ok(entries.iter().filter_map(Self::parse_candidate).collect())
    }

    fn format_required(&self, media_type: MediaType) -> bool {
        media_type == MediaType::Video
    }

    fn download_body(&self, request: &DownloadRequest) -> Value {
        json!({
            "url": request.url,
            "type": request.media_type.to_string(),
            "format_id": request.selected_format(),
        })
    }

    fn parse_job_id(&self, body: Value) -> Result<String, TransportError> {
        reject_error_payload(&body)?;
        required_text(&body, "job_id")
    }

    fn parse_status(&self, job_id: &str, body: Value) -> Result<JobSnapshot, TransportError> {
        Ok(JobSnapshot {
            id: job_id.to_string(),
            status: status_field(&body)?,
            progress: progress_field(&body)?,
            text: text_field(&body, "text").unwrap_or_default(),
            downloaded_mb: body.get("downloaded_mb").and_then(parse_megabytes),
            total_mb: body.get("total_mb").and_then(parse_megabytes),
            error: text_field(&body, "error"),
        })
    }
}
