use serde_json::{json, Value};

use super::{
    duration_field, progress_field, reject_error_payload, required_text, status_field, text_field,
    ApiScheme,
};
use crate::client::errors::TransportError;
use crate::client::models::{
    dedupe_formats, DownloadRequest, FormatOption, JobSnapshot, MediaType, SearchResult,
    VideoLocator, VideoMetadata,
};

/// Bare-path backend: `{session_id}`, `mode`/`quality`, formats as plain strings
pub struct SessionScheme;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

impl SessionScheme {
    fn quality_list(body: &Value, key: &str, ext: &str) -> Vec<FormatOption> {
        let qualities = body
            .get(key)
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_default();

        let formats = qualities
            .into_iter()
            .map(|q| FormatOption {
                id: q.to_string(),
                quality: q.to_string(),
                ext: ext.to_string(),
            })
            .collect();
        dedupe_formats(formats)
    }

    fn mode(media_type: MediaType) -> &'static str {
        match media_type {
            MediaType::Video => "video_audio",
            MediaType::Audio => "audio_only",
        }
    }
}

impl ApiScheme for SessionScheme {
    fn name(&self) -> &'static str {
        "session"
    }

    fn formats_path(&self) -> &'static str {
        "/formats"
    }

    fn search_path(&self) -> Option<&'static str> {
        None
    }

    fn download_path(&self) -> &'static str {
        "/download"
    }

    fn status_path(&self, job_id: &str) -> String {
        format!("/status/{}", job_id)
    }

    fn file_path(&self, job_id: &str) -> String {
        format!("/file/{}", job_id)
    }

    // This backend only understands `url`
    fn formats_body(&self, locator: VideoLocator<'_>) -> Value {
        match locator {
            VideoLocator::Id(id) => json!({ "url": format!("{}{}", WATCH_URL, id) }),
            VideoLocator::Url(url) => json!({ "url": url }),
        }
    }

    fn parse_formats(&self, body: Value) -> Result<VideoMetadata, TransportError> {
        reject_error_payload(&body)?;
        if body.get("video_formats").is_none() && body.get("audio_formats").is_none() {
            return Err(TransportError::Malformed(
                "missing `video_formats`/`audio_formats`".to_string(),
            ));
        }

        Ok(VideoMetadata {
            title: text_field(&body, "title").unwrap_or_else(|| "Unknown".to_string()),
            thumbnail: text_field(&body, "thumbnail"),
            duration_secs: duration_field(&body),
            formats: Self::quality_list(&body, "video_formats", "mp4"),
            audio_formats: Self::quality_list(&body, "audio_formats", "mp3"),
        })
    }

    fn parse_search(&self, _body: Value) -> Result<Vec<SearchResult>, TransportError> {
        Err(TransportError::Malformed(
            "session backend has no search endpoint".to_string(),
        ))
    }

    // Its backend rejects any download without a quality, audio included
    fn format_required(&self, _media_type: MediaType) -> bool {
        true
    }

    fn download_body(&self, request: &DownloadRequest) -> Value {
        json!({
            "url": request.url,
            "quality": request.selected_format(),
            "mode": Self::mode(request.media_type),
        })
    }

    fn parse_job_id(&self, body: Value) -> Result<String, TransportError> {
        reject_error_payload(&body)?;
        required_text(&body, "session_id")
    }

    fn parse_status(&self, job_id: &str, body: Value) -> Result<JobSnapshot, TransportError> {
        Ok(JobSnapshot {
            id: job_id.to_string(),
            status: status_field(&body)?,
            progress: progress_field(&body)?,
            text: text_field(&body, "text").unwrap_or_default(),
            downloaded_mb: None,
            total_mb: None,
            error: text_field(&body, "error"),
        })
    }
}
