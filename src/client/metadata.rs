// MetadataClient - turns a URL or search query into selectable formats
//
// Input handling:
// 1. Blank input and playlist references are rejected locally
// 2. Input starting with a URI scheme goes straight to the formats endpoint
// 3. Anything else is a search query; formats are looked up per candidate later

use regex::Regex;
use std::sync::Arc;

use super::errors::ClientError;
use super::models::{Resolution, SearchResult, VideoMetadata, VideoRef};
use super::schemes::ApiScheme;
use super::traits::Transport;

lazy_static::lazy_static! {
    static ref SCHEME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap();
    static ref PLAYLIST_RE: Regex = Regex::new(r"(?i)(?:^|[?&#])list=|/playlist(?:$|[/?#])").unwrap();
}

/// How an input will be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Url(String),
    Query(String),
}

/// Validate and classify raw user input without touching the network
pub fn classify(input: &str) -> Result<InputKind, ClientError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ClientError::Validation(
            "Enter a video URL or a search query".to_string(),
        ));
    }
    if is_playlist(input) {
        return Err(ClientError::UnsupportedInput(
            "Playlists are not supported; paste a single video link".to_string(),
        ));
    }
    if SCHEME_RE.is_match(input) {
        Ok(InputKind::Url(input.to_string()))
    } else {
        Ok(InputKind::Query(input.to_string()))
    }
}

pub fn is_playlist(input: &str) -> bool {
    PLAYLIST_RE.is_match(input)
}

pub struct MetadataClient {
    transport: Arc<dyn Transport>,
    scheme: Arc<dyn ApiScheme>,
}

impl MetadataClient {
    pub fn new(transport: Arc<dyn Transport>, scheme: Arc<dyn ApiScheme>) -> Self {
        Self { transport, scheme }
    }

    /// Resolve a URL to its formats, or a query to search candidates
    pub async fn resolve(&self, input: &str) -> Result<Resolution, ClientError> {
        match classify(input)? {
            InputKind::Url(url) => {
                let meta = self.fetch_formats(&VideoRef::from_url(url)).await?;
                Ok(Resolution::Video(meta))
            }
            InputKind::Query(query) => Ok(Resolution::Candidates(self.search(&query).await?)),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::Validation("Enter a search keyword".to_string()));
        }
        let path = self.scheme.search_path().ok_or_else(|| {
            ClientError::Resolution(format!(
                "The {} backend has no search; paste a video URL instead",
                self.scheme.name()
            ))
        })?;

        tracing::info!("[Metadata] Searching for {:?}", query);
        let body = self
            .transport
            .post_json(path, self.scheme.search_body(query))
            .await
            .map_err(ClientError::resolution)?;
        let results = self
            .scheme
            .parse_search(body)
            .map_err(ClientError::resolution)?;

        tracing::info!("[Metadata] {} candidates for {:?}", results.len(), query);
        Ok(results)
    }

    /// Formats for one video (a resolved URL or a selected search candidate)
    pub async fn fetch_formats(&self, video: &VideoRef) -> Result<VideoMetadata, ClientError> {
        let locator = video.locator().ok_or_else(|| {
            ClientError::Validation("Video has neither an id nor a URL".to_string())
        })?;
        if let Some(url) = video.url.as_deref() {
            if is_playlist(url) {
                return Err(ClientError::UnsupportedInput(
                    "Playlists are not supported; paste a single video link".to_string(),
                ));
            }
        }

        tracing::info!("[Metadata] Fetching formats via {} scheme: {:?}", self.scheme.name(), locator);
        let body = self
            .transport
            .post_json(self.scheme.formats_path(), self.scheme.formats_body(locator))
            .await
            .map_err(|e| {
                tracing::warn!("[Metadata] Formats request failed: {}", e);
                ClientError::resolution(e)
            })?;
        let mut meta = self
            .scheme
            .parse_formats(body)
            .map_err(ClientError::resolution)?;

        if meta.title.is_empty() {
            meta.title = video.title.clone();
        }
        tracing::info!(
            "[Metadata] {:?}: {} formats, {} audio formats",
            meta.title,
            meta.formats.len(),
            meta.audio_formats.len()
        );
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::errors::TransportError;
    use crate::client::schemes::{JobScheme, SessionScheme};
    use crate::client::testing::MockTransport;
    use serde_json::json;

    fn client(transport: &Arc<MockTransport>) -> MetadataClient {
        MetadataClient::new(transport.clone(), Arc::new(JobScheme))
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("  https://youtu.be/abc  "),
            Ok(InputKind::Url("https://youtu.be/abc".to_string()))
        );
        assert_eq!(classify("lofi beats"), Ok(InputKind::Query("lofi beats".to_string())));
        assert!(matches!(classify(" \t\n"), Err(ClientError::Validation(_))));
    }

    #[test]
    fn test_playlist_markers() {
        assert!(is_playlist("https://www.youtube.com/watch?v=abc&list=PL123"));
        assert!(is_playlist("https://www.youtube.com/playlist?list=PL123"));
        assert!(is_playlist("https://youtube.com/playlist"));
        assert!(!is_playlist("https://www.youtube.com/watch?v=abc"));
        assert!(!is_playlist("my playlists of the year"));
        assert!(!is_playlist("https://example.com/watch?v=1&blacklist=0"));
    }

    #[tokio::test]
    async fn test_playlist_rejected_without_network() {
        let transport = Arc::new(MockTransport::new());
        let inputs = [
            "https://www.youtube.com/watch?v=abc&list=PL123",
            "https://www.youtube.com/playlist?list=PLxyz",
            "https://m.youtube.com/watch?list=RD1&v=2",
        ];
        for input in inputs {
            let err = client(&transport).resolve(input).await.unwrap_err();
            assert!(matches!(err, ClientError::UnsupportedInput(_)), "{}", input);
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_input_no_network() {
        let transport = Arc::new(MockTransport::new());
        for input in ["", "   ", "\n\t"] {
            let err = client(&transport).resolve(input).await.unwrap_err();
            assert!(matches!(err, ClientError::Validation(_)));
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_url_fetches_formats() {
        let transport = Arc::new(MockTransport::new().respond_ok(
            "/api/formats",
            json!({
                "title": "Video",
                "thumbnail": "thumb.jpg",
                "formats": [
                    {"id": "137", "quality": "1080p", "ext": "mp4"},
                    {"id": "22", "quality": "720p", "ext": "mp4"},
                    {"id": "137", "quality": "1080p", "ext": "webm"}
                ]
            }),
        ));

        let resolution = client(&transport).resolve("https://youtu.be/abc").await.unwrap();
        let Resolution::Video(meta) = resolution else {
            panic!("expected formats");
        };
        let ids: Vec<_> = meta.formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["137", "22"]);
        assert_eq!(meta.formats[0].ext, "mp4");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body, Some(json!({"url": "https://youtu.be/abc"})));
    }

    #[tokio::test]
    async fn test_resolve_query_searches_then_lazy_formats() {
        let transport = Arc::new(
            MockTransport::new()
                .respond_ok(
                    "/api/search",
                    json!([{"id": "a1", "title": "First", "thumbnail": "t1", "channel": "C", "duration": "1:00"}]),
                )
                .respond_ok(
                    "/api/formats",
                    json!({"title": "", "thumbnail": "t1", "formats": [{"id": "18", "quality": "360p", "ext": "mp4"}]}),
                ),
        );
        let client = client(&transport);

        let Resolution::Candidates(results) = client.resolve("cat videos").await.unwrap() else {
            panic!("expected candidates");
        };
        assert_eq!(transport.call_count(), 1);
        assert_eq!(transport.calls()[0].body, Some(json!({"query": "cat videos"})));

        let meta = client.fetch_formats(&results[0].video).await.unwrap();
        assert_eq!(meta.title, "First");
        assert_eq!(transport.calls()[1].body, Some(json!({"id": "a1"})));
    }

    #[tokio::test]
    async fn test_backend_error_surfaced_verbatim() {
        let transport = Arc::new(MockTransport::new().respond(
            "/api/formats",
            Err(TransportError::Status {
                code: 500,
                message: Some("ERROR: [youtube] abc: Video unavailable".to_string()),
            }),
        ));
        let err = client(&transport).resolve("https://youtu.be/abc").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Resolution("ERROR: [youtube] abc: Video unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn test_session_scheme_has_no_search() {
        let transport = Arc::new(MockTransport::new());
        let client = MetadataClient::new(transport.clone(), Arc::new(SessionScheme));
        let err = client.resolve("cat videos").await.unwrap_err();
        assert!(matches!(err, ClientError::Resolution(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_formats_needs_locator() {
        let transport = Arc::new(MockTransport::new());
        let err = client(&transport)
            .fetch_formats(&VideoRef::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(transport.call_count(), 0);
    }
}
