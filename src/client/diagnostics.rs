// Failure diagnostics - classifies backend-reported error text
//
// The backend forwards yt-dlp messages verbatim (e.g. "ERROR: [youtube] xyz:
// Sign in to confirm your age"). The message itself is always shown as-is;
// this module only adds a reason and a suggestion next to it.

use serde::{Deserialize, Serialize};

/// Why the backend could not serve a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// HTTP 403 Forbidden from the upstream site
    Http403Forbidden,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Private video requiring authorization
    PrivateVideo,

    /// Video deleted or unavailable
    VideoUnavailable,

    /// Geographic restriction on the backend's network
    GeoBlocked,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Bot detection triggered on the backend's IP
    BotDetection,

    /// DRM-protected content (Premium, Music, Movies)
    DrmProtected,

    /// Client could not reach the backend, or the backend timed out upstream
    NetworkTimeout,

    /// Generic/unknown failure
    Unknown,
}

impl FailureReason {
    /// Retrying the same request later has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden | Self::NetworkTimeout | Self::RateLimited | Self::BotDetection
        )
    }

    /// Nothing the user can do will make this video downloadable
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::PrivateVideo
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::AgeRestricted => "Age-restricted content",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited",
            Self::BotDetection => "Bot detection triggered",
            Self::DrmProtected => "DRM-protected content",
            Self::NetworkTimeout => "Network problem",
            Self::Unknown => "Unknown failure",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => {
                "The site refused the download server.\n\
                 1) Try again in a few minutes\n\
                 2) Pick a different format"
            }
            Self::AgeRestricted => {
                "The video needs a signed-in account; the download server cannot fetch it."
            }
            Self::PrivateVideo => "The video is private. Ask the uploader for a public link.",
            Self::VideoUnavailable => {
                "The video may have been deleted, removed for copyright or made private."
            }
            Self::GeoBlocked => "The video is not available in the download server's region.",
            Self::RateLimited => "The download server is being rate-limited. Wait 10-15 minutes.",
            Self::BotDetection => "The site flagged the download server as automated. Try later.",
            Self::DrmProtected => "DRM-protected content cannot be downloaded as a file.",
            Self::NetworkTimeout => {
                "Check that the download server is running and reachable, then try again."
            }
            Self::Unknown => {
                "1) Check the video URL\n\
                 2) Try again later"
            }
        }
    }
}

/// Analyze error message and return failure reason
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    let lower = error.to_lowercase();

    // Permanent restrictions first
    if lower.contains("drm")
        || lower.contains("widevine")
        || lower.contains("youtube premium")
        || lower.contains("requires purchase")
        || lower.contains("this video requires payment")
    {
        return Some(FailureReason::DrmProtected);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(FailureReason::AgeRestricted);
    }

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("sign in if you've been granted access")
    {
        return Some(FailureReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("this video is no longer available")
        || lower.contains("video is unavailable")
    {
        return Some(FailureReason::VideoUnavailable);
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restriction")
        || lower.contains("geo-restricted")
    {
        return Some(FailureReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(FailureReason::RateLimited);
    }

    if lower.contains("confirm you're not a bot")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
    {
        return Some(FailureReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(FailureReason::Http403Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network unreachable")
        || lower.contains("error sending request")
    {
        return Some(FailureReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(FailureReason::Unknown);
    }

    None
}
