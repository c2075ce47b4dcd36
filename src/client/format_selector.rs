// FormatSelector - turns fetched formats into choices for a picker
//
// - Video picks come from `formats`, audio picks from `audio_formats`
//   (or nothing, when the backend lets the server choose the audio)
// - Backend order is kept, ids are unique
// - The first choice is marked as the default selection

use serde::{Deserialize, Serialize};

use super::models::{dedupe_formats, FormatOption, MediaType, VideoMetadata};

/// One entry of a quality picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityOption {
    /// Display label (e.g., "720p (mp4)")
    pub label: String,

    /// Value sent back as `format_id`
    pub value: String,

    pub media_type: MediaType,

    /// Preselected entry
    pub is_default: bool,
}

pub struct FormatSelector;

impl FormatSelector {
    /// Options for one media type, in backend order
    pub fn options(meta: &VideoMetadata, media_type: MediaType) -> Vec<QualityOption> {
        let source = match media_type {
            MediaType::Video => &meta.formats,
            MediaType::Audio => &meta.audio_formats,
        };

        dedupe_formats(source.clone())
            .into_iter()
            .enumerate()
            .map(|(i, format)| QualityOption {
                label: format.label(),
                value: format.id,
                media_type,
                is_default: i == 0,
            })
            .collect()
    }

    /// Look up a format the user typed or picked by id
    pub fn pick<'a>(meta: &'a VideoMetadata, media_type: MediaType, id: &str) -> Option<&'a FormatOption> {
        let id = id.trim();
        let source = match media_type {
            MediaType::Video => &meta.formats,
            MediaType::Audio => &meta.audio_formats,
        };
        source.iter().find(|f| f.id == id)
    }

    /// Default format id for a media type, if the list is not empty
    pub fn default_choice(meta: &VideoMetadata, media_type: MediaType) -> Option<String> {
        Self::options(meta, media_type)
            .into_iter()
            .find(|o| o.is_default)
            .map(|o| o.value)
    }
}
