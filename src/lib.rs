pub mod config;
pub mod error;
pub mod history;
pub mod output;
pub mod store;
pub mod summarize;
pub mod transcript;
pub mod workflow;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Provenance of a transcript, in order of preference (best first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Official,
    AutoGenerated,
    ManualCaptions,
    AutoCaptions,
    Unknown,
}

impl TranscriptSource {
    /// Every source, in the order the transcript chain tries them
    pub const PREFERENCE_ORDER: [TranscriptSource; 5] = [
        TranscriptSource::Official,
        TranscriptSource::AutoGenerated,
        TranscriptSource::ManualCaptions,
        TranscriptSource::AutoCaptions,
        TranscriptSource::Unknown,
    ];

    /// Human-readable label for display
    pub fn label(&self) -> &'static str {
        match self {
            TranscriptSource::Official => "Official transcript",
            TranscriptSource::AutoGenerated => "Auto-generated transcript",
            TranscriptSource::ManualCaptions => "Manual captions",
            TranscriptSource::AutoCaptions => "Auto-generated captions",
            TranscriptSource::Unknown => "Unknown source",
        }
    }
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A transcript obtained for one summarization attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptResult {
    pub video_id: String,
    pub title: String,
    pub text: String,
    pub source: TranscriptSource,
}

static VIDEO_ID_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=ID (v may follow other query params), youtube.com/v/ID
        Regex::new(r"youtube\.com/(?:watch\?(?:[^#]*&)?v=|v/)([^&?/#\s]+)").unwrap(),
        // youtu.be/ID
        Regex::new(r"youtu\.be/([^&?/#\s]+)").unwrap(),
        // youtube.com/embed/ID
        Regex::new(r"youtube\.com/embed/([^&?/#\s]+)").unwrap(),
        // youtube.com/shorts/ID
        Regex::new(r"youtube\.com/shorts/([^&?/#\s]+)").unwrap(),
    ]
});

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_watch_url_with_leading_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ/"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_shorts_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_all_shapes_agree() {
        let urls = [
            "https://www.youtube.com/watch?v=abc123XYZ_",
            "http://youtube.com/v/abc123XYZ_",
            "https://youtu.be/abc123XYZ_",
            "https://www.youtube.com/embed/abc123XYZ_?autoplay=1",
        ];
        for url in urls {
            assert_eq!(extract_video_id(url).as_deref(), Some("abc123XYZ_"), "{url}");
        }
    }

    #[test]
    fn test_invalid_url() {
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id("https://vimeo.com/12345"), None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("   "), None);
    }

    #[test]
    fn test_source_preference_order() {
        let mut sorted = TranscriptSource::PREFERENCE_ORDER;
        sorted.sort();
        assert_eq!(sorted, TranscriptSource::PREFERENCE_ORDER);
        assert_eq!(TranscriptSource::PREFERENCE_ORDER[0], TranscriptSource::Official);
    }

    #[test]
    fn test_source_display() {
        assert_eq!(TranscriptSource::ManualCaptions.to_string(), "Manual captions");
        assert_eq!(
            serde_json::to_string(&TranscriptSource::AutoGenerated).unwrap(),
            "\"auto_generated\""
        );
    }
}
