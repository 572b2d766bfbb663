use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::{Error, Result, Segment, TranscriptResult, TranscriptSource};

/// Options passed to the caption provider for a single retrieval strategy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptOptions {
    /// Requested caption language; `None` lets the provider pick
    pub lang: Option<String>,
    /// Ask for machine-generated (ASR) tracks
    pub auto: bool,
    /// Accept caption tracks outside the requested language
    pub captions: bool,
}

impl TranscriptOptions {
    /// Options for the given strategy, requesting `lang` where the strategy uses one
    pub fn for_source(source: TranscriptSource, lang: &str) -> Self {
        let lang = Some(lang.to_string());
        match source {
            TranscriptSource::Official => Self {
                lang,
                auto: false,
                captions: false,
            },
            TranscriptSource::AutoGenerated => Self {
                lang,
                auto: true,
                captions: false,
            },
            TranscriptSource::ManualCaptions => Self {
                lang,
                auto: false,
                captions: true,
            },
            TranscriptSource::AutoCaptions => Self {
                lang,
                auto: true,
                captions: true,
            },
            TranscriptSource::Unknown => Self::default(),
        }
    }
}

/// Looks up a video's title. `Ok(None)` means the platform has no such video.
#[async_trait]
pub trait VideoMetadata: Send + Sync {
    async fn video_title(&self, video_id: &str) -> eyre::Result<Option<String>>;
}

/// Fetches timed caption segments for a video
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Called once per transcript fetch, before any strategy for `video_id` is
    /// tried. Providers that reuse lookups across strategies reset them here.
    fn start_video(&self, _video_id: &str) {}

    async fn fetch_segments(&self, video_id: &str, options: &TranscriptOptions) -> eyre::Result<Vec<Segment>>;
}

/// Obtains a transcript by trying each [`TranscriptSource`] strategy in preference order.
#[derive(Clone)]
pub struct TranscriptChain {
    metadata: Arc<dyn VideoMetadata>,
    captions: Arc<dyn CaptionProvider>,
    lang: String,
}

impl TranscriptChain {
    pub fn new(metadata: Arc<dyn VideoMetadata>, captions: Arc<dyn CaptionProvider>, lang: impl Into<String>) -> Self {
        Self {
            metadata,
            captions,
            lang: lang.into(),
        }
    }

    pub async fn fetch(&self, video_id: &str) -> Result<TranscriptResult> {
        let title = match self.metadata.video_title(video_id).await {
            Ok(Some(title)) => title,
            Ok(None) => return Err(Error::VideoNotFound(video_id.to_string())),
            Err(e) => return Err(Error::VideoMetadataUnavailable(format!("{e:#}"))),
        };
        debug!("Resolved title for {video_id}: {title}");

        self.captions.start_video(video_id);
        let mut last_error = None;
        for source in TranscriptSource::PREFERENCE_ORDER {
            let options = TranscriptOptions::for_source(source, &self.lang);
            debug!("Attempting transcript for {video_id} with source: {source}");

            match self.captions.fetch_segments(video_id, &options).await {
                Ok(segments) => match join_segments(&segments) {
                    Some(text) => {
                        info!("Fetched transcript for {video_id} from source: {source} ({} chars)", text.len());
                        return Ok(TranscriptResult {
                            video_id: video_id.to_string(),
                            title,
                            text,
                            source,
                        });
                    }
                    None => debug!("Source {source} returned no text for {video_id}"),
                },
                Err(e) => {
                    debug!("Source {source} failed for {video_id}: {e:#}");
                    last_error = Some(format!("{e:#}"));
                }
            }
        }

        warn!("All transcript sources failed for {video_id}");
        Err(Error::TranscriptUnavailable {
            video_id: video_id.to_string(),
            last_error,
        })
    }
}

/// Join non-empty segment texts with single spaces; `None` when nothing remains
fn join_segments(segments: &[Segment]) -> Option<String> {
    let text = segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() { None } else { Some(text) }
}
