use thiserror::Error;

/// Failures surfaced by the summarization workflow and its components.
///
/// String payloads carry diagnostic detail for logs only. Callers presenting
/// errors to an end user should use [`Error::user_message`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("no video id found in URL: {0}")]
    InvalidUrl(String),

    #[error("session invalid: {0}")]
    SessionInvalid(String),

    #[error("insufficient credits (balance {balance})")]
    InsufficientCredits { balance: i64 },

    #[error("video metadata unavailable: {0}")]
    VideoMetadataUnavailable(String),

    #[error("video not found: {0}")]
    VideoNotFound(String),

    #[error("no transcript available for {video_id} (last error: {})", .last_error.as_deref().unwrap_or("none"))]
    TranscriptUnavailable {
        video_id: String,
        last_error: Option<String>,
    },

    #[error("AI service error: {0}")]
    AiService(String),

    #[error("credit update failed: {0}")]
    CreditUpdateFailed(String),

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("summary not found: {0}")]
    SummaryNotFound(String),

    #[error("summary {summary_id} is not owned by {user_id}")]
    NotOwner { summary_id: String, user_id: String },

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Stable machine-readable code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingInput(_) => "MISSING_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::SessionInvalid(_) => "SESSION_INVALID",
            Error::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Error::VideoMetadataUnavailable(_) => "VIDEO_METADATA_UNAVAILABLE",
            Error::VideoNotFound(_) => "VIDEO_NOT_FOUND",
            Error::TranscriptUnavailable { .. } => "TRANSCRIPT_UNAVAILABLE",
            Error::AiService(_) => "AI_SERVICE_ERROR",
            Error::CreditUpdateFailed(_) => "CREDIT_UPDATE_FAILED",
            Error::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            Error::SummaryNotFound(_) => "SUMMARY_NOT_FOUND",
            Error::NotOwner { .. } => "NOT_OWNER",
            Error::Unexpected(_) => "UNEXPECTED",
        }
    }

    /// Message safe to show an end user; never includes provider error text
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::MissingInput("url") => "Please enter a YouTube URL.",
            Error::MissingInput("user") => "You must be logged in to summarize videos.",
            Error::MissingInput(_) => "Missing required parameters.",
            Error::InvalidUrl(_) => "Please enter a valid YouTube URL.",
            Error::SessionInvalid(_) => "Your session could not be verified. Please sign in again.",
            Error::InsufficientCredits { .. } => "You don't have enough credits. Please purchase more credits.",
            Error::VideoMetadataUnavailable(_) => {
                "Unable to retrieve video information. Please try again later."
            }
            Error::VideoNotFound(_) => "The video could not be found. Please check the URL and try again.",
            Error::TranscriptUnavailable { .. } => {
                "Transcript not available for this video. The video may not have captions enabled."
            }
            Error::AiService(_) => "Unable to generate summary. Please try again later.",
            Error::CreditUpdateFailed(_) => "Failed to update user credits.",
            Error::PersistenceFailed(_) => "Your summary could not be saved. Please try again later.",
            Error::SummaryNotFound(_) => "Summary not found.",
            Error::NotOwner { .. } => "You don't have permission to delete this summary.",
            Error::Unexpected(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingInput(_) | Error::InvalidUrl(_) => 2,
            Error::SessionInvalid(_) | Error::NotOwner { .. } => 3,
            Error::InsufficientCredits { .. } => 4,
            Error::VideoMetadataUnavailable(_) | Error::VideoNotFound(_) | Error::TranscriptUnavailable { .. } => 5,
            Error::AiService(_) => 6,
            Error::CreditUpdateFailed(_) | Error::PersistenceFailed(_) | Error::SummaryNotFound(_) => 7,
            Error::Unexpected(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
