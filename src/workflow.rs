//! Credit-gated summarization workflow.
//!
//! A request moves through the [`Stage`]s in order. Any stage may fail, which
//! ends the run with the corresponding [`Error`]. Credits are charged only after
//! a summary exists, and a failed save does not refund the charge.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::store::{NewSummary, SummaryStore, User, UserStore};
use crate::summarize::{StructuredSummary, SummaryGenerator};
use crate::transcript::TranscriptChain;
use crate::{Error, Result, TranscriptSource, extract_video_id};

pub const DEFAULT_STARTING_CREDITS: i64 = 10;

/// Steps of a summarization run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ValidatingInput,
    LocatingUser,
    CheckingCredits,
    FetchingTranscript,
    GeneratingSummary,
    DeductingCredit,
    Persisting,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::ValidatingInput => "validating-input",
            Stage::LocatingUser => "locating-user",
            Stage::CheckingCredits => "checking-credits",
            Stage::FetchingTranscript => "fetching-transcript",
            Stage::GeneratingSummary => "generating-summary",
            Stage::DeductingCredit => "deducting-credit",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Who is asking and for which video
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummarizeRequest {
    pub url: String,
    /// Verified email of the caller
    pub email: String,
    /// Account id from the caller's session, when the session carries one
    pub user_id: Option<String>,
}

impl SummarizeRequest {
    pub fn new(url: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            email: email.into(),
            user_id: None,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub summary_id: String,
    pub structured_summary: StructuredSummary,
    pub video_id: String,
    pub video_title: String,
    pub transcript_source: TranscriptSource,
    pub remaining_credits: i64,
}

/// What a presentation layer receives: a report or a stable error code and message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummarizeResponse {
    Success(SummaryReport),
    #[serde(rename_all = "camelCase")]
    Failure {
        error_code: &'static str,
        user_message: &'static str,
    },
}

impl From<Result<SummaryReport>> for SummarizeResponse {
    fn from(result: Result<SummaryReport>) -> Self {
        match result {
            Ok(report) => SummarizeResponse::Success(report),
            Err(e) => SummarizeResponse::Failure {
                error_code: e.code(),
                user_message: e.user_message(),
            },
        }
    }
}

/// Runs the summarization workflow against injected collaborators
#[derive(Clone)]
pub struct Summarizer {
    users: Arc<dyn UserStore>,
    summaries: Arc<dyn SummaryStore>,
    transcripts: TranscriptChain,
    generator: SummaryGenerator,
    starting_credits: i64,
    provision_missing_users: bool,
}

impl Summarizer {
    pub fn new(
        users: Arc<dyn UserStore>,
        summaries: Arc<dyn SummaryStore>,
        transcripts: TranscriptChain,
        generator: SummaryGenerator,
    ) -> Self {
        Self {
            users,
            summaries,
            transcripts,
            generator,
            starting_credits: DEFAULT_STARTING_CREDITS,
            provision_missing_users: true,
        }
    }

    /// Whether unknown callers get a fresh account with `starting_credits`
    pub fn with_provisioning(mut self, enabled: bool, starting_credits: i64) -> Self {
        self.provision_missing_users = enabled;
        self.starting_credits = starting_credits;
        self
    }

    /// Run the workflow and fold the outcome into a [`SummarizeResponse`]
    pub async fn handle(&self, request: &SummarizeRequest) -> SummarizeResponse {
        self.summarize(request).await.into()
    }

    pub async fn summarize(&self, request: &SummarizeRequest) -> Result<SummaryReport> {
        let mut stage = Stage::Idle;
        let result = self.run(request, &mut stage).await;
        match &result {
            Ok(report) => info!(
                "stage={} video={} remaining_credits={}",
                Stage::Done,
                report.video_id,
                report.remaining_credits
            ),
            Err(e) => warn!("stage={stage} failed code={} detail={e}", e.code()),
        }
        result
    }

    async fn run(&self, request: &SummarizeRequest, stage: &mut Stage) -> Result<SummaryReport> {
        enter(stage, Stage::ValidatingInput, None);
        let url = request.url.trim();
        if url.is_empty() {
            return Err(Error::MissingInput("url"));
        }
        let email = request.email.trim();
        if email.is_empty() {
            return Err(Error::MissingInput("user"));
        }
        let video_id = extract_video_id(url).ok_or_else(|| Error::InvalidUrl(url.to_string()))?;

        enter(stage, Stage::LocatingUser, Some(&video_id));
        let user = self.locate_user(email, request.user_id.as_deref()).await?;

        enter(stage, Stage::CheckingCredits, Some(&video_id));
        if user.credits <= 0 {
            return Err(Error::InsufficientCredits { balance: user.credits });
        }

        enter(stage, Stage::FetchingTranscript, Some(&video_id));
        let transcript = self.transcripts.fetch(&video_id).await?;

        enter(stage, Stage::GeneratingSummary, Some(&video_id));
        let summary = self.generator.generate(&transcript.text).await?;

        enter(stage, Stage::DeductingCredit, Some(&video_id));
        let remaining_credits = self.deduct_credit(&user.id).await?;

        enter(stage, Stage::Persisting, Some(&video_id));
        let summary_id = self
            .summaries
            .insert_summary(NewSummary {
                user_id: user.id.clone(),
                video_id: video_id.clone(),
                video_title: transcript.title.clone(),
                summary_data: summary.clone(),
            })
            .await
            .map_err(|e| Error::PersistenceFailed(format!("{e:#}")))?;

        Ok(SummaryReport {
            summary_id,
            structured_summary: summary,
            video_id,
            video_title: transcript.title,
            transcript_source: transcript.source,
            remaining_credits,
        })
    }

    /// Find the caller's account by session id, then by email, provisioning one if allowed
    async fn locate_user(&self, email: &str, user_id: Option<&str>) -> Result<User> {
        if !is_plausible_email(email) {
            return Err(Error::SessionInvalid(format!("unverifiable identity {email:?}")));
        }

        if let Some(id) = user_id {
            if let Some(user) = self.users.find_by_id(id).await.map_err(lookup_failed)? {
                return Ok(user);
            }
            debug!("No account with session id {id}; trying email");
        }

        if let Some(user) = self.users.find_by_email(email).await.map_err(lookup_failed)? {
            return Ok(user);
        }

        if !self.provision_missing_users {
            return Err(Error::SessionInvalid(format!("no account for {email}")));
        }

        let user = User {
            id: user_id
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            email: email.to_string(),
            credits: self.starting_credits,
        };
        info!("Provisioning account {} with {} credits", user.id, user.credits);

        match self.users.create(user).await {
            Ok(user) => Ok(user),
            Err(e) => {
                // A concurrent request may have created the same account first
                debug!("Account creation failed ({e:#}); looking up again");
                self.users
                    .find_by_email(email)
                    .await
                    .map_err(lookup_failed)?
                    .ok_or_else(|| Error::Unexpected(format!("could not provision account: {e:#}")))
            }
        }
    }

    /// Charge one credit against the balance as currently stored
    async fn deduct_credit(&self, user_id: &str) -> Result<i64> {
        let current = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| Error::CreditUpdateFailed(format!("reading balance: {e:#}")))?
            .ok_or_else(|| Error::CreditUpdateFailed(format!("account {user_id} disappeared")))?;
        let target = current.credits - 1;

        let failure = match self.users.update_credits(user_id, target).await {
            Ok(Some(updated)) => return Ok(updated.credits),
            Ok(None) => "no account row updated".to_string(),
            Err(e) => format!("{e:#}"),
        };
        warn!("Credit update for {user_id} reported failure ({failure}); verifying balance");

        // The write may have committed even though it reported an error
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) if user.credits == target => {
                info!("Credit update for {user_id} had applied");
                Ok(user.credits)
            }
            Ok(_) => Err(Error::CreditUpdateFailed(failure)),
            Err(e) => Err(Error::CreditUpdateFailed(format!("{failure}; verification read failed: {e:#}"))),
        }
    }
}

fn enter(stage: &mut Stage, next: Stage, video_id: Option<&str>) {
    info!("{}", transition_message(*stage, next, video_id));
    *stage = next;
}

fn transition_message(from: Stage, to: Stage, video_id: Option<&str>) -> String {
    match video_id {
        Some(id) => format!("stage {from} -> {to} video={id}"),
        None => format!("stage {from} -> {to}"),
    }
}

fn lookup_failed(e: eyre::Report) -> Error {
    Error::Unexpected(format!("user lookup failed: {e:#}"))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace),
        None => false,
    }
}
