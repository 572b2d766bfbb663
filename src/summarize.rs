use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use eyre::{bail, eyre};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

pub const DEFAULT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 12_000;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

const FALLBACK_OVERALL_SUMMARY: &str = "Summary not available.";
const FALLBACK_SECTION_TITLE: &str = "Content Overview";
const FALLBACK_SECTION_TIMESTAMP: &str = "00:00";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates structured summaries of YouTube video transcripts. \
You break down the content into logical sections with timestamps and provide concise summaries for each section.";

const USER_PROMPT_TEMPLATE: &str = r#"Analyze the following YouTube video transcript and create a structured summary with the following components:

1. An overall summary of the entire video (100 words or less)
2. 4-6 logical sections based on the content, each with:
   - A short, descriptive title for the section
   - A concise summary of that section (30-50 words)
   - An approximate timestamp (in MM:SS format) where that section ends

Format your response as valid JSON with this structure:
{
  "overallSummary": "The overall summary text...",
  "sections": [
    {
      "title": "Section Title",
      "content": "Section summary text...",
      "timestamp": "MM:SS"
    }
  ]
}

Here is the transcript:
{transcript}

Ensure your response is valid JSON that can be parsed directly."#;

static TIMESTAMP_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d{2}:\d{2}:\d{2}\]").unwrap());
static SPEAKER_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[^\S\n]*\p{L}[\p{L}\p{N} .'-]{0,39}:").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// One timestamped section of a summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    pub title: String,
    pub content: String,
    /// End of the section, "MM:SS"
    pub timestamp: String,
}

/// Overview plus ordered sections, as stored and displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSummary {
    pub overall_summary: String,
    pub sections: Vec<Section>,
}

/// A single request to the completion service
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub json_mode: bool,
}

/// A chat-style completion backend returning the raw message text
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> eyre::Result<String>;
}

/// OpenAI chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, api_base: Option<String>) -> Self {
        if let Some(base) = api_base {
            self.api_base = base.trim_end_matches('/').to_string();
        }
        self
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> eyre::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| eyre!("OPENAI_API_KEY environment variable not set (required for summarization)"))?;

        debug!("Requesting completion with model {}", self.model);

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ]
        });
        if request.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("OpenAI API returned {status}: {body}");
        }

        let json: Value = resp.json().await?;
        extract_openai_text(&json)
    }
}

fn extract_openai_text(json: &Value) -> eyre::Result<String> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    bail!("unexpected OpenAI API response format");
}

/// Turns transcript text into a [`StructuredSummary`] via the completion service
#[derive(Clone)]
pub struct SummaryGenerator {
    service: Arc<dyn CompletionService>,
    max_transcript_chars: usize,
    max_tokens: u32,
}

impl SummaryGenerator {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            max_transcript_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_limits(mut self, max_transcript_chars: usize, max_tokens: u32) -> Self {
        self.max_transcript_chars = max_transcript_chars;
        self.max_tokens = max_tokens;
        self
    }

    pub async fn generate(&self, transcript: &str) -> Result<StructuredSummary> {
        let processed = preprocess_transcript(transcript, self.max_transcript_chars);
        debug!("Processed transcript length: {} characters", processed.chars().count());

        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: USER_PROMPT_TEMPLATE.replace("{transcript}", &processed),
            max_tokens: self.max_tokens,
            json_mode: true,
        };

        let raw = self
            .service
            .complete(&request)
            .await
            .map_err(|e| Error::AiService(format!("{e:#}")))?;

        let summary = parse_summary(&raw)?;
        info!("Generated summary with {} sections", summary.sections.len());
        Ok(summary)
    }
}

/// Strip timestamp markers and speaker labels, collapse whitespace and
/// truncate to `max_chars` characters (plus a trailing "...")
pub fn preprocess_transcript(transcript: &str, max_chars: usize) -> String {
    let processed = TIMESTAMP_MARKER.replace_all(transcript, "");
    let processed = SPEAKER_LABEL.replace_all(&processed, "");
    let processed = WHITESPACE.replace_all(&processed, " ");
    let processed = processed.trim();

    match processed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &processed[..cut]),
        None => processed.to_string(),
    }
}

/// Parse the completion text, filling in the overview and sections when absent
fn parse_summary(raw: &str) -> Result<StructuredSummary> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| Error::AiService(format!("completion was not valid JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| Error::AiService("completion JSON was not an object".to_string()))?;

    let overall_summary = obj
        .get("overallSummary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_OVERALL_SUMMARY)
        .to_string();

    let sections = match obj.get("sections").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items.iter().map(section_from_value).collect(),
        _ => vec![Section {
            title: FALLBACK_SECTION_TITLE.to_string(),
            content: overall_summary.clone(),
            timestamp: FALLBACK_SECTION_TIMESTAMP.to_string(),
        }],
    };

    Ok(StructuredSummary {
        overall_summary,
        sections,
    })
}

/// Sections are taken as given; fields of the wrong type become empty and a
/// non-object item keeps its text as the content
fn section_from_value(value: &Value) -> Section {
    match value {
        Value::Object(map) => {
            let field = |name: &str| map.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
            Section {
                title: field("title"),
                content: field("content"),
                timestamp: field("timestamp"),
            }
        }
        Value::String(s) => Section {
            content: s.clone(),
            ..Section::default()
        },
        other => Section {
            content: other.to_string(),
            ..Section::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct CannedCompletion {
        reply: eyre::Result<String>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedCompletion {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn err(msg: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(eyre!(msg)),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for CannedCompletion {
        async fn complete(&self, request: &CompletionRequest) -> eyre::Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(eyre!("{e}")),
            }
        }
    }

    #[test]
    fn test_preprocess_strips_markers_and_labels() {
        let raw = "[00:00:01] Speaker 1: Hello   there\nJohn: general\tkenobi";
        assert_eq!(preprocess_transcript(raw, 100), "Hello there general kenobi");
    }

    #[test]
    fn test_preprocess_truncates_with_ellipsis() {
        let raw = "abcdefghij".repeat(3);
        assert_eq!(preprocess_transcript(&raw, 12), "abcdefghijab...");
        assert_eq!(preprocess_transcript("short", 12), "short");
    }

    #[test]
    fn test_preprocess_truncates_on_char_boundary() {
        assert_eq!(preprocess_transcript("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_parse_valid_summary() {
        let raw = r#"{"overallSummary":"Overview","sections":[
            {"title":"Intro","content":"Start","timestamp":"01:30"},
            {"title":"Outro","content":"End","timestamp":"04:00"}]}"#;
        let summary = parse_summary(raw).unwrap();
        assert_eq!(summary.overall_summary, "Overview");
        assert_eq!(summary.sections.len(), 2);
        assert_eq!(summary.sections[1].timestamp, "04:00");
    }

    #[test]
    fn test_parse_empty_sections_falls_back() {
        let summary = parse_summary(r#"{"overallSummary":"X","sections":[]}"#).unwrap();
        assert_eq!(
            summary.sections,
            vec![Section {
                title: "Content Overview".into(),
                content: "X".into(),
                timestamp: "00:00".into(),
            }]
        );
    }

    #[test]
    fn test_parse_sections_not_a_list() {
        let summary = parse_summary(r#"{"overallSummary":"X","sections":{"title":"odd"}}"#).unwrap();
        assert_eq!(summary.sections.len(), 1);
        assert_eq!(summary.sections[0].title, "Content Overview");
    }

    #[test]
    fn test_parse_missing_overall_summary() {
        let summary = parse_summary(r#"{"sections":[]}"#).unwrap();
        assert_eq!(summary.overall_summary, "Summary not available.");
        assert_eq!(summary.sections[0].content, "Summary not available.");
    }

    #[test]
    fn test_parse_malformed_section_passes_through() {
        let summary = parse_summary(r#"{"overallSummary":"X","sections":[{"title":7}, "loose text"]}"#).unwrap();
        assert_eq!(summary.sections.len(), 2);
        assert_eq!(summary.sections[0], Section::default());
        assert_eq!(summary.sections[1].content, "loose text");
    }

    #[test]
    fn test_parse_not_json() {
        let err = parse_summary("Sure! Here is your summary").unwrap_err();
        assert!(matches!(err, Error::AiService(_)));
    }

    #[test]
    fn test_extract_openai_text() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "{}" } }]
        });
        assert_eq!(extract_openai_text(&json).unwrap(), "{}");
        assert!(extract_openai_text(&serde_json::json!({"choices": []})).is_err());
    }

    #[tokio::test]
    async fn test_generate_sends_prompt_contract() {
        let service = CannedCompletion::ok(r#"{"overallSummary":"Short","sections":[]}"#);
        let generator = SummaryGenerator::new(service.clone()).with_limits(50, 321);

        let summary = generator.generate("[00:00:05] Host: Hello world").await.unwrap();
        assert_eq!(summary.sections[0].content, "Short");

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_mode);
        assert_eq!(requests[0].max_tokens, 321);
        assert_eq!(requests[0].system, SYSTEM_PROMPT);
        assert!(requests[0].user.contains("Here is the transcript:\nHello world\n"));
    }

    #[tokio::test]
    async fn test_generate_maps_service_failure() {
        let generator = SummaryGenerator::new(CannedCompletion::err("OpenAI API returned 500"));
        let err = generator.generate("hello").await.unwrap_err();
        assert!(matches!(err, Error::AiService(ref detail) if detail.contains("500")));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = StructuredSummary {
            overall_summary: "O".into(),
            sections: vec![],
        };
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"overallSummary":"O","sections":[]}"#
        );
    }
}
