//! Hierarchical summarization of arbitrarily long documents with a
//! fixed-context language model.
//!
//! `tyrell` splits a document into token-bounded chunks, summarizes them in
//! order (each chunk sees the previous chunk's summary), and then keeps
//! shrinking the accumulated summaries until they fit the final-context
//! budget: by compressing each summary in place when the overage is small, or
//! by re-chunking and re-summarizing the whole set as a new level when it is
//! large. A last inference call turns what remains into the final summary.
//!
//! # Getting started
//!
//! ```ignore
//! use tyrell::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let api_key = std::env::var("OPENROUTER_KEY").unwrap();
//!     let client = OpenRouterClient::new(api_key)?;
//!     let inference = OpenRouterInference::new(client, LlmConfig::default());
//!
//!     let tokenizer = PieceTokenizer::new();
//!     let summarizer = Summarizer::new(&inference, &tokenizer, SummarizerConfig::default());
//!
//!     let lock = ModelLock::new();
//!     let permit = lock.acquire().await;
//!     let response = summarizer
//!         .summarize(&permit, &std::fs::read_to_string("report.txt").unwrap())
//!         .await
//!         .map_err(|e| e.to_string())?;
//!
//!     println!("{}", response.summary_text().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`summarizer`] | [`Summarizer`](summarizer::Summarizer) pipeline, state, budget loop, response shapes, events, model permit |
//! | [`chunker`] | Token-aware near-equal chunking |
//! | [`tokenizer`] | [`Tokenizer`](tokenizer::Tokenizer) trait and the SentencePiece-style [`PieceTokenizer`](tokenizer::PieceTokenizer) |
//! | [`llm`] | [`Inference`](llm::Inference) trait, prompt templates, OpenRouter backend |
//! | [`config`] | JSON configuration for the service and the CLI client |
//! | [`error`] | [`SummarizeError`](error::SummarizeError) |

pub mod chunker;
pub mod config;
pub mod error;
pub mod llm;
pub mod prelude;
pub mod summarizer;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for all summarization calls.
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";

/// Per-request timeout for a single completion.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

// ── Message types ──────────────────────────────────────────────────

/// Who a prompt message speaks for. Summarization prompts only ever carry
/// instructions and the text to summarize.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

/// One prompt message.
#[derive(Serialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Token accounting reported by the provider; logged at debug level.
#[derive(Deserialize, Debug)]
struct UsageInfo {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

/// First choice of a completion, as returned by `OpenRouterClient::chat()`.
#[derive(Debug, Default)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

impl ChatCompletion {
    /// The model stopped at `max_tokens` rather than finishing its answer.
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

impl RawChatResponse {
    fn into_completion(self) -> Result<ChatCompletion, String> {
        if let Some(err) = self.error {
            return Err(format!("OpenRouter API error: {}", err.message));
        }
        Ok(self
            .choices
            .and_then(|c| c.into_iter().next())
            .map(|c| ChatCompletion {
                content: c.message.content,
                finish_reason: c.finish_reason,
            })
            .unwrap_or_default())
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) referer: String,
    pub(crate) title: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_headers(api_key, "https://github.com/tyrell-summarizer", "tyrell")
    }

    /// Create a new client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tyrell/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("OpenRouter API HTTP {status}: {text}"));
        }

        let parsed: RawChatResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        parsed.into_completion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let sys = Message::system("hello");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.content, "hello");

        let user = Message::user("world");
        assert_eq!(user.role, MessageRole::User);
    }

    #[test]
    fn chat_request_default_skips_none_fields() {
        let req = ChatRequest {
            model: "test-model".into(),
            messages: vec![Message::user("hi")],
            max_tokens: 100,
            temperature: 0.5,
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("top_p").is_none());
        assert!(json.get("min_p").is_none());
        assert!(json.get("seed").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn raw_response_with_error_is_err() {
        let raw: RawChatResponse =
            serde_json::from_str(r#"{"error": {"message": "rate limited"}}"#).unwrap();
        let err = raw.into_completion().unwrap_err();
        assert!(err.contains("rate limited"));
    }

    #[test]
    fn raw_response_takes_first_choice() {
        let raw: RawChatResponse = serde_json::from_str(
            r#"{"choices": [
                {"message": {"content": "first"}, "finish_reason": "stop"},
                {"message": {"content": "second"}, "finish_reason": "stop"}
            ], "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}}"#,
        )
        .unwrap();
        let completion = raw.into_completion().unwrap();
        assert_eq!(completion.content.as_deref(), Some("first"));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert!(!completion.truncated());
    }

    #[test]
    fn length_finish_reason_marks_truncation() {
        let raw: RawChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "cut off mid"}, "finish_reason": "length"}]}"#,
        )
        .unwrap();
        let completion = raw.into_completion().unwrap();
        assert!(completion.truncated());
        assert_eq!(completion.content.as_deref(), Some("cut off mid"));
    }

    #[test]
    fn raw_response_without_choices_is_empty() {
        let raw: RawChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let completion = raw.into_completion().unwrap();
        assert!(completion.content.is_none());
        assert!(completion.finish_reason.is_none());
    }
}
