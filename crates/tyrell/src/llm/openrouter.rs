//! [`Inference`] backed by the OpenRouter chat completions API.

use crate::config::LlmConfig;
use crate::llm::prompts::{
    COMPRESS, PromptTemplate, SUMMARIZE_CHUNK, SUMMARIZE_FINAL, SUMMARIZE_ONESHOT,
};
use crate::llm::{ChunkRequest, Inference, InferenceFuture};
use crate::{ChatCompletion, ChatRequest, Message, OpenRouterClient};
use tracing::warn;

/// Runs each operation as a single system + user chat completion.
pub struct OpenRouterInference {
    client: OpenRouterClient,
    config: LlmConfig,
}

impl OpenRouterInference {
    pub fn new(client: OpenRouterClient, config: LlmConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Build the request body for a rendered prompt pair.
    fn request(&self, system: String, user: String) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![Message::system(system), Message::user(user)],
            max_tokens: self.config.max_response_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            top_k: self.config.top_k,
            min_p: self.config.min_p,
            repetition_penalty: self.config.repetition_penalty,
            seed: None,
        }
    }

    fn complete<'a>(
        &'a self,
        template: PromptTemplate,
        vars: Vec<(&'static str, String)>,
    ) -> InferenceFuture<'a> {
        Box::pin(async move {
            let borrowed: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
            let (system, user) = template.render(&borrowed);
            let completion = self.client.chat(&self.request(system, user)).await?;
            completion_text(completion, self.config.max_response_tokens)
        })
    }
}

/// Extract the answer text. Truncated answers are returned as is, with a
/// warning.
fn completion_text(completion: ChatCompletion, max_tokens: u32) -> Result<String, String> {
    if completion.truncated() {
        warn!("Completion stopped at max_tokens ({max_tokens}); summary is truncated");
    }
    completion
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| "Empty LLM response".to_string())
}

impl Inference for OpenRouterInference {
    fn summarize_oneshot<'a>(&'a self, date: &'a str, document: &'a str) -> InferenceFuture<'a> {
        self.complete(
            SUMMARIZE_ONESHOT,
            vec![("date", date.to_string()), ("document", document.to_string())],
        )
    }

    fn summarize_chunk<'a>(&'a self, request: ChunkRequest<'a>) -> InferenceFuture<'a> {
        self.complete(
            SUMMARIZE_CHUNK,
            vec![
                ("date", request.date.to_string()),
                ("chunk", request.chunk.to_string()),
                ("prior_summary", request.prior_summary.to_string()),
                ("chunk_no", request.chunk_no.to_string()),
                ("total_chunks", request.total_chunks.to_string()),
            ],
        )
    }

    fn compress<'a>(&'a self, date: &'a str, original: &'a str) -> InferenceFuture<'a> {
        self.complete(
            COMPRESS,
            vec![("date", date.to_string()), ("original", original.to_string())],
        )
    }

    fn summarize_final<'a>(&'a self, date: &'a str, summary: &'a str) -> InferenceFuture<'a> {
        self.complete(
            SUMMARIZE_FINAL,
            vec![("date", date.to_string()), ("summary", summary.to_string())],
        )
    }
}
