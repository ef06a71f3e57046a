//! The summarization pipeline.
//!
//! [`Summarizer::summarize`] runs one request end to end:
//!
//! 1. Chunk the document ([`chunk_document`]).
//! 2. Zero chunks: return [`SummaryResponse::Empty`] without any inference.
//! 3. One chunk: summarize it in a single call and return
//!    [`SummaryResponse::Oneshot`].
//! 4. Otherwise summarize the chunks in order as level 0, enforce the
//!    final-context budget (see [`budget`]), and run the finishing pass over
//!    the labeled survivors.
//!
//! Every stage writes into one [`PipelineState`]. Any inference or
//! tokenization failure aborts the request and discards that state.

pub mod budget;
pub mod events;
mod level;
pub mod permit;
pub mod response;
pub mod state;

pub use budget::BudgetAction;
pub use events::{EventHandler, FnEventHandler, LoggingHandler, NoopHandler, SummaryEvent};
pub use permit::{ModelLock, ModelPermit};
pub use response::{ResponseKind, SummaryResponse};
pub use state::{ChunkSummaryRecord, CompressionRecord, InferenceMethod, Level, PipelineState};

use std::time::Instant;
use tracing::debug;

use crate::chunker::chunk_document;
use crate::error::SummarizeError;
use crate::llm::{Inference, InferenceFuture, InferenceOp};
use crate::tokenizer::Tokenizer;

/// Token budgets for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizerConfig {
    /// Maximum tokens per chunk. Default: `2048`.
    pub max_chunk_token_length: usize,
    /// Maximum combined tokens of the finishing pass's input. Default: `2048`.
    pub max_final_summary_context_tokens: usize,
    /// Upper bound on compression and resummary passes. Default: `8`.
    pub max_budget_passes: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_chunk_token_length: 2048,
            max_final_summary_context_tokens: 2048,
            max_budget_passes: 8,
        }
    }
}

impl SummarizerConfig {
    pub fn with_max_chunk_token_length(mut self, tokens: usize) -> Self {
        self.max_chunk_token_length = tokens;
        self
    }

    pub fn with_max_final_summary_context_tokens(mut self, tokens: usize) -> Self {
        self.max_final_summary_context_tokens = tokens;
        self
    }

    pub fn with_max_budget_passes(mut self, passes: u32) -> Self {
        self.max_budget_passes = passes;
        self
    }

    pub fn validate(&self) -> Result<(), SummarizeError> {
        if self.max_chunk_token_length == 0 {
            return Err(SummarizeError::InvalidConfig(
                "max_chunk_token_length must be greater than zero".into(),
            ));
        }
        if self.max_final_summary_context_tokens == 0 {
            return Err(SummarizeError::InvalidConfig(
                "max_final_summary_context_tokens must be greater than zero".into(),
            ));
        }
        if self.max_budget_passes == 0 {
            return Err(SummarizeError::InvalidConfig(
                "max_budget_passes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Runs the summarization pipeline against borrowed capabilities.
pub struct Summarizer<'a> {
    inference: &'a dyn Inference,
    tokenizer: &'a dyn Tokenizer,
    config: SummarizerConfig,
    event_handler: &'a dyn EventHandler,
    date: Option<String>,
}

impl<'a> Summarizer<'a> {
    pub fn new(
        inference: &'a dyn Inference,
        tokenizer: &'a dyn Tokenizer,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            inference,
            tokenizer,
            config,
            event_handler: &LoggingHandler,
            date: None,
        }
    }

    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.event_handler = handler;
        self
    }

    /// Pin the date passed to every prompt instead of using today's.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Summarize `document`.
    ///
    /// The caller must hold the model for the whole call, which the
    /// `permit` argument witnesses.
    pub async fn summarize(
        &self,
        _permit: &ModelPermit<'_>,
        document: &str,
    ) -> Result<SummaryResponse, SummarizeError> {
        self.config.validate()?;
        let date = self
            .date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

        let chunks = chunk_document(self.tokenizer, document, self.config.max_chunk_token_length)?;
        self.event_handler.on_event(&SummaryEvent::Chunked {
            level: 0,
            num_chunks: chunks.len(),
        });

        match chunks.as_slice() {
            [] => Ok(SummaryResponse::empty_document()),
            [only] => self.summarize_oneshot(&date, only).await,
            _ => self.summarize_levels(&date, &chunks).await,
        }
    }

    async fn summarize_oneshot(
        &self,
        date: &str,
        chunk: &str,
    ) -> Result<SummaryResponse, SummarizeError> {
        let (text, inference_time) = self
            .infer(
                InferenceOp::SummarizeOneshot,
                self.inference.summarize_oneshot(date, chunk),
            )
            .await?;
        self.event_handler
            .on_event(&SummaryEvent::Oneshot { inference_time });
        self.event_handler.on_event(&SummaryEvent::Finished {
            total_inference_time: inference_time,
        });
        Ok(SummaryResponse::oneshot(ChunkSummaryRecord::new(
            0,
            1,
            inference_time,
            text,
        )))
    }

    async fn summarize_levels(
        &self,
        date: &str,
        chunks: &[String],
    ) -> Result<SummaryResponse, SummarizeError> {
        let mut state = PipelineState::new();

        let level = self.summarize_level(date, 0, chunks).await?;
        let inference_time = level.inference_time();
        state.push_level(level, InferenceMethod::InitialSummary);
        self.event_handler.on_event(&SummaryEvent::StageCompleted {
            method: InferenceMethod::InitialSummary,
            inference_time,
        });
        self.measure(&mut state)?;

        self.enforce_budget(date, &mut state).await?;

        let context = final_context(&state.raw_results);
        let (response, summary_inference_time) = self
            .infer(
                InferenceOp::SummarizeFinal,
                self.inference.summarize_final(date, &context),
            )
            .await?;
        state.push_final(summary_inference_time);
        self.event_handler.on_event(&SummaryEvent::StageCompleted {
            method: InferenceMethod::FinalSummary,
            inference_time: summary_inference_time,
        });
        self.event_handler.on_event(&SummaryEvent::Finished {
            total_inference_time: state.total_inference_time,
        });

        Ok(SummaryResponse::full(state, response, summary_inference_time))
    }

    /// Refresh `state.raw_results_len` from the tokenizer.
    fn measure(&self, state: &mut PipelineState) -> Result<(), SummarizeError> {
        let mut total = 0;
        for text in &state.raw_results {
            total += self
                .tokenizer
                .count(text)
                .map_err(SummarizeError::Tokenization)?;
        }
        state.raw_results_len = total;
        Ok(())
    }

    /// Await one inference call, returning its trimmed text and latency in
    /// milliseconds.
    async fn infer(
        &self,
        op: InferenceOp,
        call: InferenceFuture<'_>,
    ) -> Result<(String, u64), SummarizeError> {
        let start = Instant::now();
        let text = call
            .await
            .map_err(|e| SummarizeError::inference(op, e))?;
        let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!("{op} call took {elapsed}ms ({} chars)", text.len());
        Ok((text.trim().to_string(), elapsed))
    }
}

/// Label each summary with its position for the finishing pass.
pub fn final_context(texts: &[String]) -> String {
    let total = texts.len();
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("\n\nChunk ({} of {total}):\n{text}", i + 1))
        .collect()
}
