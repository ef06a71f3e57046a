//! Inference capability consumed by the summarization pipeline.
//!
//! The pipeline talks to the model through four named operations, one per
//! prompt. [`Inference`] is the seam: [`OpenRouterInference`] is the
//! production implementation and tests supply scripted fakes. Returned text
//! is trimmed and timed by the caller, not by the implementation.

pub mod openrouter;
pub mod prompts;

pub use openrouter::OpenRouterInference;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every [`Inference`] operation.
pub type InferenceFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

/// The four inference operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferenceOp {
    SummarizeOneshot,
    SummarizeChunk,
    Compress,
    SummarizeFinal,
}

impl InferenceOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceOp::SummarizeOneshot => "summarize_oneshot",
            InferenceOp::SummarizeChunk => "summarize_chunk",
            InferenceOp::Compress => "compress",
            InferenceOp::SummarizeFinal => "summarize_final",
        }
    }
}

impl fmt::Display for InferenceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for summarizing one chunk of a level.
#[derive(Debug, Clone, Copy)]
pub struct ChunkRequest<'a> {
    pub date: &'a str,
    pub chunk: &'a str,
    /// Response for the preceding chunk of the same level; empty for the first.
    pub prior_summary: &'a str,
    /// 1-based position within the level.
    pub chunk_no: usize,
    pub total_chunks: usize,
}

/// A language model exposing the summarizer's four operations.
///
/// Uses boxed futures so the trait stays dyn-compatible. Implementations
/// must not assume any concurrency: the pipeline awaits one call at a time.
pub trait Inference: Send + Sync {
    /// Summarize a document that fits in a single chunk.
    fn summarize_oneshot<'a>(&'a self, date: &'a str, document: &'a str) -> InferenceFuture<'a>;

    /// Summarize one chunk, using the previous chunk's summary as context.
    fn summarize_chunk<'a>(&'a self, request: ChunkRequest<'a>) -> InferenceFuture<'a>;

    /// Condense a single summary slightly, without cross-item context.
    fn compress<'a>(&'a self, date: &'a str, original: &'a str) -> InferenceFuture<'a>;

    /// Produce the final summary from the labeled section summaries.
    fn summarize_final<'a>(&'a self, date: &'a str, summary: &'a str) -> InferenceFuture<'a>;
}
