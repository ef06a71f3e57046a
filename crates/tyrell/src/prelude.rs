//! Convenience re-exports for common `tyrell` types.
//!
//! ```ignore
//! use tyrell::prelude::*;
//! ```
//!
//! Covers running the pipeline end to end: the OpenRouter client and
//! inference backend, the tokenizer, the summarizer with its config, events
//! and model permit, and the response type. Prompt templates and pipeline
//! internals are left to their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ChatRequest, Message, OpenRouterClient};

// ── Capabilities ────────────────────────────────────────────────────
pub use crate::llm::{ChunkRequest, Inference, InferenceFuture, InferenceOp, OpenRouterInference};
pub use crate::tokenizer::{PieceTokenizer, Tokenizer};

// ── Pipeline ────────────────────────────────────────────────────────
pub use crate::config::{LlmConfig, TyrellConfig};
pub use crate::error::SummarizeError;
pub use crate::summarizer::{
    EventHandler, FnEventHandler, LoggingHandler, ModelLock, ModelPermit, NoopHandler,
    ResponseKind, Summarizer, SummarizerConfig, SummaryEvent, SummaryResponse,
};
