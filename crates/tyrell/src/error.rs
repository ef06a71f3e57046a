//! Errors that abort a summarization request.
//!
//! An empty document is not an error here: it is reported through
//! [`SummaryResponse::Empty`](crate::summarizer::SummaryResponse::Empty).
//! Everything in this enum discards the partial pipeline state.

use crate::llm::InferenceOp;

/// Terminal failure of a summarization request.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    /// An inference call failed. Never retried.
    #[error("{op} inference failed: {message}")]
    Inference { op: InferenceOp, message: String },

    /// The tokenizer could not process a text.
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    /// Budget parameters that would make the pipeline meaningless.
    #[error("invalid summarizer config: {0}")]
    InvalidConfig(String),
}

impl SummarizeError {
    pub(crate) fn inference(op: InferenceOp, message: impl Into<String>) -> Self {
        Self::Inference {
            op,
            message: message.into(),
        }
    }
}
