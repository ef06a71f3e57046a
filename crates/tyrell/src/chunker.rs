//! Token-aware document chunking.
//!
//! Splits a document into nearly equal chunks instead of filling every chunk
//! to the maximum and leaving a short tail. The plan is computed in tokens,
//! but the running chunk grows by fragment *character* length, so chunks
//! usually come out smaller (and more numerous) than the plan suggests.

use crate::error::SummarizeError;
use crate::tokenizer::{Tokenizer, tidy_pieces};
use tracing::debug;

/// Chunk count and per-chunk target derived from a document's token count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub num_tokens: usize,
    /// `ceil(num_tokens / max_chunk_token_length)`.
    pub num_chunks: usize,
    /// `floor(num_tokens / num_chunks)`; the largest nearly-equal partition
    /// that stays within the maximum.
    pub target_length: usize,
}

impl ChunkPlan {
    /// Plan chunking for `num_tokens` tokens. `max_chunk_token_length` must
    /// be positive; the summarizer config enforces this.
    pub fn new(num_tokens: usize, max_chunk_token_length: usize) -> Self {
        let max = max_chunk_token_length.max(1);
        let num_chunks = num_tokens.div_ceil(max);
        let target_length = if num_chunks == 0 {
            0
        } else {
            num_tokens / num_chunks
        };
        Self {
            num_tokens,
            num_chunks,
            target_length,
        }
    }
}

/// Split `document` into chunk strings.
///
/// Zero tokens yields zero chunks; the caller decides what that means.
pub fn chunk_document(
    tokenizer: &dyn Tokenizer,
    document: &str,
    max_chunk_token_length: usize,
) -> Result<Vec<String>, SummarizeError> {
    let tokens = tokenizer
        .tokenize(document)
        .map_err(SummarizeError::Tokenization)?;
    let plan = ChunkPlan::new(tokens.len(), max_chunk_token_length);
    debug!(
        "Chunk plan: {} tokens -> {} chunks, target length {}",
        plan.num_tokens, plan.num_chunks, plan.target_length
    );
    Ok(split_tokens(&tokens, plan.target_length))
}

/// Greedily group fragments so that each group's character length stays
/// within `target_length`. A fragment longer than the target still forms a
/// chunk on its own. The last group is always emitted.
pub(crate) fn split_tokens(tokens: &[String], target_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_length = 0usize;

    for token in tokens {
        let token_length = token.chars().count();
        if current_length + token_length > target_length && !current.is_empty() {
            chunks.push(tidy_pieces(&current));
            current.clear();
            current_length = 0;
        }
        current.push_str(token);
        current_length += token_length;
    }

    if !current.is_empty() {
        chunks.push(tidy_pieces(&current));
    }

    chunks
}
