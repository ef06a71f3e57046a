//! Events emitted by the [`Summarizer`](super::Summarizer) during a request.
//!
//! Each stage of the pipeline reports what it did through [`SummaryEvent`].
//! Callers implement [`EventHandler`] to observe them for logging, progress
//! display or tests.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or silent runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` (the default) |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |

use tracing::{debug, info, warn};

use super::state::InferenceMethod;

/// Events emitted during one summarization request.
#[derive(Debug)]
pub enum SummaryEvent<'a> {
    /// Text was split into the chunks of `level`.
    Chunked { level: usize, num_chunks: usize },
    /// One chunk of a level was summarized.
    ChunkSummarized {
        id: &'a str,
        total_chunks: usize,
        inference_time: u64,
        response: &'a str,
    },
    /// A stage finished and was appended to the provenance log.
    StageCompleted {
        method: InferenceMethod,
        inference_time: u64,
    },
    /// The working set was measured against the final-context budget.
    BudgetCheck { tokens: usize, budget: usize },
    /// A compression pass is starting.
    Compressing { factor: f64, items: usize },
    /// A full resummary is starting and will produce `level`.
    Resummarizing { factor: f64, level: usize },
    /// The overage is small enough to accept as slack.
    ThresholdNear { factor: f64 },
    /// The loop ran out of passes while still over budget.
    BudgetPassLimit { passes: u32, tokens: usize },
    /// A pass did not shrink the working set.
    BudgetStalled { before: usize, after: usize },
    /// The document fit in one chunk and was summarized in one call.
    Oneshot { inference_time: u64 },
    /// The request completed.
    Finished { total_inference_time: u64 },
}

/// Handler for summarizer events.
///
/// The default implementation ignores every event.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &SummaryEvent<'_>) {
        let _ = event;
    }
}

/// Ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let SummaryEvent::ChunkSummarized { id, .. } = event {
///         println!("done {id}");
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&SummaryEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&SummaryEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&SummaryEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &SummaryEvent<'_>) {
        (self.0)(event)
    }
}

/// Logs every event through `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &SummaryEvent<'_>) {
        match event {
            SummaryEvent::Chunked { level, num_chunks } => {
                info!("Level {level}: {num_chunks} chunk(s)");
            }
            SummaryEvent::ChunkSummarized {
                id,
                total_chunks,
                inference_time,
                response,
            } => {
                let preview: String = response.chars().take(120).collect();
                debug!(
                    "Chunk {id} of {total_chunks} in {inference_time}ms: {preview}{}",
                    if response.chars().count() > 120 { "..." } else { "" }
                );
            }
            SummaryEvent::StageCompleted {
                method,
                inference_time,
            } => {
                info!("Stage {} done in {inference_time}ms", method.as_str());
            }
            SummaryEvent::BudgetCheck { tokens, budget } => {
                debug!("Working set: {tokens} tokens (budget {budget})");
            }
            SummaryEvent::Compressing { factor, items } => {
                info!("Compressing {items} summaries (factor {factor:.3})");
            }
            SummaryEvent::Resummarizing { factor, level } => {
                info!("Resummarizing into level {level} (factor {factor:.3})");
            }
            SummaryEvent::ThresholdNear { factor } => {
                info!("Threshold near (factor {factor:.3}), accepting as is");
            }
            SummaryEvent::BudgetPassLimit { passes, tokens } => {
                warn!("Budget loop stopped after {passes} passes with {tokens} tokens");
            }
            SummaryEvent::BudgetStalled { before, after } => {
                warn!("Budget pass did not shrink the summaries ({before} -> {after} tokens)");
            }
            SummaryEvent::Oneshot { inference_time } => {
                info!("Single chunk summarized in {inference_time}ms");
            }
            SummaryEvent::Finished {
                total_inference_time,
            } => {
                info!("Summary finished, total inference {total_inference_time}ms");
            }
        }
    }
}
