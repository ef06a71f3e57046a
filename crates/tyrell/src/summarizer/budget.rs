//! Final-context budget enforcement.
//!
//! After the initial level, the working set of raw summaries is measured
//! against `max_final_summary_context_tokens`. The overage factor picks the
//! next step:
//!
//! | Factor | Action |
//! |--------|--------|
//! | `<= 1.0` | [`BudgetAction::Stop`] |
//! | `(1.0, 1.10]` | [`BudgetAction::Accept`], slack left as is |
//! | `(1.10, 1.25]` | [`BudgetAction::Compress`] every summary in place |
//! | `> 1.25` | [`BudgetAction::FullResummarize`] into a new level |
//!
//! The loop repeats until it stops, runs out of passes, or a pass fails to
//! shrink the working set.

use super::Summarizer;
use super::events::SummaryEvent;
use super::state::{CompressionRecord, InferenceMethod, PipelineState, assemble};
use crate::chunker::chunk_document;
use crate::error::SummarizeError;
use crate::llm::InferenceOp;

/// Overage factors at or below this are accepted as slack.
pub const SLACK_FACTOR: f64 = 1.10;

/// Overage factors above this trigger a full resummary.
pub const RESUMMARY_FACTOR: f64 = 1.25;

/// What the loop does with the current working set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetAction {
    /// Within budget.
    Stop,
    /// Slightly over budget; close enough.
    Accept { factor: f64 },
    Compress { factor: f64 },
    FullResummarize { factor: f64 },
}

impl BudgetAction {
    /// Pick the action for a working set of `length` tokens.
    ///
    /// `budget` must be non-zero; [`SummarizerConfig::validate`](super::SummarizerConfig::validate)
    /// guarantees it.
    pub fn decide(length: usize, budget: usize) -> Self {
        if length <= budget {
            return BudgetAction::Stop;
        }
        let factor = length as f64 / budget as f64;
        if factor > RESUMMARY_FACTOR {
            BudgetAction::FullResummarize { factor }
        } else if factor > SLACK_FACTOR {
            BudgetAction::Compress { factor }
        } else {
            BudgetAction::Accept { factor }
        }
    }
}

impl Summarizer<'_> {
    /// Shrink `state.raw_results` until it fits the final-context budget.
    pub(crate) async fn enforce_budget(
        &self,
        date: &str,
        state: &mut PipelineState,
    ) -> Result<(), SummarizeError> {
        let budget = self.config.max_final_summary_context_tokens;
        let mut passes = 0u32;

        loop {
            self.event_handler.on_event(&SummaryEvent::BudgetCheck {
                tokens: state.raw_results_len,
                budget,
            });

            let action = BudgetAction::decide(state.raw_results_len, budget);
            match action {
                BudgetAction::Stop => return Ok(()),
                BudgetAction::Accept { factor } => {
                    self.event_handler.on_event(&SummaryEvent::ThresholdNear { factor });
                    return Ok(());
                }
                _ if passes >= self.config.max_budget_passes => {
                    self.event_handler.on_event(&SummaryEvent::BudgetPassLimit {
                        passes,
                        tokens: state.raw_results_len,
                    });
                    return Ok(());
                }
                BudgetAction::Compress { factor } => {
                    self.event_handler.on_event(&SummaryEvent::Compressing {
                        factor,
                        items: state.raw_results.len(),
                    });
                    self.compress_pass(date, state).await?;
                }
                BudgetAction::FullResummarize { factor } => {
                    self.event_handler.on_event(&SummaryEvent::Resummarizing {
                        factor,
                        level: state.next_level(),
                    });
                    self.resummarize_pass(date, state).await?;
                }
            }
            passes += 1;

            let before = state.raw_results_len;
            self.measure(state)?;
            if state.raw_results_len >= before {
                self.event_handler.on_event(&SummaryEvent::BudgetStalled {
                    before,
                    after: state.raw_results_len,
                });
                return Ok(());
            }
        }
    }

    /// Compress every working-set entry independently, in order.
    async fn compress_pass(
        &self,
        date: &str,
        state: &mut PipelineState,
    ) -> Result<(), SummarizeError> {
        let mut result = Vec::with_capacity(state.raw_results.len());
        let mut inference_time = 0;
        for original in &state.raw_results {
            let (text, ms) = self
                .infer(InferenceOp::Compress, self.inference.compress(date, original))
                .await?;
            inference_time += ms;
            result.push(text);
        }

        let record = CompressionRecord {
            source: state.raw_results.clone(),
            result,
            inference_time,
        };
        state.push_compression(record);
        self.event_handler.on_event(&SummaryEvent::StageCompleted {
            method: InferenceMethod::Compression,
            inference_time,
        });
        Ok(())
    }

    /// Re-chunk the joined working set and summarize it as a new level.
    async fn resummarize_pass(
        &self,
        date: &str,
        state: &mut PipelineState,
    ) -> Result<(), SummarizeError> {
        let joined = assemble(&state.raw_results);
        let chunks = chunk_document(self.tokenizer, &joined, self.config.max_chunk_token_length)?;
        let index = state.next_level();
        self.event_handler.on_event(&SummaryEvent::Chunked {
            level: index,
            num_chunks: chunks.len(),
        });
        let level = self.summarize_level(date, index, &chunks).await?;
        let inference_time = level.inference_time();
        state.push_level(level, InferenceMethod::FullResummary);
        self.event_handler.on_event(&SummaryEvent::StageCompleted {
            method: InferenceMethod::FullResummary,
            inference_time,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_budget_stops() {
        assert_eq!(BudgetAction::decide(0, 100), BudgetAction::Stop);
        assert_eq!(BudgetAction::decide(100, 100), BudgetAction::Stop);
    }

    #[test]
    fn small_overage_is_accepted() {
        assert!(matches!(BudgetAction::decide(101, 100), BudgetAction::Accept { .. }));
        assert!(matches!(BudgetAction::decide(110, 100), BudgetAction::Accept { .. }));
    }

    #[test]
    fn moderate_overage_compresses() {
        assert!(matches!(BudgetAction::decide(111, 100), BudgetAction::Compress { .. }));
        assert!(matches!(BudgetAction::decide(125, 100), BudgetAction::Compress { .. }));
    }

    #[test]
    fn large_overage_resummarizes() {
        match BudgetAction::decide(130, 100) {
            BudgetAction::FullResummarize { factor } => assert!((factor - 1.3).abs() < 1e-9),
            other => panic!("expected FullResummarize, got {other:?}"),
        }
        assert!(matches!(
            BudgetAction::decide(126, 100),
            BudgetAction::FullResummarize { .. }
        ));
    }

    #[test]
    fn scenario_factors() {
        assert!(matches!(BudgetAction::decide(23, 20), BudgetAction::Compress { .. }));
        assert!(matches!(BudgetAction::decide(21, 20), BudgetAction::Accept { .. }));
    }
}
