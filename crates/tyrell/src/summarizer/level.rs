//! Level-sequential chunk summarization.

use super::Summarizer;
use super::events::SummaryEvent;
use super::state::{ChunkSummaryRecord, Level};
use crate::error::SummarizeError;
use crate::llm::{ChunkRequest, InferenceOp};

impl Summarizer<'_> {
    /// Summarize `chunks` in order as level `index`.
    ///
    /// Each call sees the previous chunk's response as its prior summary; the
    /// first chunk of every level starts from an empty one. Calls never
    /// overlap.
    pub(crate) async fn summarize_level(
        &self,
        date: &str,
        index: usize,
        chunks: &[String],
    ) -> Result<Level, SummarizeError> {
        let total_chunks = chunks.len();
        let mut records: Vec<ChunkSummaryRecord> = Vec::with_capacity(total_chunks);

        for (i, chunk) in chunks.iter().enumerate() {
            let prior_summary = records.last().map_or("", |r| r.response.as_str());
            let request = ChunkRequest {
                date,
                chunk,
                prior_summary,
                chunk_no: i + 1,
                total_chunks,
            };
            let (response, inference_time) = self
                .infer(InferenceOp::SummarizeChunk, self.inference.summarize_chunk(request))
                .await?;

            let record = ChunkSummaryRecord::new(index, i + 1, inference_time, response);
            self.event_handler.on_event(&SummaryEvent::ChunkSummarized {
                id: &record.id,
                total_chunks,
                inference_time,
                response: &record.response,
            });
            records.push(record);
        }

        Ok(Level { index, records })
    }
}
