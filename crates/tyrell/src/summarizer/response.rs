//! The terminal result of one request.
//!
//! The three variants serialize to three distinct JSON shapes. The oneshot
//! shape has no compression or resummary metadata because that path never
//! runs the budget loop.

use serde::Serialize;

use super::state::{ChunkSummaryRecord, CompressionRecord, InferenceMethod, PipelineState};

/// Error text of the empty-document result.
pub const EMPTY_DOCUMENT_ERROR: &str = "Empty document.";

/// One assembled summary. `id` is 1-based, `length` is in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledSummary {
    pub id: usize,
    pub summary: String,
    pub length: usize,
}

impl AssembledSummary {
    fn numbered(texts: impl IntoIterator<Item = String>) -> Vec<Self> {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, summary)| AssembledSummary {
                id: i + 1,
                length: summary.chars().count(),
                summary,
            })
            .collect()
    }
}

/// `{error}`: the document produced no chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyResponse {
    pub error: String,
}

/// The document fit in one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneshotResponse {
    pub results: Vec<ChunkSummaryRecord>,
    pub summaries: Vec<AssembledSummary>,
    pub summary: String,
    pub total_inference_time: u64,
}

/// The document went through levels, the budget loop and the finishing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullResponse {
    /// One inner list per level.
    pub results: Vec<Vec<ChunkSummaryRecord>>,
    /// Every assembled stage summary, then the final summary.
    pub summaries: Vec<AssembledSummary>,
    pub compressions: Vec<CompressionRecord>,
    /// The final summary.
    pub response: String,
    pub resummarized: bool,
    pub compressed: bool,
    pub inference_methods: Vec<InferenceMethod>,
    pub total_inference_time: u64,
    /// Latency of the finishing call alone.
    pub summary_inference_time: u64,
}

/// Discriminant of [`SummaryResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Empty,
    Oneshot,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SummaryResponse {
    Empty(EmptyResponse),
    Oneshot(OneshotResponse),
    Full(FullResponse),
}

impl SummaryResponse {
    pub fn empty_document() -> Self {
        SummaryResponse::Empty(EmptyResponse {
            error: EMPTY_DOCUMENT_ERROR.to_string(),
        })
    }

    pub(crate) fn oneshot(record: ChunkSummaryRecord) -> Self {
        let total_inference_time = record.inference_time;
        let summary = record.response.clone();
        SummaryResponse::Oneshot(OneshotResponse {
            summaries: AssembledSummary::numbered([summary.clone()]),
            results: vec![record],
            summary,
            total_inference_time,
        })
    }

    /// Fold a finished pipeline and the final summary into the result.
    pub(crate) fn full(
        state: PipelineState,
        response: String,
        summary_inference_time: u64,
    ) -> Self {
        let PipelineState {
            levels,
            assembled_summaries,
            compressions,
            methods,
            resummarized,
            compressed,
            total_inference_time,
            ..
        } = state;

        let summaries = AssembledSummary::numbered(
            assembled_summaries
                .into_iter()
                .chain(std::iter::once(response.clone())),
        );

        SummaryResponse::Full(FullResponse {
            results: levels.into_iter().map(|l| l.records).collect(),
            summaries,
            compressions,
            response,
            resummarized,
            compressed,
            inference_methods: methods,
            total_inference_time,
            summary_inference_time,
        })
    }

    pub fn kind(&self) -> ResponseKind {
        match self {
            SummaryResponse::Empty(_) => ResponseKind::Empty,
            SummaryResponse::Oneshot(_) => ResponseKind::Oneshot,
            SummaryResponse::Full(_) => ResponseKind::Full,
        }
    }

    /// The error text of an empty-document result.
    pub fn error(&self) -> Option<&str> {
        match self {
            SummaryResponse::Empty(e) => Some(&e.error),
            _ => None,
        }
    }

    /// The final summary, if there is one.
    pub fn summary_text(&self) -> Option<&str> {
        match self {
            SummaryResponse::Empty(_) => None,
            SummaryResponse::Oneshot(r) => Some(&r.summary),
            SummaryResponse::Full(r) => Some(&r.response),
        }
    }

    pub fn total_inference_time(&self) -> u64 {
        match self {
            SummaryResponse::Empty(_) => 0,
            SummaryResponse::Oneshot(r) => r.total_inference_time,
            SummaryResponse::Full(r) => r.total_inference_time,
        }
    }
}
