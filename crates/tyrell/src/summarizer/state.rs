//! Accumulated state of one summarization request.
//!
//! [`PipelineState`] is the single mutable record every stage updates in
//! place. It owns the working set of raw summaries the budget loop measures,
//! and the provenance that ends up in the response.

use serde::Serialize;

/// Separator used when assembling a level's summaries into one string.
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// One chunk summary. `id` is `"<level>.<chunk_no>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkSummaryRecord {
    pub id: String,
    /// Latency of the inference call in milliseconds.
    pub inference_time: u64,
    pub response: String,
}

impl ChunkSummaryRecord {
    pub fn new(level: usize, chunk_no: usize, inference_time: u64, response: String) -> Self {
        Self {
            id: summary_id(level, chunk_no),
            inference_time,
            response,
        }
    }
}

/// Build a summary id from a zero-based level and a 1-based chunk number.
pub fn summary_id(level: usize, chunk_no: usize) -> String {
    format!("{level}.{chunk_no}")
}

/// Join summaries in order with a blank line between them.
pub fn assemble(texts: &[String]) -> String {
    texts.join(SUMMARY_SEPARATOR)
}

/// The chunk summaries produced by one full pass over a set of chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub index: usize,
    pub records: Vec<ChunkSummaryRecord>,
}

impl Level {
    pub fn responses(&self) -> Vec<String> {
        self.records.iter().map(|r| r.response.clone()).collect()
    }

    pub fn inference_time(&self) -> u64 {
        self.records.iter().map(|r| r.inference_time).sum()
    }
}

/// Audit record of one compression pass. `source` and `result` are
/// positionally aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressionRecord {
    pub source: Vec<String>,
    pub result: Vec<String>,
    /// Summed latency of every compression call in the pass.
    pub inference_time: u64,
}

/// Which strategy produced a stage of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferenceMethod {
    InitialSummary,
    FullResummary,
    Compression,
    FinalSummary,
}

impl InferenceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceMethod::InitialSummary => "initial-summary",
            InferenceMethod::FullResummary => "full-resummary",
            InferenceMethod::Compression => "compression",
            InferenceMethod::FinalSummary => "final-summary",
        }
    }
}

/// Everything a multi-chunk request accumulates before the final summary.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub levels: Vec<Level>,
    /// One entry per level and per compression pass, in order.
    pub assembled_summaries: Vec<String>,
    pub compressions: Vec<CompressionRecord>,
    pub methods: Vec<InferenceMethod>,
    pub resummarized: bool,
    pub compressed: bool,
    /// Sum of every inference latency recorded so far, in milliseconds.
    pub total_inference_time: u64,
    /// Current working set fed to the next stage.
    pub raw_results: Vec<String>,
    /// Token length of `raw_results`, refreshed after every mutation.
    pub raw_results_len: usize,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next full resummary level will get.
    pub fn next_level(&self) -> usize {
        self.levels.len()
    }

    /// Record a completed level and make its responses the working set.
    pub fn push_level(&mut self, level: Level, method: InferenceMethod) {
        self.raw_results = level.responses();
        self.assembled_summaries.push(assemble(&self.raw_results));
        self.total_inference_time += level.inference_time();
        if method == InferenceMethod::FullResummary {
            self.resummarized = true;
        }
        self.methods.push(method);
        self.levels.push(level);
    }

    /// Record a compression pass and make its results the working set.
    pub fn push_compression(&mut self, record: CompressionRecord) {
        self.raw_results = record.result.clone();
        self.assembled_summaries.push(assemble(&record.result));
        self.total_inference_time += record.inference_time;
        self.compressed = true;
        self.methods.push(InferenceMethod::Compression);
        self.compressions.push(record);
    }

    /// Record the finishing call.
    pub fn push_final(&mut self, inference_time: u64) {
        self.total_inference_time += inference_time;
        self.methods.push(InferenceMethod::FinalSummary);
    }
}
