//! Service and client configuration.
//!
//! [`TyrellConfig`] is read from a JSON file. Every field has a default, so a
//! partial file (or no file at all, via [`TyrellConfig::load_or_default`]) is
//! valid. The summarization core never reads this directly; it receives a
//! [`SummarizerConfig`] built by [`TyrellConfig::summarizer_config`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::DEFAULT_MODEL;
use crate::summarizer::SummarizerConfig;

/// Default HTTP client timeout. Long documents take many sequential calls.
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 1800;

/// Subdirectory of `data_dir` that receives archived responses.
pub const RESPONSE_ARCHIVE_DIR: &str = "tyrell_responses";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TyrellConfig {
    pub api: ApiConfig,
    pub client: ClientConfig,
}

/// Settings for the HTTP service and the summarization budgets it applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind host. Default: `127.0.0.1`.
    pub host: String,
    /// Bind port. Default: `8080`.
    pub port: u16,
    /// Route that accepts summarization requests. Default: `/summarize`.
    pub path: String,
    /// Directory for archived responses. Default: `.tyrell`.
    pub data_dir: PathBuf,
    /// Write every response to `<data_dir>/tyrell_responses/`. Default: `true`.
    pub archive_responses: bool,
    /// Token budget for the finishing pass's input. Default: `2048`.
    pub max_final_summary_context_tokens: usize,
    /// Safety bound on budget-enforcement passes. Default: `8`.
    pub max_budget_passes: u32,
    pub chunker: ChunkerConfig,
    pub llm: LlmConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            path: "/summarize".to_string(),
            data_dir: PathBuf::from(".tyrell"),
            archive_responses: true,
            max_final_summary_context_tokens: 2048,
            max_budget_passes: 8,
            chunker: ChunkerConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum tokens per chunk. Default: `2048`.
    pub max_chunk_token_length: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_token_length: 2048,
        }
    }
}

/// Model and sampling parameters for [`OpenRouterInference`](crate::llm::OpenRouterInference).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Maximum tokens per response. Default: `1024`.
    pub max_response_tokens: u32,
    /// Sampling temperature. Default: `0.2`.
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_response_tokens: 1024,
            temperature: 0.2,
            top_p: None,
            top_k: None,
            min_p: None,
            repetition_penalty: None,
        }
    }
}

/// Settings for the `tyrell` command-line client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Summarization endpoint. Default: `http://127.0.0.1:8080/summarize`.
    pub uri: String,
    /// Request timeout in seconds. Default: [`DEFAULT_CLIENT_TIMEOUT_SECS`].
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Sent as `x-pub-key`.
    pub pub_key: String,
    /// Sent as `x-api-key`.
    pub priv_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: "http://127.0.0.1:8080/summarize".to_string(),
            timeout_secs: DEFAULT_CLIENT_TIMEOUT_SECS,
            user_agent: format!("tyrell-client/{}", env!("CARGO_PKG_VERSION")),
            pub_key: String::new(),
            priv_key: String::new(),
        }
    }
}

impl TyrellConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config '{}': {e}", path.display()))?;
        let config: TyrellConfig = serde_json::from_str(&data)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display()))?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, String> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        self.summarizer_config()
            .validate()
            .map_err(|e| e.to_string())?;
        if !self.api.path.starts_with('/') {
            return Err(format!("api.path must start with '/': {}", self.api.path));
        }
        Ok(())
    }

    /// Budget parameters for the summarization core.
    pub fn summarizer_config(&self) -> SummarizerConfig {
        SummarizerConfig {
            max_chunk_token_length: self.api.chunker.max_chunk_token_length,
            max_final_summary_context_tokens: self.api.max_final_summary_context_tokens,
            max_budget_passes: self.api.max_budget_passes,
        }
    }

    /// Directory that receives archived responses.
    pub fn response_archive_dir(&self) -> PathBuf {
        self.api.data_dir.join(RESPONSE_ARCHIVE_DIR)
    }
}
