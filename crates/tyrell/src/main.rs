//! Summarize a text file with a running `tyrell-web` service, or in-process.
//!
//! Settings come from a JSON config file (default `tyrell.json`, optional).
//! In-process mode reads the API key from the `OPENROUTER_KEY` environment
//! variable.
//!
//! # Examples
//!
//! ```sh
//! # Send to the service configured under "client"
//! tyrell report.txt
//!
//! # Keep per-chunk results in the output
//! tyrell report.txt --debug
//!
//! # Run the pipeline locally against OpenRouter
//! OPENROUTER_KEY=sk-... tyrell report.txt --local
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tyrell::config::TyrellConfig;
use tyrell::prelude::*;

/// How long to wait for the service's port before giving up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Summarize a long document.
#[derive(Parser)]
#[command(name = "tyrell", version)]
struct Cli {
    /// Text file to summarize
    file: PathBuf,

    /// Path to the JSON config file
    #[arg(long, default_value = "tyrell.json")]
    config: PathBuf,

    /// Include per-chunk results in the output
    #[arg(long)]
    debug: bool,

    /// Run the pipeline in this process instead of calling the service
    #[arg(long)]
    local: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_document(path: &Path) -> Result<String, String> {
    if path.as_os_str().is_empty() {
        return Err("No file specified.".to_string());
    }
    if !path.is_file() {
        return Err(format!("File not found: {}", path.display()));
    }
    std::fs::read_to_string(path).map_err(|e| format!("failed to read '{}': {e}", path.display()))
}

/// POST the document to the configured service.
async fn summarize_remote(
    config: &TyrellConfig,
    document: String,
    debug: bool,
) -> Result<serde_json::Value, String> {
    let target = (config.api.host.as_str(), config.api.port);
    match tokio::time::timeout(CONNECT_TIMEOUT, tokio::net::TcpStream::connect(target)).await {
        Ok(Ok(_)) => {}
        _ => {
            return Err(format!(
                "Server is not running at {}:{}",
                config.api.host, config.api.port
            ));
        }
    }

    let client = reqwest::Client::builder()
        .user_agent(&config.client.user_agent)
        .timeout(Duration::from_secs(config.client.timeout_secs))
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))?;

    info!("Sending {} chars to {}", document.len(), config.client.uri);
    let resp = client
        .post(&config.client.uri)
        .header("x-pub-key", &config.client.pub_key)
        .header("x-api-key", &config.client.priv_key)
        .json(&serde_json::json!({
            "client": config.client.user_agent,
            "document": document,
            "debug": debug,
        }))
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| format!("failed to read response: {e}"))?;
    if !status.is_success() {
        return Err(format!("Server returned HTTP {status}: {text}"));
    }
    serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))
}

/// Run the whole pipeline in this process.
async fn summarize_local(
    config: &TyrellConfig,
    document: &str,
    debug: bool,
) -> Result<serde_json::Value, String> {
    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| "Set OPENROUTER_KEY env var to your OpenRouter API key")?;
    let client = OpenRouterClient::new(api_key)?;
    let inference = OpenRouterInference::new(client, config.api.llm.clone());
    let tokenizer = PieceTokenizer::new();
    let summarizer = Summarizer::new(&inference, &tokenizer, config.summarizer_config());

    let lock = ModelLock::new();
    let permit = lock.acquire().await;
    let response = summarizer
        .summarize(&permit, document)
        .await
        .map_err(|e| e.to_string())?;
    if let Some(error) = response.error() {
        return Err(error.to_string());
    }

    let mut json = serde_json::to_value(&response).map_err(|e| e.to_string())?;
    if !debug && let Some(obj) = json.as_object_mut() {
        obj.remove("results");
    }
    Ok(json)
}

async fn run(cli: &Cli) -> Result<serde_json::Value, String> {
    let document = read_document(&cli.file)?;
    let config = TyrellConfig::load_or_default(&cli.config)?;
    if cli.local {
        summarize_local(&config, &document, cli.debug).await
    } else {
        summarize_remote(&config, document, cli.debug).await
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(json) => match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                warn!("failed to format response: {e}");
                process::exit(1);
            }
        },
        Err(e) => {
            warn!("{e}");
            process::exit(1);
        }
    }
}
