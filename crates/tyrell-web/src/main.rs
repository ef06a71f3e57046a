//! `tyrell` summarization service.
//!
//! Serves `POST {api.path}` on the configured host and port, running every
//! request through OpenRouter inference one at a time.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... cargo run -p tyrell-web
//! OPENROUTER_KEY=sk-... cargo run -p tyrell-web -- --config tyrell.json --port 9000
//! ```
//!
//! Then:
//!
//! ```bash
//! curl -X POST http://127.0.0.1:8080/summarize \
//!   -H 'content-type: application/json' \
//!   -d '{"document": "...", "debug": false}'
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tyrell::prelude::*;
use tyrell_web::{AppState, WebConfig, spawn_web};

/// Hierarchical document summarization over HTTP.
#[derive(Parser)]
#[command(about = "Summarization service backed by OpenRouter")]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, default_value = "tyrell.json")]
    config: PathBuf,

    /// Override `api.host`.
    #[arg(long)]
    host: Option<String>,

    /// Override `api.port`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = TyrellConfig::load_or_default(&args.config)?;
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }

    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| "Set OPENROUTER_KEY env var to your OpenRouter API key")?;
    let client = OpenRouterClient::new(api_key)?;
    let inference = OpenRouterInference::new(client, config.api.llm.clone());
    info!("Using model {}", inference.config().model);

    let web_config = WebConfig::from_config(&config)?;
    let path = web_config.path.clone();
    let state = AppState::new(Arc::new(inference), Arc::new(PieceTokenizer::new()), config);

    let addr = spawn_web(state, web_config).await?;
    println!("Summarize endpoint: http://{addr}{path}");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {e}"))?;
    info!("Shutting down");
    Ok(())
}
