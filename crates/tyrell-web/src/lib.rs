//! HTTP summarization service for `tyrell`.
//!
//! `tyrell-web` wraps [`Summarizer`](tyrell::summarizer::Summarizer) in an
//! axum server. Requests are serialized through one shared
//! [`ModelLock`](tyrell::summarizer::ModelLock): a request waits for the
//! model, runs the whole pipeline while holding it, and releases it before
//! the response is post-processed and archived.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tyrell::prelude::*;
//! use tyrell_web::{AppState, WebConfig, spawn_web};
//!
//! let config = TyrellConfig::default();
//! let inference = OpenRouterInference::new(client, config.api.llm.clone());
//! let state = AppState::new(Arc::new(inference), Arc::new(PieceTokenizer::new()), config.clone());
//!
//! let addr = spawn_web(state, WebConfig::from_config(&config)?).await?;
//! println!("Listening on http://{addr}/summarize");
//! ```
//!
//! # Endpoints
//!
//! | Route | Behavior |
//! |-------|----------|
//! | `GET /` | `Endpoint Disabled.` |
//! | `POST {api.path}` | `{document, debug?, client?}` → summary JSON (200, 400 for an empty document, 500 on failure) |

mod api;
pub mod archive;
mod server;

pub use api::{AppState, SummarizeRequest};
pub use server::build_router;

use std::net::SocketAddr;

use tyrell::config::TyrellConfig;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:8080`.
    pub bind_addr: SocketAddr,
    /// Route for summarization requests. Default: `/summarize`.
    pub path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            path: "/summarize".to_string(),
        }
    }
}

impl WebConfig {
    /// Take the bind address and route from the `api` section.
    pub fn from_config(config: &TyrellConfig) -> Result<Self, String> {
        let bind_addr = format!("{}:{}", config.api.host, config.api.port)
            .parse()
            .map_err(|e| {
                format!(
                    "invalid bind address '{}:{}': {e}",
                    config.api.host, config.api.port
                )
            })?;
        Ok(Self {
            bind_addr,
            path: config.api.path.clone(),
        })
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(state: AppState, config: WebConfig) -> Result<SocketAddr, String> {
    let router = server::build_router(state, &config.path);
    server::start_server(router, config.bind_addr).await
}
