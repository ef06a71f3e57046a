//! Endpoint handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};
use tyrell::config::TyrellConfig;
use tyrell::llm::Inference;
use tyrell::summarizer::{ModelLock, ResponseKind, Summarizer};
use tyrell::tokenizer::Tokenizer;

use crate::archive;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub inference: Arc<dyn Inference>,
    pub tokenizer: Arc<dyn Tokenizer>,
    /// Held for the whole pipeline run of one request.
    pub lock: Arc<ModelLock>,
    pub config: Arc<TyrellConfig>,
}

impl AppState {
    pub fn new(
        inference: Arc<dyn Inference>,
        tokenizer: Arc<dyn Tokenizer>,
        config: TyrellConfig,
    ) -> Self {
        Self {
            inference,
            tokenizer,
            lock: Arc::new(ModelLock::new()),
            config: Arc::new(config),
        }
    }
}

/// Request body for `POST {api.path}`.
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub document: String,
    /// Keep per-chunk `results` in the response.
    #[serde(default)]
    pub debug: bool,
    /// Free-form caller identification, logged only.
    #[serde(default)]
    pub client: Option<String>,
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// GET /: the root is not a usable endpoint.
pub async fn get_root() -> &'static str {
    "Endpoint Disabled."
}

/// POST {api.path}: summarize a document.
///
/// Returns 200 with the summary, 400 with `{error}` for an empty document,
/// and 500 with `{error}` when inference or tokenization fails.
pub async fn post_summarize(
    State(app): State<AppState>,
    Json(body): Json<SummarizeRequest>,
) -> (StatusCode, Json<Value>) {
    let request_start = Instant::now();
    info!(
        "Summarize request from {}: {} chars",
        body.client.as_deref().unwrap_or("unknown"),
        body.document.len()
    );

    let result = {
        let wait_start = Instant::now();
        let permit = match app.lock.try_acquire() {
            Some(permit) => permit,
            None => {
                info!("Model busy; request queued");
                app.lock.acquire().await
            }
        };
        let model_lock_wait_time = elapsed_ms(wait_start);
        info!("Model lock acquired after {model_lock_wait_time}ms");

        let summarizer = Summarizer::new(
            app.inference.as_ref(),
            app.tokenizer.as_ref(),
            app.config.summarizer_config(),
        );
        summarizer
            .summarize(&permit, &body.document)
            .await
            .map(|response| (response, model_lock_wait_time))
    };

    let (response, model_lock_wait_time) = match result {
        Ok(ok) => ok,
        Err(e) => {
            error!("Error summarizing document: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            );
        }
    };

    let status = if response.kind() == ResponseKind::Empty {
        error!("Empty document.");
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    let mut json = match serde_json::to_value(&response) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to serialize response: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            );
        }
    };

    if let Some(obj) = json.as_object_mut() {
        obj.insert("llm".into(), json!({"config": app.config.api.llm}));
        obj.insert("model_lock_wait_time".into(), json!(model_lock_wait_time));
        obj.insert("total_request_time".into(), json!(elapsed_ms(request_start)));
        obj.insert("generated_at".into(), json!(chrono::Utc::now().to_rfc3339()));
        obj.insert("agent".into(), json!("tyrell"));
        obj.insert("version".into(), json!(env!("CARGO_PKG_VERSION")));
        if !body.debug {
            obj.remove("results");
        }
    }

    if app.config.api.archive_responses {
        match archive::write_response(&app.config.response_archive_dir(), &json).await {
            Ok(path) => info!("Response archived to {}", path.display()),
            Err(e) => warn!("Failed to archive response: {e}"),
        }
    }

    (status, Json(json))
}
