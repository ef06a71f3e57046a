//! On-disk archive of served responses.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;

/// File name for a response archived now: `response_<UTC timestamp>.json`.
pub fn response_file_name() -> String {
    format!("response_{}.json", Utc::now().format("%Y%m%dT%H%M%S%.6fZ"))
}

/// Pretty-print `response` into a new file under `dir`, creating `dir` if
/// needed. Returns the written path.
pub async fn write_response(dir: &Path, response: &Value) -> Result<PathBuf, String> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| format!("failed to create '{}': {e}", dir.display()))?;
    let path = dir.join(response_file_name());
    let body = serde_json::to_string_pretty(response)
        .map_err(|e| format!("failed to serialize response: {e}"))?;
    tokio::fs::write(&path, body)
        .await
        .map_err(|e| format!("failed to write '{}': {e}", path.display()))?;
    Ok(path)
}
