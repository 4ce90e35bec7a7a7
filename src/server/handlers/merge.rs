//! Merge submission handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use super::super::AppState;
use crate::services::merge::MergeError;
use crate::utils::DEFAULT_OUTPUT_NAME;

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    /// Downloadable URLs in the order they should appear.
    #[serde(default)]
    pub files: Vec<String>,
    /// Requested output base name.
    #[serde(default)]
    pub out: Option<String>,
}

/// Run the fetch-and-merge pipeline for the selected files.
pub async fn merge_files(
    State(state): State<AppState>,
    Json(request): Json<MergeRequest>,
) -> impl IntoResponse {
    let out = request
        .out
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_OUTPUT_NAME);

    match state.pipeline.run(&request.files, out).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "ok": 1,
                "download": format!("/download/{}", urlencoding::encode(&outcome.file_name)),
                "skipped": outcome.skipped,
            })),
        ),
        Err(e @ (MergeError::TooFewUrls(_) | MergeError::InsufficientInputs { .. })) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": e.to_string(),
                "skipped": e.skipped(),
            })),
        ),
        Err(e) => {
            tracing::error!("Merge failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "skipped": e.skipped(),
                })),
            )
        }
    }
}
