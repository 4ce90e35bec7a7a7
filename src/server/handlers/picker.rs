//! Record listing handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};

use super::super::templates;
use super::super::AppState;
use crate::models::Record;

/// All stored records, sorted by case-insensitive title.
fn sorted_records(state: &AppState) -> Result<Vec<Record>, String> {
    let mut records = state.store.load().map_err(|e| e.to_string())?;
    records.sort_by_cached_key(|r| r.title.to_lowercase());
    Ok(records)
}

/// Picker page listing every harvested record.
pub async fn picker_page(State(state): State<AppState>) -> Response {
    match sorted_records(&state) {
        Ok(records) => Html(templates::picker_page(&records)).into_response(),
        Err(e) => {
            tracing::error!("Failed to load records: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(templates::base_template(
                    "Error",
                    &format!("<p>Failed to load records: {}</p>", crate::utils::html_escape(&e)),
                )),
            )
                .into_response()
        }
    }
}

/// Records as JSON.
pub async fn api_records(State(state): State<AppState>) -> Response {
    match sorted_records(&state) {
        Ok(records) => Json(records).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e })),
        )
            .into_response(),
    }
}
