//! Static file serving handlers.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::super::assets;
use super::super::AppState;

/// Serve a merged artifact from the output directory.
pub async fn serve_download(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if name.contains("..") || name.starts_with('/') || name.contains('\\') {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }

    let Ok(output_dir) = state.output_dir.canonicalize() else {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };
    let canonical_file = match output_dir.join(&name).canonicalize() {
        Ok(p) if p.starts_with(&output_dir) && p.is_file() => p,
        _ => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };

    let content = match tokio::fs::read(&canonical_file).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", canonical_file.display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response();
        }
    };

    let mime = mime_guess::from_path(&canonical_file)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        name.replace(['"', '\r', '\n'], "")
    );

    (
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response()
}

/// Serve CSS.
pub async fn serve_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], assets::CSS)
}

/// Serve JavaScript.
pub async fn serve_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        assets::JS,
    )
}
