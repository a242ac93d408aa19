use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// `GET|HEAD /static/<path>`: serve a file from the configured
/// static-asset directory, enforcing the same path-safety rule as
/// repository lookups.
pub async fn serve(state: &AppState, rel: &str) -> Result<Response> {
    let fs_path = state.resolve_static_path(rel)?;
    if !fs_path.is_file() {
        return Err(ServerError::not_found(format!("no such static asset: {}", rel)));
    }
    let bytes = tokio::fs::read(&fs_path).await?;
    let content_type = guess_content_type(&fs_path);

    let mut resp = Response::new(Body::from(bytes));
    *resp.status_mut() = StatusCode::OK;
    resp.headers_mut()
        .insert("content-type", HeaderValue::from_static(content_type));
    Ok(resp)
}

fn guess_content_type(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
