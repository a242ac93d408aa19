use axum::body::Bytes;
use axum::extract::{Host, RawQuery, State};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::rpc;
use crate::smart_http;
use crate::state::AppState;
use crate::static_files;

/// Build the full `axum` application.
///
/// A single catch-all handler inspects the method and the trailing URL
/// segments itself rather than relying on `axum`'s route-pattern matching,
/// since the route table's patterns overlap in ways (an arbitrarily deep
/// repository path followed by one of several fixed suffixes) that can't be
/// expressed as disjoint `axum` routes.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/{*path}", any(dispatch))
        .route("/", any(dispatch))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    Host(host): Host,
    body: Bytes,
) -> Response {
    let raw_path = uri.path();
    let rel = state.strip_marker(raw_path).trim_matches('/').to_string();
    let mut segments: Vec<&str> = if rel.is_empty() {
        Vec::new()
    } else {
        rel.split('/').collect()
    };

    // `<path>/info/refs?...service=git-<cmd>`
    if segments.last() == Some(&"refs") && segments.len() >= 2 && segments[segments.len() - 2] == "info" {
        segments.truncate(segments.len() - 2);
        let repo_rel = segments.join("/");
        let service = query
            .as_deref()
            .and_then(|q| parse_query_param(q, "service"));
        return match smart_http::info_refs(&state, &repo_rel, service.as_deref()).await {
            Ok(resp) => resp,
            Err(err) => err.into_response(),
        };
    }

    // `<path>/git-<cmd>`
    if let Some(last) = segments.last().copied() {
        if last.starts_with("git-") && method == Method::POST {
            let cmd = last.trim_start_matches("git-").to_string();
            segments.truncate(segments.len() - 1);
            let repo_rel = segments.join("/");
            return match smart_http::service_rpc(&state, &repo_rel, &cmd, body).await {
                Ok(resp) => resp,
                Err(err) => err.into_response(),
            };
        }
    }

    // `/static/<path>`
    if segments.first() == Some(&"static") {
        let rel = segments[1..].join("/");
        return match static_files::serve(&state, &rel).await {
            Ok(resp) => resp,
            Err(err) => err.into_response(),
        };
    }

    // `<path>/file`
    if segments.last() == Some(&"file") && matches!(method, Method::GET | Method::HEAD) {
        segments.truncate(segments.len() - 1);
        let repo_rel = segments.join("/");
        return rpc::serve_file(&state, &repo_rel).await;
    }

    // `<path>`: GET/HEAD -> UI index, POST -> JSON/RPC.
    let repo_rel = segments.join("/");
    match method {
        Method::GET | Method::HEAD => ui_index(&repo_rel),
        Method::POST => rpc::handle(&state, &repo_rel, &host, &body).await,
        _ => (StatusCode::METHOD_NOT_ALLOWED, "method not allowed").into_response(),
    }
}

fn parse_query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == name {
            Some(v.to_string())
        } else {
            None
        }
    })
}

/// A minimal UI index page naming the repository at `repo_rel`. The richer static assets referenced here are served
/// from `/static/<path>`.
fn ui_index(repo_rel: &str) -> Response {
    let title = if repo_rel.is_empty() { "grit" } else { repo_rel };
    let html = format!(
        "<!DOCTYPE html>\n<html><head><title>{title}</title>\
         <link rel=\"stylesheet\" href=\"/static/grit.css\"></head>\
         <body><h1>{title}</h1><script src=\"/static/grit.js\"></script></body></html>",
        title = title
    );
    let mut resp = Response::new(axum::body::Body::from(html));
    resp.headers_mut()
        .insert("content-type", HeaderValue::from_static("text/html; charset=utf-8"));
    resp
}
