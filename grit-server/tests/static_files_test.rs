mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn serves_existing_static_asset() {
    let tmp = tempfile::tempdir().unwrap();
    let static_dir = tmp.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("grit.css"), "body { color: red; }").unwrap();

    let state = common::build_state(&tmp.path().join("repos"), &static_dir);
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(Request::builder().uri("/static/grit.css").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/css"));
    assert_eq!(common::body_bytes(resp).await, b"body { color: red; }");
}

#[tokio::test]
async fn missing_static_asset_is_404() {
    let tmp = tempfile::tempdir().unwrap();
    let static_dir = tmp.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();

    let state = common::build_state(&tmp.path().join("repos"), &static_dir);
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(Request::builder().uri("/static/nope.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn path_traversal_outside_static_root_is_forbidden() {
    let tmp = tempfile::tempdir().unwrap();
    let static_dir = tmp.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    // A secret file living next to (not inside) the static root.
    std::fs::write(tmp.path().join("secret.txt"), "shh").unwrap();

    let state = common::build_state(&tmp.path().join("repos"), &static_dir);
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/static/../secret.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    // axum normalizes `..` in the URI path itself before our handler ever
    // sees it, so this either 404s (no such route) or is rejected as
    // forbidden by the path-safety check -- never served.
    assert_ne!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn path_traversal_outside_repo_root_is_forbidden() {
    let tmp = tempfile::tempdir().unwrap();
    let repo_root = tmp.path().join("repos");
    std::fs::create_dir_all(&repo_root).unwrap();
    common::init_repo(&repo_root.join("visible"));

    let state = common::build_state(&repo_root, &tmp.path().join("static"));

    // Exercise the path-safety helper directly: a relative path escaping
    // the configured root via `..` must be rejected.
    let result = state.resolve_repo_path("../outside");
    assert!(result.is_err());
}
