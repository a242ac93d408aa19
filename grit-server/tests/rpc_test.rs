mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

fn form_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn read_action_returns_repo_metadata() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = common::init_repo(&tmp.path().join("repo"));
    repo.set_description("hello").unwrap();

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app.oneshot(form_request("POST", "/repo", "action=read")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = common::body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["failure"], false);
    assert_eq!(json["data"]["description"], "hello");
    assert_eq!(json["data"]["url"], "/repo");
}

#[tokio::test]
async fn read_defaults_when_action_is_omitted() {
    let tmp = tempfile::tempdir().unwrap();
    common::init_repo(&tmp.path().join("repo"));

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    // omitted action defaults to "read".
    let resp = app.oneshot(form_request("POST", "/repo", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = common::body_json(resp).await;
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn items_action_lists_added_files() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = common::init_repo(&tmp.path().join("repo"));
    let item = grit::Item::from_string(&repo, "a.bin", b"hi".to_vec()).unwrap();
    repo.add_item(item, Some("add a")).unwrap();

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app.oneshot(form_request("POST", "/repo", "action=items")).await.unwrap();
    let json = common::body_json(resp).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["path"], "a.bin");
    assert_eq!(data[0]["url"], "/repo/a.bin");
}

#[tokio::test]
async fn data_action_returns_raw_bytes_not_json() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = common::init_repo(&tmp.path().join("repo"));
    let item = grit::Item::from_string(&repo, "a.bin", b"payload".to_vec()).unwrap();
    repo.add_item(item, Some("add a")).unwrap();

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(form_request("POST", "/repo/a.bin", "action=data"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(common::body_bytes(resp).await, b"payload");
}

#[tokio::test]
async fn file_endpoint_serves_same_bytes_as_data_action() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = common::init_repo(&tmp.path().join("repo"));
    let item = grit::Item::from_string(&repo, "a.bin", b"payload".to_vec()).unwrap();
    repo.add_item(item, Some("add a")).unwrap();

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(Request::builder().method("GET").uri("/repo/a.bin/file").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(common::body_bytes(resp).await, b"payload");
}

#[tokio::test]
async fn add_version_action_grows_history() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = common::init_repo(&tmp.path().join("repo"));
    assert_eq!(repo.versions().unwrap().len(), 1);

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(form_request("POST", "/repo", "action=addVersion&message=m"))
        .await
        .unwrap();
    let json = common::body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(repo.versions().unwrap().len(), 2);
}

#[tokio::test]
async fn upload_action_adds_item() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = common::init_repo(&tmp.path().join("repo"));

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(form_request(
            "POST",
            "/repo",
            "action=upload&filename=u.bin&filedata=hello",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let items = repo.items(Some("u.bin"), None).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].data().unwrap(), b"hello");
}

#[tokio::test]
async fn unknown_action_fails_with_400_envelope() {
    let tmp = tempfile::tempdir().unwrap();
    common::init_repo(&tmp.path().join("repo"));

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(form_request("POST", "/repo", "action=bogus"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["failure"], true);
    assert!(json["data"]["msg"].is_string());
}

#[tokio::test]
async fn unsupported_stub_actions_fail_cleanly_instead_of_panicking() {
    let tmp = tempfile::tempdir().unwrap();
    common::init_repo(&tmp.path().join("repo"));

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(form_request("POST", "/repo", "action=addSubmodule"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(resp).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn get_on_repo_path_returns_ui_index_html() {
    let tmp = tempfile::tempdir().unwrap();
    common::init_repo(&tmp.path().join("repo"));

    let state = common::build_state(tmp.path(), &tmp.path().join("static"));
    let app = grit_server::router::build(state);

    let resp = app
        .oneshot(Request::builder().method("GET").uri("/repo").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let body = String::from_utf8(common::body_bytes(resp).await).unwrap();
    assert!(body.contains("repo"));
}
