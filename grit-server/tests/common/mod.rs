use std::path::Path;

use axum::body::Body;
use axum::response::Response;
use grit::types::OpenOptions;
use grit::Local;
use grit_server::{AppState, Config};
use http_body_util::BodyExt;

/// Build an `AppState` rooted at `repo_root`, serving static assets from
/// `static_dir`, with no URI marker — the common case exercised by most
/// router tests.
pub fn build_state(repo_root: &Path, static_dir: &Path) -> AppState {
    let config = Config {
        port: 0,
        log_level: "error".to_string(),
        static_dir: static_dir.to_path_buf(),
        repo_root: repo_root.to_path_buf(),
        uri_marker: None,
    };
    AppState::new(config)
}

/// Initialize a bare Local repository at `path` (the repo's one
/// initialization commit already present, per `Local::init`).
pub fn init_repo(path: &Path) -> Local {
    Local::init(path, &OpenOptions::default()).unwrap()
}

/// Drain a response body into a `serde_json::Value`, asserting it parses.
pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("response body not JSON: {} ({:?})", e, bytes))
}

/// Drain a response body into raw bytes.
pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Spawn the full router on a real, bound TCP socket in a background thread
/// with its own Tokio runtime, returning its address once it's accepting
/// connections.
///
/// Needed for tests that drive a [`grit::Proxy`] against the server: `Proxy`
/// uses `reqwest::blocking`, which cannot run from inside the caller's own
/// `#[tokio::test]` runtime (`tower::ServiceExt::oneshot` has no real socket
/// for it to connect to), so the server has to live on an independent
/// runtime on another thread while the test drives it synchronously.
pub fn spawn_server(repo_root: std::path::PathBuf, static_dir: std::path::PathBuf) -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = std_listener.local_addr().expect("local_addr");

    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("build test server runtime");
        rt.block_on(async move {
            std_listener.set_nonblocking(true).expect("set_nonblocking");
            let listener = tokio::net::TcpListener::from_std(std_listener).expect("adopt std listener");
            let state = build_state(&repo_root, &static_dir);
            let app = grit_server::router::build(state);
            axum::serve(listener, app).await.expect("test server");
        });
    });

    for _ in 0..200 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return addr;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    panic!("test server never started listening on {}", addr);
}
