use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// `GET|HEAD <path>/info/refs?service=git-<cmd>`: advertise refs
/// for the requested service by invoking `git <cmd> --stateless-rpc
/// --advertise-refs` against the repository and framing the output with the
/// pkt-line service-announcement header the smart-HTTP protocol expects.
pub async fn info_refs(state: &AppState, repo_rel: &str, service: Option<&str>) -> Result<Response> {
    let service = service.ok_or_else(|| ServerError::bad_request("missing 'service' query parameter"))?;
    let cmd = service
        .strip_prefix("git-")
        .ok_or_else(|| ServerError::bad_request(format!("unsupported service '{}'", service)))?;
    let gitdir = repo_gitdir(state, repo_rel)?;

    tracing::info!(path = %repo_rel, service = %service, "smart-http info/refs");

    let output = Command::new("git")
        .arg(cmd)
        .arg("--stateless-rpc")
        .arg("--advertise-refs")
        .arg(&gitdir)
        .output()
        .await
        .map_err(|e| ServerError::bad_request(format!("failed to spawn git {}: {}", cmd, e)))?;
    if !output.status.success() {
        return Err(ServerError::bad_request(format!(
            "git {} --advertise-refs failed: {}",
            cmd,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let mut body = pkt_line(&format!("# service=git-{}\n", cmd));
    body.extend_from_slice(b"0000");
    body.extend_from_slice(&output.stdout);

    let content_type = format!("application/x-git-{}-advertisement", cmd);
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = StatusCode::OK;
    resp.headers_mut()
        .insert("content-type", HeaderValue::from_str(&content_type).unwrap());
    resp.headers_mut()
        .insert("cache-control", HeaderValue::from_static("no-cache"));
    Ok(resp)
}

/// `POST <path>/git-<cmd>`: run the request body through `git
/// <cmd> --stateless-rpc` and return its stdout verbatim.
pub async fn service_rpc(state: &AppState, repo_rel: &str, cmd: &str, body: bytes::Bytes) -> Result<Response> {
    if cmd != "upload-pack" && cmd != "receive-pack" {
        return Err(ServerError::bad_request(format!("unsupported git service '{}'", cmd)));
    }
    let gitdir = repo_gitdir(state, repo_rel)?;

    tracing::info!(path = %repo_rel, cmd = %cmd, "smart-http service rpc");

    let mut child = Command::new("git")
        .arg(cmd)
        .arg("--stateless-rpc")
        .arg(&gitdir)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| ServerError::bad_request(format!("failed to spawn git {}: {}", cmd, e)))?;

    child
        .stdin
        .take()
        .expect("stdin was piped")
        .write_all(&body)
        .await?;

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(ServerError::bad_request(format!(
            "git {} failed: {}",
            cmd,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let content_type = format!("application/x-git-{}-result", cmd);
    let mut resp = Response::new(Body::from(output.stdout));
    *resp.status_mut() = StatusCode::OK;
    resp.headers_mut()
        .insert("content-type", HeaderValue::from_str(&content_type).unwrap());
    Ok(resp)
}

fn repo_gitdir(state: &AppState, repo_rel: &str) -> Result<std::path::PathBuf> {
    let fs_path = state.resolve_repo_path(repo_rel)?;
    let repo = grit::Local::open(&fs_path)?;
    Ok(repo.gitdir().to_path_buf())
}

/// Frame a string as a single git pkt-line (4 hex-digit length prefix).
fn pkt_line(s: &str) -> Vec<u8> {
    let len = s.len() + 4;
    let mut out = format!("{:04x}", len).into_bytes();
    out.extend_from_slice(s.as_bytes());
    out
}
