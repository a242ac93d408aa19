use std::collections::{HashMap, HashSet};

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grit::types::ParamValue;
use grit::{Item, Local};
use serde_json::{json, Value};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// `POST <path>`: decode the form body, resolve the repository
/// (and, if the sub-path is non-empty, a single Item within it), dispatch
/// `action` against the fixed table, and wrap the result in the
/// `{success, failure, data, msg?}` envelope.
///
/// `host` is the request's `Host` header, used to build the absolute URLs
/// injected into list/branch/parent responses (§4.6: a `Proxy` POSTs
/// straight to a response element's `url`, so it can't be site-relative).
pub async fn handle(state: &AppState, rel: &str, host: &str, body: &bytes::Bytes) -> Response {
    match dispatch(state, rel, host, body).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

/// `GET|HEAD <path>/file`: the item's raw bytes, resolved the same
/// way as the `data` JSON/RPC action.
pub async fn serve_file(state: &AppState, rel: &str) -> Response {
    match resolve_target(state, rel).and_then(|(repo, sub)| data_response(&repo, sub.as_deref())) {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn dispatch(state: &AppState, rel: &str, host: &str, body: &bytes::Bytes) -> Result<Response> {
    let params = decode_form(body)?;

    let action = params
        .get("action")
        .and_then(ParamValue::as_str)
        .unwrap_or("read")
        .to_string();

    tracing::info!(action = %action, path = %rel, "json/rpc dispatch");

    let (repo, sub_path) = resolve_target(state, rel)?;

    if action == "data" {
        return data_response(&repo, sub_path.as_deref());
    }

    // Absolute, not site-relative: a `Proxy` (src/proxy.rs) reconnects to
    // this exact string with a plain HTTP POST, so it must carry its own
    // scheme and host. This server is never TLS-terminated itself.
    let base_url = format!("http://{}/{}", host, rel.trim_matches('/'));
    let target = RpcTarget { repo, sub_path };

    let data = match action.as_str() {
        "read" => handle_read(&target, &base_url)?,
        "new" | "branch" => handle_branch(&target, &params, &base_url)?,
        "repos" => handle_repos(&target, &base_url)?,
        "items" => handle_items(&target, &params, &base_url)?,
        "versions" => handle_versions(&target)?,
        "parent" => handle_parent(&target, &base_url)?,
        "addVersion" => handle_add_version(&target, &params)?,
        "upload" => handle_upload(&target, &params)?,
        "submodules" | "addSubmodule" | "addItem" => {
            return Err(ServerError::not_supported(format!("action '{}' is not supported", action)));
        }
        other => return Err(ServerError::bad_request(format!("unknown action '{}'", other))),
    };

    Ok(Json(json!({ "success": true, "failure": false, "data": data })).into_response())
}

/// A resolved JSON/RPC target: the enclosing repository plus an optional
/// normalized sub-path naming a single Item within it.
struct RpcTarget {
    repo: Local,
    sub_path: Option<String>,
}

impl RpcTarget {
    fn item(&self) -> Result<Item> {
        let sub = self
            .sub_path
            .as_deref()
            .ok_or_else(|| ServerError::bad_request("action requires an item sub-path"))?;
        self.repo
            .items(Some(&regex::escape(sub)), None)?
            .into_iter()
            .next()
            .ok_or_else(|| ServerError::not_found(format!("no item at path {}", sub)))
    }
}

/// Find the repository enclosing `rel` by walking up from the resolved
/// filesystem path, then split off whatever sub-path remains.
fn resolve_target(state: &AppState, rel: &str) -> Result<(Local, Option<String>)> {
    let fs_path = state.resolve_repo_path(rel)?;
    let probe = if fs_path.exists() { fs_path.clone() } else { fs_path.parent().map(|p| p.to_path_buf()).unwrap_or(fs_path.clone()) };
    let repo = Local::open(&probe)?;

    let sub_path = fs_path
        .strip_prefix(repo.path())
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .filter(|s| !s.is_empty());

    Ok((repo, sub_path))
}

fn join_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// The shape a single named parameter must take.
#[derive(Clone, Copy)]
enum ParamKind {
    Str,
    Int,
    Bytes,
}

/// One parameter an action declares: its name, its kind, and whether
/// omitting it is an error.
struct ParamSpec {
    name: &'static str,
    kind: ParamKind,
    required: bool,
}

const fn opt(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec { name, kind, required: false }
}
const fn req(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec { name, kind, required: true }
}

/// The typed parameter schema per RPC action (§4.8/§9: a small per-action
/// schema replacing the source's literal-eval of every field). An action
/// with no entry here takes no parameters beyond `action` itself.
fn schema_for(action: &str) -> &'static [ParamSpec] {
    match action {
        "new" | "branch" => &[req("name", ParamKind::Str), opt("desc", ParamKind::Str)],
        "items" => &[opt("path", ParamKind::Str), opt("version", ParamKind::Int)],
        "addVersion" => &[opt("message", ParamKind::Str)],
        "upload" => &[req("filename", ParamKind::Str), req("filedata", ParamKind::Bytes)],
        _ => &[],
    }
}

/// Decode one raw field against its declared kind, failing the request if
/// it doesn't fit rather than silently falling back to a string.
fn decode_typed(name: &str, kind: ParamKind, raw: &[u8]) -> Result<ParamValue> {
    match kind {
        ParamKind::Bytes => Ok(ParamValue::Bytes(raw.to_vec())),
        ParamKind::Str => String::from_utf8(raw.to_vec())
            .map(ParamValue::Str)
            .map_err(|_| ServerError::bad_request(format!("'{}' must be valid UTF-8", name))),
        ParamKind::Int => std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(ParamValue::Int)
            .ok_or_else(|| ServerError::bad_request(format!("'{}' must be an integer", name))),
    }
}

/// Percent-decode one `x-www-form-urlencoded` field into raw bytes (`+`
/// becomes a space, `%XX` becomes the literal byte) without assuming UTF-8,
/// so `upload`'s `filedata` can carry arbitrary binary content — something
/// `serde_urlencoded`'s `String`-typed decoding cannot do.
fn percent_decode_field(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < raw.len() => {
                let byte = std::str::from_utf8(&raw[i + 1..i + 3]).ok().and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match byte {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                    }
                    None => {
                        out.push(raw[i]);
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

/// Split a form body into raw `(name, value)` byte pairs, each still
/// percent-decoded from its wire form.
fn parse_form_fields(body: &[u8]) -> Vec<(String, Vec<u8>)> {
    body.split(|&b| b == b'&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, |&b| b == b'=');
            let key = parts.next().unwrap_or(b"");
            let value = parts.next().unwrap_or(b"");
            (
                String::from_utf8_lossy(&percent_decode_field(key)).into_owned(),
                percent_decode_field(value),
            )
        })
        .collect()
}

/// Decode the form body against `action`'s declared schema: `action` itself
/// is always a string and defaults to `"read"`; `xaction` is reserved and
/// stripped per §4.8; every other field must appear in the action's schema
/// and decode as its declared kind, or the request is rejected.
fn decode_form(body: &bytes::Bytes) -> Result<HashMap<String, ParamValue>> {
    let mut raw: HashMap<String, Vec<u8>> = HashMap::new();
    for (key, value) in parse_form_fields(body) {
        if key == "xaction" {
            continue;
        }
        raw.insert(key, value);
    }

    let action = match raw.get("action") {
        Some(bytes) => String::from_utf8(bytes.clone())
            .map_err(|_| ServerError::bad_request("'action' must be valid UTF-8"))?,
        None => "read".to_string(),
    };

    let schema = schema_for(&action);
    let mut decoded = HashMap::new();
    decoded.insert("action".to_string(), ParamValue::Str(action.clone()));

    for spec in schema {
        match raw.get(spec.name) {
            Some(value) => {
                decoded.insert(spec.name.to_string(), decode_typed(spec.name, spec.kind, value)?);
            }
            None if spec.required => {
                return Err(ServerError::bad_request(format!(
                    "'{}' is required for action '{}'",
                    spec.name, action
                )));
            }
            None => {}
        }
    }

    let known: HashSet<&str> = schema.iter().map(|s| s.name).chain(std::iter::once("action")).collect();
    if let Some(unknown) = raw.keys().find(|k| k.as_str() != "action" && !known.contains(k.as_str())) {
        return Err(ServerError::bad_request(format!(
            "unknown parameter '{}' for action '{}'",
            unknown, action
        )));
    }

    Ok(decoded)
}

fn data_response(repo: &Local, sub_path: Option<&str>) -> Result<Response> {
    let sub_path = sub_path.ok_or_else(|| ServerError::bad_request("action=data requires an item path"))?;
    let item = repo
        .items(Some(&regex::escape(sub_path)), None)?
        .into_iter()
        .next()
        .ok_or_else(|| ServerError::not_found(format!("no item at path {}", sub_path)))?;
    let bytes = item.data()?;
    let mut resp = bytes.into_response();
    resp.headers_mut()
        .insert("content-type", HeaderValue::from_static("application/octet-stream"));
    Ok(resp)
}

fn handle_read(target: &RpcTarget, base_url: &str) -> Result<Value> {
    match &target.sub_path {
        Some(_) => {
            let item = target.item()?;
            // `base_url` is already this exact request's own URL (the repo
            // base plus the sub-path that resolved to this item) -- unlike
            // the list actions below, a scalar `read` of one item must not
            // join another path segment onto it.
            Ok(json!({
                "path": item.path(),
                "name": item.name(),
                "type": item.item_type().as_str(),
                "size": item.size()?,
                "url": base_url,
            }))
        }
        None => Ok(json!({
            "name": target.repo.name(),
            "description": target.repo.get_description().unwrap_or_default(),
            "url": base_url,
        })),
    }
}

fn handle_branch(target: &RpcTarget, params: &HashMap<String, ParamValue>, base_url: &str) -> Result<Value> {
    let name = params
        .get("name")
        .and_then(ParamValue::as_str)
        .ok_or_else(|| ServerError::bad_request("'name' is required"))?;
    let desc = params.get("desc").and_then(ParamValue::as_str);
    let child = target.repo.branch(name, desc)?;
    Ok(json!({ "name": child.name(), "url": join_url(base_url, name) }))
}

fn handle_repos(target: &RpcTarget, base_url: &str) -> Result<Value> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(target.repo.path())? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if Local::open(entry.path()).is_ok() {
            out.push(json!({ "name": name, "url": join_url(base_url, &name) }));
        }
    }
    Ok(Value::Array(out))
}

fn handle_items(target: &RpcTarget, params: &HashMap<String, ParamValue>, base_url: &str) -> Result<Value> {
    let path_regex = params.get("path").and_then(ParamValue::as_str);
    let version = params.get("version").and_then(ParamValue::as_i64).map(|i| i as usize);
    let items = target.repo.items(path_regex, version)?;
    let out: Vec<Value> = items
        .iter()
        .map(|item| {
            let mut info = serde_json::to_value(item.to_info()).unwrap_or(Value::Null);
            if let Value::Object(ref mut map) = info {
                map.insert("url".to_string(), Value::String(join_url(base_url, item.path())));
            }
            info
        })
        .collect();
    Ok(Value::Array(out))
}

fn handle_versions(target: &RpcTarget) -> Result<Value> {
    let versions = target.repo.versions()?;
    let out: Vec<Value> = versions
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.info().map(|info| (i, info)))
        .map(|(i, info)| {
            let mut value = serde_json::to_value(info).unwrap_or(Value::Null);
            if let Value::Object(ref mut map) = value {
                map.insert("index".to_string(), json!(i));
            }
            value
        })
        .collect();
    Ok(Value::Array(out))
}

fn handle_parent(target: &RpcTarget, base_url: &str) -> Result<Value> {
    match target.repo.parent() {
        Some(parent) => {
            let parent_url = base_url
                .rsplit_once('/')
                .map(|(prefix, _)| prefix.to_string())
                .unwrap_or_default();
            Ok(json!({ "name": parent.name(), "url": parent_url }))
        }
        None => Ok(Value::Null),
    }
}

fn handle_add_version(target: &RpcTarget, params: &HashMap<String, ParamValue>) -> Result<Value> {
    let message = params.get("message").and_then(ParamValue::as_str);
    let mut draft = target.repo.add_version()?;
    draft.save(message)?;
    Ok(json!({ "version": draft.version()?, "commit": draft.info().map(|i| i.commit_hash.clone()) }))
}

fn handle_upload(target: &RpcTarget, params: &HashMap<String, ParamValue>) -> Result<Value> {
    let filename = params
        .get("filename")
        .and_then(ParamValue::as_str)
        .ok_or_else(|| ServerError::bad_request("'filename' is required"))?;
    let filedata = params
        .get("filedata")
        .and_then(ParamValue::as_bytes)
        .ok_or_else(|| ServerError::bad_request("'filedata' is required"))?;
    let item = Item::from_string(&target.repo, filename, filedata.to_vec())?;
    let version = target.repo.add_item(item, Some("grit: upload"))?;
    Ok(json!({ "filename": filename, "commit": version.info().map(|i| i.commit_hash.clone()) }))
}
