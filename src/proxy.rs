use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};

/// The JSON/RPC response envelope: `{success, failure, data, msg?}`.
#[derive(Debug, serde::Deserialize)]
struct RpcEnvelope {
    success: bool,
    failure: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    msg: Option<String>,
}

/// Remote mirror of a repository, accessed entirely over the JSON/RPC
/// surface. A Proxy never opens git objects itself — every operation
/// is an HTTP POST to the repository's control URL, and the `data` payload
/// of each response is cached in an attribute bag so simple lookups (name,
/// description, ...) don't round-trip twice.
///
/// Attribute/method lookups are dispatched through one explicit `call` plus
/// a handful of named wrapper methods, rather than forwarded dynamically.
#[derive(Clone)]
pub struct Proxy {
    url: String,
    client: reqwest::blocking::Client,
    attrs: RefCell<HashMap<String, Value>>,
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy").field("url", &self.url).finish()
    }
}

impl Proxy {
    /// Handshake: POST `action=read` to `url` and cache the response.
    pub fn connect(url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::new();
        let proxy = Self {
            url: url.to_string(),
            client,
            attrs: RefCell::new(HashMap::new()),
        };
        let data = proxy.call("read", &[])?;
        proxy.merge_attrs(&data);
        Ok(proxy)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn merge_attrs(&self, data: &Value) {
        if let Value::Object(map) = data {
            let mut attrs = self.attrs.borrow_mut();
            for (k, v) in map {
                attrs.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn attr(&self, name: &str) -> Option<Value> {
        self.attrs.borrow().get(name).cloned()
    }

    pub fn name(&self) -> Option<String> {
        self.attr("name").and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn description(&self) -> Option<String> {
        self.attr("description").and_then(|v| v.as_str().map(str::to_string))
    }

    /// Turn an operation name plus keyword arguments into an HTTP POST,
    /// returning the decoded `data` payload or a [`Error::Proxy`] built
    /// from the envelope's `msg`.
    pub fn call(&self, action: &str, args: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!(url = %self.url, action, "proxy rpc call");
        let mut form: Vec<(&str, &str)> = vec![("action", action)];
        form.extend_from_slice(args);

        let resp = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .map_err(|e| Error::proxy(format!("request to {} failed: {}", self.url, e)))?;
        let status = resp.status();
        let envelope: RpcEnvelope = resp
            .json()
            .map_err(|e| Error::proxy(format!("malformed response from {}: {}", self.url, e)))?;

        if envelope.failure || !envelope.success {
            let msg = envelope
                .msg
                .or_else(|| {
                    envelope
                        .data
                        .get("msg")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| format!("request failed with status {}", status));
            return Err(Error::proxy(msg));
        }
        Ok(envelope.data)
    }

    /// The merged Item view from the remote repository, each element
    /// wrapped as its own Proxy pointing at the element's `url` field.
    pub fn items(&self, path_regex: Option<&str>, version_index: Option<usize>) -> Result<Vec<Proxy>> {
        let mut args: Vec<(&str, &str)> = Vec::new();
        if let Some(p) = path_regex {
            args.push(("path", p));
        }
        let idx_str;
        if let Some(i) = version_index {
            idx_str = i.to_string();
            args.push(("version", &idx_str));
        }
        self.wrap_list(self.call("items", &args)?)
    }

    pub fn versions(&self) -> Result<Vec<Proxy>> {
        self.wrap_list(self.call("versions", &[])?)
    }

    fn wrap_list(&self, data: Value) -> Result<Vec<Proxy>> {
        let Value::Array(items) = data else {
            return Err(Error::proxy("expected a list response"));
        };
        items
            .into_iter()
            .map(|element| {
                let url = element
                    .get("url")
                    .and_then(|u| u.as_str())
                    .ok_or_else(|| Error::proxy("list element missing 'url' field"))?
                    .to_string();
                let proxy = Self {
                    url,
                    client: self.client.clone(),
                    attrs: RefCell::new(HashMap::new()),
                };
                proxy.merge_attrs(&element);
                Ok(proxy)
            })
            .collect()
    }

    /// `action=data` is the single binary endpoint: the response body
    /// is returned verbatim, with no JSON envelope.
    pub fn data(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .post(&self.url)
            .form(&[("action", "data")])
            .send()
            .map_err(|e| Error::proxy(format!("request to {} failed: {}", self.url, e)))?;
        if !resp.status().is_success() {
            return Err(Error::proxy(format!(
                "data request to {} failed with status {}",
                self.url,
                resp.status()
            )));
        }
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| Error::proxy(format!("reading response body from {}: {}", self.url, e)))
    }

    /// `update()` is unsupported over the wire protocol and always raises.
    pub fn update(&self) -> Result<()> {
        Err(Error::proxy("update() is not supported on a Proxy repository"))
    }

    pub fn branch(&self, name: &str, desc: Option<&str>) -> Result<Proxy> {
        let mut args = vec![("name", name)];
        if let Some(d) = desc {
            args.push(("desc", d));
        }
        let data = self.call("branch", &args)?;
        let url = data
            .get("url")
            .and_then(|u| u.as_str())
            .ok_or_else(|| Error::proxy("branch response missing 'url' field"))?;
        Proxy::connect(url)
    }

    pub fn add_version(&self) -> Result<()> {
        self.call("addVersion", &[]).map(|_| ())
    }

    pub fn parent(&self) -> Result<Option<Proxy>> {
        let data = self.call("parent", &[])?;
        if data.is_null() {
            return Ok(None);
        }
        let url = data
            .get("url")
            .and_then(|u| u.as_str())
            .ok_or_else(|| Error::proxy("parent response missing 'url' field"))?;
        Proxy::connect(url).map(Some)
    }
}
