use std::path::{Path, PathBuf};
use std::sync::Arc;

use grit::Local;

use crate::config::Config;
use crate::error::{Result, ServerError};

/// Shared `axum` state: the resolved configuration plus helpers for turning
/// a request path into a [`grit::Local`] repository.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self { config: Arc::new(config) }
    }

    /// Strip an optional `.*?/<marker>` prefix from a raw URL path, per the
    /// router's "An optional URI marker prefix" rule.
    pub fn strip_marker<'a>(&self, path: &'a str) -> &'a str {
        match &self.config.uri_marker {
            Some(marker) => {
                let needle = format!("/{}/", marker);
                match path.find(&needle) {
                    Some(idx) => &path[idx + needle.len()..],
                    None => path.trim_start_matches('/'),
                }
            }
            None => path.trim_start_matches('/'),
        }
    }

    /// Resolve a repo-relative path to a filesystem path under the
    /// configured repo root, and enforce the path-safety rule: the
    /// resolved path must be a prefix-descendant of the root.
    pub fn resolve_repo_path(&self, rel: &str) -> Result<PathBuf> {
        let joined = self.config.repo_root.join(rel);
        let root = canonicalize_best_effort(&self.config.repo_root);
        let resolved = canonicalize_best_effort(&joined);
        if !resolved.starts_with(&root) {
            return Err(ServerError::forbidden(format!(
                "path {} escapes repository root",
                rel
            )));
        }
        Ok(joined)
    }

    /// Resolve a static-asset path under `static_dir`, same path-safety rule.
    pub fn resolve_static_path(&self, rel: &str) -> Result<PathBuf> {
        let joined = self.config.static_dir.join(rel);
        let root = canonicalize_best_effort(&self.config.static_dir);
        let resolved = canonicalize_best_effort(&joined);
        if !resolved.starts_with(&root) {
            return Err(ServerError::forbidden(format!(
                "path {} escapes static root",
                rel
            )));
        }
        Ok(joined)
    }

    /// Open the Local repository whose directory the given repo-relative
    /// path resolves into, walking up per [`Local::open`]'s own discovery.
    pub fn open_repo(&self, rel: &str) -> Result<Local> {
        let path = self.resolve_repo_path(rel)?;
        Ok(Local::open(&path)?)
    }
}

/// `canonicalize` if the path exists, otherwise fall back to a lexical
/// cleanup so a path-safety check still works against a not-yet-created
/// repository directory.
fn canonicalize_best_effort(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| lexical_clean(path))
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
