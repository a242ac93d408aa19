use crate::error::{Error, Result};
use crate::local::Local;
use crate::proxy::Proxy;
use crate::types::OpenOptions;

/// Selects [`Local`] or [`Proxy`] from a URL-or-path string at construction
/// and presents one interface.
///
/// A plain two-variant enum rather than a dynamically-dispatched wrapper:
/// the facade only exposes the operations common to both kinds
/// (construction, identity, the handful of scalar lookups every repository
/// answers); callers that need the richer Local-only surface
/// (`versions`/`items`/`add_item`/...) match the variant explicitly via
/// [`Repository::as_local`].
#[derive(Clone, Debug)]
pub enum Repository {
    Local(Local),
    Proxy(Proxy),
}

impl Repository {
    fn is_remote(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    /// `new(url, clone_from, bare)`: clone from `clone_from` if
    /// given; otherwise create a repository at `url` directly (remotely via
    /// the `new` RPC action, or locally via [`Local::init`]).
    pub fn new(url: &str, clone_from: Option<&str>, bare: bool) -> Result<Self> {
        if let Some(source) = clone_from {
            return Self::clone_repo(source, url, bare);
        }
        if Self::is_remote(url) {
            let proxy = Proxy::connect(url)?;
            proxy.call("new", &[])?;
            return Ok(Self::Proxy(proxy));
        }
        let opts = OpenOptions { create: true, bare, ..OpenOptions::default() };
        Ok(Self::Local(Local::init(url, &opts)?))
    }

    /// Open an existing repository without creating anything: opens a Local
    /// directory, or handshakes with a remote Proxy.
    pub fn open(url: &str) -> Result<Self> {
        if Self::is_remote(url) {
            Ok(Self::Proxy(Proxy::connect(url)?))
        } else {
            Ok(Self::Local(Local::open(url)?))
        }
    }

    /// `clone(dest, bare)`: shell out to the native `git` binary,
    /// then open the result as a Local.
    pub fn clone_repo(source: &str, dest: &str, bare: bool) -> Result<Self> {
        let mut cmd = std::process::Command::new("git");
        cmd.arg("clone").arg("--depth=0");
        if bare {
            cmd.arg("--bare");
        }
        cmd.arg(source).arg(dest);
        let output = cmd
            .output()
            .map_err(|e| Error::git_msg(format!("failed to spawn git clone: {}", e)))?;
        if !output.status.success() {
            return Err(Error::git_msg(format!(
                "git clone failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(Self::Local(Local::open(dest)?))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn as_local(&self) -> Option<&Local> {
        match self {
            Self::Local(l) => Some(l),
            Self::Proxy(_) => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Self::Proxy(p) => Some(p),
            Self::Local(_) => None,
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            Self::Local(l) => Some(l.name().to_string()),
            Self::Proxy(p) => p.name(),
        }
    }

    pub fn description(&self) -> Result<Option<String>> {
        match self {
            Self::Local(l) => l.get_description().map(Some),
            Self::Proxy(p) => Ok(p.description()),
        }
    }
}

impl PartialEq for Repository {
    /// Two facades compare equal iff their underlying repositories'
    /// canonical ids are equal: `gitdir` for Local, `url` for Proxy.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Local(a), Self::Local(b)) => a == b,
            (Self::Proxy(a), Self::Proxy(b)) => a.url() == b.url(),
            _ => false,
        }
    }
}
impl Eq for Repository {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_local_creates_repo() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repo");
        let repo = Repository::new(path.to_str().unwrap(), None, true).unwrap();
        assert!(repo.is_local());
        assert_eq!(repo.as_local().unwrap().versions().unwrap().len(), 1);
    }

    #[test]
    fn facade_identity_by_canonical_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repo");
        let a = Repository::new(path.to_str().unwrap(), None, true).unwrap();
        let b = Repository::open(path.to_str().unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
