use chrono::{DateTime, FixedOffset};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Mode constants
// ---------------------------------------------------------------------------

/// Regular file mode (non-executable).
pub const MODE_BLOB: u32 = 0o100644;
/// Executable file mode.
pub const MODE_BLOB_EXEC: u32 = 0o100755;
/// Symbolic link mode.
pub const MODE_LINK: u32 = 0o120000;
/// Directory (tree) mode.
pub const MODE_TREE: u32 = 0o040000;

// ---------------------------------------------------------------------------
// FileType
// ---------------------------------------------------------------------------

/// The type of a git tree entry: blob (file) or tree (directory).
///
/// Executables and symlinks are both blobs as far as the Item model is
/// concerned; the finer mode distinction is preserved on
/// [`crate::item::Item::mode`] for callers that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Blob,
    Tree,
}

impl ItemType {
    pub fn from_mode(mode: u32) -> Self {
        if mode == MODE_TREE {
            Self::Tree
        } else {
            Self::Blob
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
        }
    }
}

// ---------------------------------------------------------------------------
// WalkEntry
// ---------------------------------------------------------------------------

/// An entry yielded when walking a tree.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Entry name (file or directory basename).
    pub name: String,
    /// Raw git object ID.
    pub oid: git2::Oid,
    /// Git filemode integer (e.g. `0o100644`).
    pub mode: u32,
}

impl WalkEntry {
    pub fn item_type(&self) -> ItemType {
        ItemType::from_mode(self.mode)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Author/committer identity used when creating commits.
///
/// Defaults are used when neither [`crate::local::OpenOptions`] nor the
/// environment (`GIT_AUTHOR_NAME` / `GIT_AUTHOR_EMAIL`) supplies one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            name: "grit".to_string(),
            email: "grit@localhost".to_string(),
        }
    }
}

impl Signature {
    pub fn from_env() -> Self {
        let name = std::env::var("GIT_AUTHOR_NAME")
            .or_else(|_| std::env::var("USER"))
            .unwrap_or_else(|_| Self::default().name);
        let email = std::env::var("GIT_AUTHOR_EMAIL").unwrap_or_else(|_| Self::default().email);
        Self { name, email }
    }
}

// ---------------------------------------------------------------------------
// CommitInfo
// ---------------------------------------------------------------------------

/// Flattened metadata of a saved commit, used by [`crate::version::SavedVersion`]
/// and surfaced directly as JSON/RPC response data.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub commit_hash: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub time: DateTime<FixedOffset>,
}

// ---------------------------------------------------------------------------
// ItemInfo
// ---------------------------------------------------------------------------

/// JSON-serializable summary of an [`crate::item::Item`], used by the
/// JSON/RPC `items` action and by Proxy's response reconstruction.
#[derive(Debug, Clone, Serialize)]
pub struct ItemInfo {
    pub path: String,
    pub name: String,
    pub mode: u32,
    pub item_type: String,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// OpenOptions
// ---------------------------------------------------------------------------

/// Options controlling [`crate::local::Local::init`] / `Local::open`.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Create the repository if it does not exist.
    pub create: bool,
    /// Default branch name for a newly created repository.
    pub branch: String,
    /// Author name used for the initialization commit.
    pub author: Option<String>,
    /// Author email used for the initialization commit.
    pub email: Option<String>,
    /// Lay the repository out bare (objects/refs/HEAD directly at the repo
    /// root) rather than with a working tree and a nested `.git`. Grit
    /// repositories are bare by default.
    pub bare: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            create: false,
            branch: "master".to_string(),
            author: None,
            email: None,
            bare: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ParamValue
// ---------------------------------------------------------------------------

/// A typed JSON/RPC argument value.
///
/// The wire form is always a form field (raw bytes), but handlers expect
/// typed arguments (an integer index, a boolean flag, raw bytes for an
/// upload). Rather than evaluating the field as a language literal, the
/// server (`grit_server::rpc`) declares a per-action parameter schema and
/// decodes each field into this enum against its declared kind, rejecting
/// unknown fields and values that don't fit the declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(s) => match s.as_str() {
                "true" | "True" | "1" => Some(true),
                "false" | "False" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}
