//! Grit: a lightweight versioned object store built on git's on-disk format.
//!
//! A Grit repository is either a [`Local`] directory tree holding git
//! objects and references, or a [`Proxy`] that forwards the same logical
//! operations to a `grit-server` instance over HTTP. Files ("Items") are
//! organized into snapshots ("Versions") that form an ancestry chain; a
//! repository may be branched into a nested child repository whose
//! "parent" is its enclosing directory, contributing inherited Items to the
//! child's logical view.
//!
//! # Key types
//!
//! - [`Local`] — opens (or initializes) a repository directory and provides
//!   the full read/write surface: versions, items, branching, description.
//! - [`Proxy`] — the same logical surface, reconstructed from a remote
//!   `grit-server`'s JSON/RPC responses.
//! - [`Repository`] — picks [`Local`] or [`Proxy`] from a URL-or-path string.
//! - [`Version`] — a commit snapshot: mutable (`Draft`) until [`Version::save`],
//!   immutable (`Saved`) after.
//! - [`Item`] — a runtime view over a stored blob or tree at a path.
//!
//! # Quick example
//!
//! ```rust,no_run
//! use grit::{Local, Item};
//! use grit::types::OpenOptions;
//!
//! let repo = Local::init("/tmp/my-repo", &OpenOptions::default()).unwrap();
//! let item = Item::from_string(&repo, "hello.txt", b"world".to_vec()).unwrap();
//! repo.add_item(item, Some("first commit")).unwrap();
//!
//! let items = repo.items(None, None).unwrap();
//! assert_eq!(items[0].data().unwrap(), b"world");
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod local;
pub mod lock;
pub mod mtree;
pub mod paths;
pub mod proxy;
pub mod repository;
pub mod tree;
pub mod types;
pub mod version;

// Re-export primary public types at crate root.
pub use config::Config;
pub use error::{Error, Result};
pub use item::Item;
pub use local::Local;
pub use proxy::Proxy;
pub use repository::Repository;
pub use version::Version;
