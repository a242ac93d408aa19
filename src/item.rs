use std::cell::RefCell;
use std::io::Cursor;
use std::path::Path;

use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};
use crate::local::Local;
use crate::tree;
use crate::types::{ItemInfo, ItemType, MODE_BLOB};

/// A runtime view over a stored blob or tree at a particular path.
///
/// Items never mutate the object store themselves; `save` hands the item
/// to the owning repository, which stages it in a new [`crate::version::Version`]
/// and commits. Blob bytes are fetched from the object store at most once
/// per `Item` instance and cached for its lifetime.
#[derive(Clone)]
pub struct Item {
    repo: Local,
    path: String,
    oid: git2::Oid,
    mode: u32,
    user: String,
    comment: String,
    date: DateTime<FixedOffset>,
    data: RefCell<Option<Vec<u8>>>,
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("path", &self.path)
            .field("oid", &self.oid)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Item {
    /// Build an Item from an already-resolved tree entry.
    pub(crate) fn from_entry(
        repo: Local,
        path: impl Into<String>,
        oid: git2::Oid,
        mode: u32,
        user: impl Into<String>,
        comment: impl Into<String>,
        date: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            repo,
            path: path.into(),
            oid,
            mode,
            user: user.into(),
            comment: comment.into(),
            date,
            data: RefCell::new(None),
        }
    }

    /// Read bytes from a filesystem path and create a new, unsaved Item.
    ///
    /// The mode is inferred from the file's permissions (executable bit,
    /// symlink). `name` overrides the basename of `fs_path` as the item's
    /// repo-relative path.
    pub fn from_path(repo: &Local, fs_path: &Path, name: Option<&str>) -> Result<Self> {
        let bytes = std::fs::read(fs_path).map_err(|e| Error::io(fs_path, e))?;
        let mode = tree::mode_from_disk(fs_path)?;
        let path = match name {
            Some(n) => n.to_string(),
            None => fs_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| Error::item("path has no file name"))?
                .to_string(),
        };
        Ok(Self::from_bytes(repo, &path, bytes, mode))
    }

    /// Wrap raw bytes as a new, unsaved blob Item.
    pub fn from_string(repo: &Local, name: &str, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self::from_bytes(repo, name, bytes.into(), MODE_BLOB))
    }

    fn from_bytes(repo: &Local, path: &str, bytes: Vec<u8>, mode: u32) -> Self {
        let oid = git2::Oid::hash_object(git2::ObjectType::Blob, &bytes)
            .unwrap_or_else(|_| git2::Oid::zero());
        let signature = repo.signature().clone();
        Self {
            repo: repo.clone(),
            path: crate::paths::normalize_path(path).unwrap_or_else(|_| path.to_string()),
            oid,
            mode,
            user: signature.name,
            comment: String::new(),
            date: crate::local::now_fixed_offset(),
            data: RefCell::new(Some(bytes)),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn oid(&self) -> git2::Oid {
        self.oid
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn item_type(&self) -> ItemType {
        ItemType::from_mode(self.mode)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn date(&self) -> DateTime<FixedOffset> {
        self.date
    }

    /// Return this item's bytes, fetching the blob from the object store on
    /// first access.
    pub fn data(&self) -> Result<Vec<u8>> {
        if let Some(cached) = self.data.borrow().as_ref() {
            return Ok(cached.clone());
        }
        if self.item_type() == ItemType::Tree {
            return Err(Error::is_a_directory(self.path.clone()));
        }
        let git_repo = self.repo.git2_repo()?;
        let blob = git_repo.find_blob(self.oid).map_err(Error::git)?;
        let bytes = blob.content().to_vec();
        tracing::debug!(path = %self.path, oid = %self.oid, len = bytes.len(), "fetched blob");
        *self.data.borrow_mut() = Some(bytes.clone());
        Ok(bytes)
    }

    /// Replace the in-memory bytes. Does not persist until `save`.
    pub fn set_data(&mut self, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        self.oid = git2::Oid::hash_object(git2::ObjectType::Blob, &bytes)
            .unwrap_or(self.oid);
        self.mode = MODE_BLOB;
        self.data = RefCell::new(Some(bytes));
    }

    /// Byte length of this item's data.
    pub fn size(&self) -> Result<u64> {
        Ok(self.data()?.len() as u64)
    }

    /// A readable byte-stream view over this item's data.
    pub fn file(&self) -> Result<Cursor<Vec<u8>>> {
        Ok(Cursor::new(self.data()?))
    }

    /// Write this item's bytes to disk. If `dest` names an existing
    /// directory, the file is written inside it under this item's basename.
    pub fn checkout(&self, dest: &Path) -> Result<()> {
        let target = if dest.is_dir() {
            dest.join(self.name())
        } else {
            dest.to_path_buf()
        };
        std::fs::write(&target, self.data()?).map_err(|e| Error::io(target.clone(), e))
    }

    /// Stage this item into a new Version of its owning repo and save it.
    pub fn save(&self, message: Option<&str>) -> Result<crate::version::Version> {
        self.repo.add_item(self.clone(), message)
    }

    /// Write this blob into the object store if its bytes are cached,
    /// returning its object id. A no-op that returns the existing id if the
    /// bytes were never fetched (meaning the blob is already persisted).
    pub(crate) fn persist_blob(&self, git_repo: &git2::Repository) -> Result<git2::Oid> {
        if self.item_type() == ItemType::Tree {
            return Ok(self.oid);
        }
        match self.data.borrow().as_ref() {
            Some(bytes) => {
                let oid = git_repo.blob(bytes).map_err(Error::git)?;
                Ok(oid)
            }
            None => Ok(self.oid),
        }
    }

    /// Recursively list this item's children if it is a tree; an empty
    /// vector if it is a blob (a blob has no children).
    pub fn iteritems(&self) -> Result<Vec<Item>> {
        if self.item_type() != ItemType::Tree {
            return Ok(Vec::new());
        }
        let git_repo = self.repo.git2_repo()?;
        let entries = tree::walk_tree(&git_repo, self.oid)?;
        Ok(entries
            .into_iter()
            .map(|(path, entry)| {
                let full_path = format!("{}/{}", self.path, path);
                Item::from_entry(
                    self.repo.clone(),
                    full_path,
                    entry.oid,
                    entry.mode,
                    self.user.clone(),
                    self.comment.clone(),
                    self.date,
                )
            })
            .collect())
    }

    pub fn to_info(&self) -> ItemInfo {
        ItemInfo {
            path: self.path.clone(),
            name: self.name().to_string(),
            mode: self.mode,
            item_type: self.item_type().as_str().to_string(),
            size: self.data().map(|b| b.len() as u64).unwrap_or(0),
        }
    }
}
