use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::item::Item;
use crate::types::MODE_TREE;

/// Staging structure for an unsaved [`crate::version::Version`]: a mapping
/// from full repo-relative path to the Item occupying it.
///
/// The mapping is flat — nesting is a property of the persisted git tree,
/// not of this in-memory structure, so `add`/`remove`/`entries` all operate
/// on whole paths rather than directory segments. [`MutableTree::write`]
/// rebuilds the proper nested tree objects at save time.
#[derive(Default, Clone)]
pub struct MutableTree {
    entries: BTreeMap<String, Item>,
}

impl MutableTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: Item) {
        self.entries.insert(item.path().to_string(), item);
    }

    pub fn remove(&mut self, item: &Item) -> Result<()> {
        self.entries
            .remove(item.path())
            .map(|_| ())
            .ok_or_else(|| Error::item(format!("no such item in tree: {}", item.path())))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &Item> {
        self.entries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Write every item's blob, then the nested tree objects they imply, to
    /// the object store. Returns the root tree's object id.
    pub fn write(&self, repo: &git2::Repository) -> Result<git2::Oid> {
        let mut flat: BTreeMap<String, (u32, git2::Oid)> = BTreeMap::new();
        for (path, item) in &self.entries {
            let oid = item.persist_blob(repo)?;
            flat.insert(path.clone(), (item.mode(), oid));
        }
        build_nested_tree(repo, &flat)
    }
}

/// Build real nested git tree objects from a flat path -> (mode, oid) map.
///
/// This is what keeps the on-disk layout byte-compatible with native git
/// clients even though [`MutableTree`]'s own API only ever deals in whole
/// paths.
fn build_nested_tree(
    repo: &git2::Repository,
    flat: &BTreeMap<String, (u32, git2::Oid)>,
) -> Result<git2::Oid> {
    let mut children: BTreeMap<String, BTreeMap<String, (u32, git2::Oid)>> = BTreeMap::new();
    let mut leaves: BTreeMap<String, (u32, git2::Oid)> = BTreeMap::new();

    for (path, entry) in flat {
        match path.split_once('/') {
            Some((dir, rest)) => {
                children
                    .entry(dir.to_string())
                    .or_default()
                    .insert(rest.to_string(), *entry);
            }
            None => {
                leaves.insert(path.clone(), *entry);
            }
        }
    }

    let mut builder = repo.treebuilder(None).map_err(Error::git)?;

    for (name, (mode, oid)) in &leaves {
        builder.insert(name, *oid, *mode as i32).map_err(Error::git)?;
    }

    for (dir, sub_flat) in &children {
        let sub_oid = build_nested_tree(repo, sub_flat)?;
        builder
            .insert(dir, sub_oid, MODE_TREE as i32)
            .map_err(Error::git)?;
    }

    builder.write().map_err(Error::git)
}
