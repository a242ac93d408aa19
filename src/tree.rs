use crate::error::{Error, Result};
use crate::types::{WalkEntry, MODE_BLOB_EXEC, MODE_LINK, MODE_TREE};

/// Result of looking up a single tree entry.
#[derive(Debug, Clone)]
pub struct TreeEntryResult {
    pub oid: git2::Oid,
    pub mode: u32,
}

/// Return the `(oid, mode)` of the entry at `path`, or `None` if missing.
///
/// Walks the tree from `tree_oid` through each path segment. Returns `None`
/// when any segment is not found or an intermediate entry is not a tree.
///
/// # Arguments
/// * `repo` - The git repository.
/// * `tree_oid` - Root tree to search from.
/// * `path` - Normalized forward-slash path (e.g. `"dir/file.txt"`).
pub fn entry_at_path(
    repo: &git2::Repository,
    tree_oid: git2::Oid,
    path: &str,
) -> Result<Option<TreeEntryResult>> {
    let path = crate::paths::normalize_path(path)?;
    if path.is_empty() {
        return Ok(Some(TreeEntryResult {
            oid: tree_oid,
            mode: MODE_TREE,
        }));
    }

    let segments: Vec<&str> = path.split('/').collect();
    let mut current_oid = tree_oid;

    for (i, segment) in segments.iter().enumerate() {
        let tree = repo.find_tree(current_oid).map_err(Error::git)?;

        let entry_info = tree.get_name(segment).map(|e| (e.id(), e.filemode() as u32));

        match entry_info {
            Some((entry_oid, entry_mode)) => {
                if i == segments.len() - 1 {
                    return Ok(Some(TreeEntryResult {
                        oid: entry_oid,
                        mode: entry_mode,
                    }));
                } else {
                    if entry_mode != MODE_TREE {
                        return Ok(None);
                    }
                    current_oid = entry_oid;
                }
            }
            None => return Ok(None),
        }
    }

    Ok(None)
}

/// Walk to a path within a tree, returning every entry along the way.
///
/// Unlike [`entry_at_path`], this returns the full chain of
/// [`TreeEntryResult`] objects from the first segment to the last.
pub fn walk_to(
    repo: &git2::Repository,
    tree_oid: git2::Oid,
    path: &str,
) -> Result<Vec<TreeEntryResult>> {
    let path = crate::paths::normalize_path(path)?;
    if path.is_empty() {
        return Ok(vec![TreeEntryResult {
            oid: tree_oid,
            mode: MODE_TREE,
        }]);
    }

    let segments: Vec<&str> = path.split('/').collect();
    let mut current_oid = tree_oid;
    let mut results = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let tree = repo.find_tree(current_oid).map_err(Error::git)?;

        let entry_info = tree.get_name(segment).map(|e| (e.id(), e.filemode() as u32));

        match entry_info {
            Some((entry_oid, entry_mode)) => {
                results.push(TreeEntryResult {
                    oid: entry_oid,
                    mode: entry_mode,
                });

                if i < segments.len() - 1 {
                    if entry_mode != MODE_TREE {
                        return Err(Error::not_a_directory(segments[..=i].join("/")));
                    }
                    current_oid = entry_oid;
                }
            }
            None => {
                return Err(Error::not_found(segments[..=i].join("/")));
            }
        }
    }

    Ok(results)
}

/// Read a blob at a given path in the tree, returning its raw bytes.
pub fn read_blob_at_path(
    repo: &git2::Repository,
    tree_oid: git2::Oid,
    path: &str,
) -> Result<Vec<u8>> {
    let results = walk_to(repo, tree_oid, path)?;
    let last = results.last().ok_or_else(|| Error::not_found(path))?;

    if last.mode == MODE_TREE {
        return Err(Error::is_a_directory(path));
    }

    let blob = repo.find_blob(last.oid).map_err(Error::git)?;
    Ok(blob.content().to_vec())
}

/// List the immediate children of a tree at the given path.
///
/// Pass an empty or root path to list the top-level tree.
pub fn list_tree_at_path(
    repo: &git2::Repository,
    tree_oid: git2::Oid,
    path: &str,
) -> Result<Vec<WalkEntry>> {
    let target_oid = if crate::paths::is_root_path(path) {
        tree_oid
    } else {
        let entry = entry_at_path(repo, tree_oid, path)?.ok_or_else(|| Error::not_found(path))?;
        if entry.mode != MODE_TREE {
            return Err(Error::not_a_directory(path));
        }
        entry.oid
    };

    let tree = repo.find_tree(target_oid).map_err(Error::git)?;
    let mut entries = Vec::new();
    for i in 0..tree.len() {
        let e = tree.get(i).unwrap();
        entries.push(WalkEntry {
            name: e.name().unwrap_or("").to_string(),
            oid: e.id(),
            mode: e.filemode() as u32,
        });
    }
    Ok(entries)
}

/// Recursively walk a tree, returning all non-tree entries with full paths.
///
/// Each element is a `(full_path, WalkEntry)` pair where `full_path` is the
/// slash-separated path from the tree root (e.g. `"dir/sub/file.txt"`).
pub fn walk_tree(repo: &git2::Repository, tree_oid: git2::Oid) -> Result<Vec<(String, WalkEntry)>> {
    let mut results = Vec::new();
    walk_tree_recursive(repo, tree_oid, "", &mut results)?;
    Ok(results)
}

fn walk_tree_recursive(
    repo: &git2::Repository,
    tree_oid: git2::Oid,
    prefix: &str,
    results: &mut Vec<(String, WalkEntry)>,
) -> Result<()> {
    let tree = repo.find_tree(tree_oid).map_err(Error::git)?;

    for i in 0..tree.len() {
        let e = tree.get(i).unwrap();
        let name = e.name().unwrap_or("").to_string();
        let full_path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        let entry_mode = e.filemode() as u32;
        let entry_oid = e.id();

        if entry_mode == MODE_TREE {
            walk_tree_recursive(repo, entry_oid, &full_path, results)?;
        } else {
            results.push((
                full_path,
                WalkEntry {
                    name,
                    oid: entry_oid,
                    mode: entry_mode,
                },
            ));
        }
    }
    Ok(())
}

/// Check whether an entry exists at the given path in the tree.
pub fn exists_at_path(repo: &git2::Repository, tree_oid: git2::Oid, path: &str) -> Result<bool> {
    Ok(entry_at_path(repo, tree_oid, path)?.is_some())
}

/// Determine the git filemode for a file on disk.
///
/// Returns [`MODE_LINK`] for symlinks, [`MODE_BLOB_EXEC`] for executable
/// files (Unix only), or [`MODE_BLOB`] otherwise.
pub fn mode_from_disk(path: &std::path::Path) -> Result<u32> {
    let meta = std::fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    if meta.file_type().is_symlink() {
        return Ok(MODE_LINK);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 != 0 {
            return Ok(MODE_BLOB_EXEC);
        }
    }
    Ok(crate::types::MODE_BLOB)
}
