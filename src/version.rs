use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};
use crate::item::Item;
use crate::local::Local;
use crate::mtree::MutableTree;
use crate::paths::format_commit_message;
use crate::tree;
use crate::types::CommitInfo;

/// Tagged state backing a [`Version`]. `Draft` holds the staging tree and is mutable;
/// `Saved` is immutable and carries the persisted commit's metadata.
enum VersionState {
    Draft {
        tree: MutableTree,
        parent_oid: Option<git2::Oid>,
    },
    Saved {
        commit_oid: git2::Oid,
        tree_oid: git2::Oid,
        info: CommitInfo,
    },
}

impl Clone for VersionState {
    fn clone(&self) -> Self {
        match self {
            Self::Draft { tree, parent_oid } => Self::Draft {
                tree: tree.clone(),
                parent_oid: *parent_oid,
            },
            Self::Saved { commit_oid, tree_oid, info } => Self::Saved {
                commit_oid: *commit_oid,
                tree_oid: *tree_oid,
                info: info.clone(),
            },
        }
    }
}

/// A commit snapshot bound to its owning repository.
///
/// Created mutable via [`Local::add_version`]; becomes immutable at
/// [`Version::save`]. Calling [`Version::add_item`]/[`Version::remove_item`]
/// on an already-saved Version fails with [`Error::Version`].
#[derive(Clone)]
pub struct Version {
    repo: Local,
    state: VersionState,
}

impl Version {
    pub(crate) fn new_draft(repo: Local, tree: MutableTree, parent_oid: Option<git2::Oid>) -> Self {
        Self {
            repo,
            state: VersionState::Draft { tree, parent_oid },
        }
    }

    /// Build a `Saved` Version by reading a commit that already exists in
    /// the object store.
    pub(crate) fn from_saved_oid(repo: Local, commit_oid: git2::Oid) -> Result<Self> {
        let git_repo = repo.git2_repo()?;
        let commit = git_repo.find_commit(commit_oid).map_err(Error::from)?;
        let info = commit_info(&commit)?;
        let tree_oid = commit.tree_id();
        Ok(Self {
            repo,
            state: VersionState::Saved { commit_oid, tree_oid, info },
        })
    }

    pub fn is_saved(&self) -> bool {
        matches!(self.state, VersionState::Saved { .. })
    }

    pub fn commit_oid(&self) -> Option<git2::Oid> {
        match &self.state {
            VersionState::Saved { commit_oid, .. } => Some(*commit_oid),
            VersionState::Draft { .. } => None,
        }
    }

    /// Flattened metadata of the underlying commit, or `None` for a Draft.
    pub fn info(&self) -> Option<&CommitInfo> {
        match &self.state {
            VersionState::Saved { info, .. } => Some(info),
            VersionState::Draft { .. } => None,
        }
    }

    /// This commit's index in the owning repository's ancestry list
    /// (newest-first); `None` if not yet saved or not reachable from HEAD.
    pub fn version(&self) -> Result<Option<usize>> {
        let Some(oid) = self.commit_oid() else {
            return Ok(None);
        };
        let versions = self.repo.versions()?;
        Ok(versions.iter().position(|v| v.commit_oid() == Some(oid)))
    }

    /// Stage an Item into this Draft's tree. Fails with [`Error::Version`]
    /// if this Version has already been saved.
    pub fn add_item(&mut self, item: Item) -> Result<()> {
        match &mut self.state {
            VersionState::Draft { tree, .. } => {
                tree.add(item);
                Ok(())
            }
            VersionState::Saved { .. } => Err(Error::version("cannot mutate a saved version")),
        }
    }

    /// Remove a previously-staged Item from this Draft's tree.
    pub fn remove_item(&mut self, item: &Item) -> Result<()> {
        match &mut self.state {
            VersionState::Draft { tree, .. } => tree.remove(item),
            VersionState::Saved { .. } => Err(Error::version("cannot mutate a saved version")),
        }
    }

    /// Persist this Draft's tree and commit objects and advance
    /// `refs/heads/master`. The blob/tree/commit writes and
    /// the ref update happen inside a single `git2::Repository::commit`
    /// call and under the repository's advisory lock, so a reader that
    /// observes the new HEAD is guaranteed to find every referenced object.
    pub fn save(&mut self, message: Option<&str>) -> Result<()> {
        let (tree, parent_oid) = match &self.state {
            VersionState::Draft { tree, parent_oid } => (tree.clone(), *parent_oid),
            VersionState::Saved { .. } => return Err(Error::version("version already saved")),
        };

        let gitdir = self.repo.gitdir().to_path_buf();
        let message = format_commit_message("grit: save version", message);

        let (commit_oid, tree_oid, info) = crate::lock::with_repo_lock(&gitdir, || {
            let git_repo = self.repo.git2_repo()?;
            let tree_oid = tree.write(&git_repo)?;
            let git_tree = git_repo.find_tree(tree_oid).map_err(Error::from)?;

            let signature = self.repo.signature();
            let sig = git2::Signature::now(&signature.name, &signature.email).map_err(Error::from)?;

            let parents: Vec<git2::Commit> = match parent_oid {
                Some(oid) => vec![git_repo.find_commit(oid).map_err(Error::from)?],
                None => Vec::new(),
            };
            let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

            let commit_oid = git_repo
                .commit(Some("refs/heads/master"), &sig, &sig, &message, &git_tree, &parent_refs)
                .map_err(Error::from)?;
            let commit = git_repo.find_commit(commit_oid).map_err(Error::from)?;
            let info = commit_info(&commit)?;
            Ok((commit_oid, tree_oid, info))
        })?;

        tracing::info!(commit = %commit_oid, tree = %tree_oid, "saved version");
        self.state = VersionState::Saved { commit_oid, tree_oid, info };
        Ok(())
    }

    /// Flatten this Version's tree into blob Items, each carrying this
    /// Version's committer/message/time as its `user`/`comment`/`date`.
    pub fn items_flat(&self) -> Result<Vec<Item>> {
        match &self.state {
            VersionState::Draft { tree, .. } => Ok(tree.entries().cloned().collect()),
            VersionState::Saved { tree_oid, info, .. } => {
                let git_repo = self.repo.git2_repo()?;
                let entries = tree::walk_tree(&git_repo, *tree_oid)?;
                Ok(entries
                    .into_iter()
                    .map(|(path, entry)| {
                        Item::from_entry(
                            self.repo.clone(),
                            path,
                            entry.oid,
                            entry.mode,
                            info.author_name.clone(),
                            info.message.clone(),
                            info.time,
                        )
                    })
                    .collect())
            }
        }
    }
}

fn commit_info(commit: &git2::Commit) -> Result<CommitInfo> {
    let author = commit.author();
    Ok(CommitInfo {
        commit_hash: commit.id().to_string(),
        message: commit.message().unwrap_or("").trim_end().to_string(),
        author_name: author.name().unwrap_or("").to_string(),
        author_email: author.email().unwrap_or("").to_string(),
        time: git_time_to_chrono(commit.time()),
    })
}

/// Convert a `git2::Time` (seconds since epoch + minutes-east offset) into a
/// `chrono::DateTime<FixedOffset>`.
fn git_time_to_chrono(t: git2::Time) -> DateTime<FixedOffset> {
    let offset =
        FixedOffset::east_opt(t.offset_minutes() * 60).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    DateTime::from_timestamp(t.seconds(), 0)
        .unwrap_or_else(|| DateTime::from_timestamp(0, 0).expect("epoch is a valid timestamp"))
        .with_timezone(&offset)
}
