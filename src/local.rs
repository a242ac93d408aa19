use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::error::{Error, Result};
use crate::item::Item;
use crate::types::{OpenOptions, Signature};
use crate::version::Version;

/// A repository rooted in a directory on disk: the object store plus
/// `refs/heads/master` and (optionally) an enclosing directory of sibling
/// repositories that contribute inherited items.
///
/// Cheaply `Clone`-able: the git directory is reopened on demand rather than
/// held open, so a `Local` is really just a validated path plus the
/// signature used for commits made through it.
#[derive(Clone)]
pub struct Local {
    inner: Arc<LocalInner>,
}

struct LocalInner {
    /// The bare git directory: contains `objects/`, `refs/`, `HEAD`.
    gitdir: PathBuf,
    /// The directory the user thinks of as "the repository" — equal to
    /// `gitdir` for a bare layout, or `gitdir`'s parent for a `.git`-style
    /// layout.
    root: PathBuf,
    signature: Signature,
}

impl std::fmt::Debug for Local {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Local").field("root", &self.inner.root).finish()
    }
}

impl PartialEq for Local {
    fn eq(&self, other: &Self) -> bool {
        self.inner.gitdir == other.inner.gitdir
    }
}
impl Eq for Local {}

/// `true` if `dir` is itself a bare repository: contains `objects/`,
/// `refs/`, and `HEAD`.
fn is_repo_dir(dir: &Path) -> bool {
    dir.join("objects").is_dir() && dir.join("refs").is_dir() && dir.join("HEAD").is_file()
}

/// Walk up from `start` until a directory is found that is itself a bare
/// repository, or that contains a `.git` subdirectory satisfying the same
/// predicate. Returns `(gitdir, root)`.
fn discover(start: &Path) -> Result<(PathBuf, PathBuf)> {
    let mut cur = Some(start.to_path_buf());
    while let Some(dir) = cur {
        if is_repo_dir(&dir) {
            return Ok((dir.clone(), dir));
        }
        let dotgit = dir.join(".git");
        if dotgit.is_dir() && is_repo_dir(&dotgit) {
            return Ok((dotgit, dir));
        }
        cur = dir.parent().map(Path::to_path_buf);
    }
    Err(Error::invalid_repository(start.display().to_string()))
}

/// The current local time as a `chrono` `FixedOffset` time, used to stamp
/// newly-constructed (unsaved) `Item`s. Commit times themselves come from
/// `git2::Signature::now`, which reads the same host clock and offset.
pub fn now_fixed_offset() -> DateTime<FixedOffset> {
    chrono::Local::now().fixed_offset()
}

impl Local {
    fn from_parts(gitdir: PathBuf, root: PathBuf, signature: Signature) -> Self {
        Self {
            inner: Arc::new(LocalInner { gitdir, root, signature }),
        }
    }

    /// Open an existing repository, discovering it by walking up from
    /// `path`. Fails with [`Error::InvalidRepository`] if no
    /// repository is found.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (gitdir, root) = discover(path)?;
        Ok(Self::from_parts(gitdir, root, Signature::from_env()))
    }

    /// Create a new repository at `path` and record its initialization
    /// commit (an empty tree), matching end-to-end scenario 1 ("versions
    /// list has length 1" right after `init`).
    pub fn init(path: impl AsRef<Path>, opts: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;

        let git_repo = if opts.bare {
            git2::Repository::init_bare(path)?
        } else {
            git2::Repository::init(path)?
        };
        let gitdir = if opts.bare { path.to_path_buf() } else { path.join(".git") };
        let root = path.to_path_buf();

        let signature = Signature {
            name: opts.author.clone().unwrap_or_else(|| Signature::from_env().name),
            email: opts.email.clone().unwrap_or_else(|| Signature::from_env().email),
        };
        let repo = Self::from_parts(gitdir, root, signature);

        git_repo
            .set_head(&format!("refs/heads/{}", opts.branch))
            .map_err(Error::from)?;

        let empty_tree_oid = {
            let builder = git_repo.treebuilder(None).map_err(Error::from)?;
            builder.write().map_err(Error::from)?
        };
        let empty_tree = git_repo.find_tree(empty_tree_oid).map_err(Error::from)?;
        let sig = git2::Signature::now(&repo.inner.signature.name, &repo.inner.signature.email)
            .map_err(Error::from)?;
        git_repo
            .commit(Some("HEAD"), &sig, &sig, "initial commit", &empty_tree, &[])
            .map_err(Error::from)?;

        Ok(repo)
    }

    /// Reopen the underlying git directory. Cheap: just reads `HEAD` and
    /// config, so `Local` itself doesn't need to hold a `git2::Repository`
    /// open (which is neither `Clone` nor `Sync`).
    pub fn git2_repo(&self) -> Result<git2::Repository> {
        git2::Repository::open(&self.inner.gitdir).map_err(Error::from)
    }

    pub fn path(&self) -> &Path {
        &self.inner.root
    }

    pub fn gitdir(&self) -> &Path {
        &self.inner.gitdir
    }

    pub fn name(&self) -> &str {
        self.inner
            .root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// The Local repository whose directory immediately contains this one,
    /// if that directory is itself a valid repository.
    /// Unlike [`Local::open`], this does not keep walking further up if the
    /// immediate parent directory is not itself a repository.
    pub fn parent(&self) -> Option<Local> {
        let dir = self.inner.root.parent()?;
        if is_repo_dir(dir) {
            return Some(Self::from_parts(dir.to_path_buf(), dir.to_path_buf(), self.inner.signature.clone()));
        }
        let dotgit = dir.join(".git");
        if dotgit.is_dir() && is_repo_dir(&dotgit) {
            return Some(Self::from_parts(dotgit, dir.to_path_buf(), self.inner.signature.clone()));
        }
        None
    }

    /// The `HEAD`-reachable commit ids, sorted newest-first by commit time:
    /// a BFS over parent links with a visited set, so a (theoretically
    /// impossible, but cheaply guarded against) DAG cycle can't loop forever.
    fn ancestry_oids(&self, git_repo: &git2::Repository) -> Result<Vec<git2::Oid>> {
        let head_oid = match git_repo.head() {
            Ok(r) => r.target(),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                None
            }
            Err(e) => return Err(Error::from(e)),
        };
        let Some(head_oid) = head_oid else {
            return Ok(Vec::new());
        };

        let mut seen: HashSet<git2::Oid> = HashSet::new();
        let mut pending = vec![head_oid];
        let mut collected: Vec<(i64, git2::Oid)> = Vec::new();

        while let Some(oid) = pending.pop() {
            if !seen.insert(oid) {
                continue;
            }
            let commit = git_repo.find_commit(oid).map_err(Error::from)?;
            collected.push((commit.time().seconds(), oid));
            for parent_id in commit.parent_ids() {
                pending.push(parent_id);
            }
        }
        collected.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(collected.into_iter().map(|(_, oid)| oid).collect())
    }

    /// The Version chain reachable from HEAD, newest-first.
    pub fn versions(&self) -> Result<Vec<Version>> {
        let git_repo = self.git2_repo()?;
        self.ancestry_oids(&git_repo)?
            .into_iter()
            .map(|oid| Version::from_saved_oid(self.clone(), oid))
            .collect()
    }

    /// The single Version at `index` in the ancestry list (newest-first).
    pub fn version_at(&self, index: usize) -> Result<Version> {
        self.versions()?
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::version(format!("version index {} out of range", index)))
    }

    /// A new mutable Version seeded with the tip Version's entries
    /// (copy-on-write via re-adding each Item) and parented on the tip
    /// commit, if any.
    pub fn add_version(&self) -> Result<Version> {
        let tip = self.versions()?.into_iter().next();
        let mut tree = crate::mtree::MutableTree::new();
        let parent_oid = match &tip {
            Some(tip_version) => {
                for item in tip_version.items_flat()? {
                    tree.add(item);
                }
                tip_version.commit_oid()
            }
            None => None,
        };
        Ok(Version::new_draft(self.clone(), tree, parent_oid))
    }

    /// Hard-reset `refs/heads/master` to the commit at `index`.
    pub fn set_version(&self, index: usize) -> Result<()> {
        let version = self.version_at(index)?;
        let oid = version
            .commit_oid()
            .ok_or_else(|| Error::version("version has no commit id"))?;
        let git_repo = self.git2_repo()?;
        git_repo
            .reference("refs/heads/master", oid, true, "grit: set_version")
            .map_err(Error::from)?;
        Ok(())
    }

    /// Shorthand: read `path` from disk, wrap it in a new Version, and save.
    pub fn add_file(&self, path: &Path, message: Option<&str>) -> Result<Version> {
        let item = Item::from_path(self, path, None)?;
        self.add_item(item, message)
    }

    /// Shorthand: stage a pre-built Item into a new Version and save.
    pub fn add_item(&self, item: Item, message: Option<&str>) -> Result<Version> {
        let mut draft = self.add_version()?;
        draft.add_item(item)?;
        draft.save(message)?;
        Ok(draft)
    }

    /// The merged Item view across the chosen Version and every ancestor
    /// directory-repository, optionally filtered by an anchored path regex.
    pub fn items(&self, path_regex: Option<&str>, version_index: Option<usize>) -> Result<Vec<Item>> {
        let mut map: BTreeMap<String, Item> = BTreeMap::new();
        self.collect_items(version_index, &mut map)?;
        let mut result: Vec<Item> = map.into_values().collect();

        if let Some(pattern) = path_regex {
            let anchored = format!("^{}$", pattern);
            let re = Regex::new(&anchored)
                .map_err(|e| Error::item(format!("invalid path regex {:?}: {}", pattern, e)))?;
            result.retain(|item| re.is_match(item.path()));
        }

        result.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(result)
    }

    /// The dominance rule of `items()`: this repo's chosen-Version entries
    /// win; the immediate directory-parent is then asked for *its own*
    /// current items (recursing further up its own parent chain in turn),
    /// and only paths not already present are added. Recursion through
    /// `Local::items`'s own inheritance naturally implements transitive
    /// inheritance without re-deriving it here.
    fn collect_items(&self, version_index: Option<usize>, map: &mut BTreeMap<String, Item>) -> Result<()> {
        let version = match version_index {
            Some(i) => Some(self.version_at(i)?),
            None => self.versions()?.into_iter().next(),
        };
        if let Some(v) = version {
            for item in v.items_flat()? {
                map.entry(item.path().to_string()).or_insert(item);
            }
        }
        if let Some(parent) = self.parent() {
            parent.collect_items(None, map)?;
        }
        Ok(())
    }

    /// Initialize a new Local at `self.path()/name`.
    pub fn branch(&self, name: &str, desc: Option<&str>) -> Result<Local> {
        let dest = self.path().join(name);
        let opts = OpenOptions {
            create: true,
            author: Some(self.inner.signature.name.clone()),
            email: Some(self.inner.signature.email.clone()),
            ..OpenOptions::default()
        };
        let child = Local::init(&dest, &opts)?;
        if let Some(d) = desc {
            child.set_description(d)?;
        }
        Ok(child)
    }

    /// Recursively remove the repository directory.
    pub fn delete(&self) -> Result<()> {
        std::fs::remove_dir_all(self.path()).map_err(|e| Error::io(self.path(), e))
    }

    pub fn get_description(&self) -> Result<String> {
        let p = self.inner.gitdir.join("description");
        std::fs::read_to_string(&p).map_err(|e| Error::io(p.clone(), e))
    }

    pub fn set_description(&self, text: &str) -> Result<()> {
        let p = self.inner.gitdir.join("description");
        std::fs::write(&p, text).map_err(|e| Error::io(p.clone(), e))
    }

    /// Invoke the git transport against `origin`.
    pub fn pull(&self) -> Result<()> {
        self.run_git(&["pull", "origin"])
    }

    pub fn push(&self) -> Result<()> {
        self.run_git(&["push", "origin"])
    }

    fn run_git(&self, args: &[&str]) -> Result<()> {
        let output = std::process::Command::new("git")
            .arg("--git-dir")
            .arg(&self.inner.gitdir)
            .args(args)
            .output()
            .map_err(|e| Error::git_msg(format!("failed to spawn git: {}", e)))?;
        if !output.status.success() {
            return Err(Error::git_msg(format!(
                "git {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init(tmp: &TempDir) -> Local {
        Local::init(tmp.path(), &OpenOptions::default()).unwrap()
    }

    #[test]
    fn init_creates_one_version() {
        let tmp = TempDir::new().unwrap();
        let repo = init(&tmp);
        assert_eq!(repo.versions().unwrap().len(), 1);
    }

    #[test]
    fn add_version_then_save_grows_history() {
        let tmp = TempDir::new().unwrap();
        let repo = init(&tmp);
        let mut v = repo.add_version().unwrap();
        v.save(Some("m")).unwrap();
        assert_eq!(repo.versions().unwrap().len(), 2);

        let mut v2 = repo.add_version().unwrap();
        v2.save(Some("m2")).unwrap();
        let versions = repo.versions().unwrap();
        assert_eq!(versions.len(), 3);
        // newest first: commit times are non-increasing down the list
        for pair in versions.windows(2) {
            let t0 = pair[0].info().unwrap().time;
            let t1 = pair[1].info().unwrap().time;
            assert!(t0 >= t1);
        }
    }

    #[test]
    fn add_and_find_file() {
        let tmp = TempDir::new().unwrap();
        let repo = init(&tmp);
        let file = tmp.path().join("x.bin");
        std::fs::write(&file, b"hello").unwrap();
        repo.add_file(&file, Some("m1")).unwrap();

        assert_eq!(repo.items(None, None).unwrap().len(), 1);
        assert_eq!(repo.items(Some("x.bin"), None).unwrap().len(), 1);
        assert_eq!(repo.items(Some("nope"), None).unwrap().len(), 0);

        let items = repo.items(Some("x.bin"), None).unwrap();
        assert_eq!(items[0].data().unwrap(), b"hello");
    }

    #[test]
    fn remove_item_empties_tree() {
        let tmp = TempDir::new().unwrap();
        let repo = init(&tmp);
        let item = Item::from_string(&repo, "x.bin", b"hi".to_vec()).unwrap();
        repo.add_item(item.clone(), Some("add")).unwrap();
        assert_eq!(repo.items(None, None).unwrap().len(), 1);

        let mut v = repo.add_version().unwrap();
        let tracked = repo.items(Some("x.bin"), None).unwrap().remove(0);
        v.remove_item(&tracked).unwrap();
        v.save(Some("remove")).unwrap();

        assert_eq!(repo.items(None, None).unwrap().len(), 0);
    }

    #[test]
    fn branch_inherits_then_overrides() {
        let tmp = TempDir::new().unwrap();
        let repo = init(&tmp);
        let a = Item::from_string(&repo, "a.bin", b"base".to_vec()).unwrap();
        repo.add_item(a, Some("add a")).unwrap();

        let child = repo.branch("B", None).unwrap();
        let inherited = child.items(None, None).unwrap();
        assert_eq!(inherited.len(), 1);
        assert_eq!(inherited[0].data().unwrap(), b"base");

        let override_item = Item::from_string(&child, "a.bin", b"child".to_vec()).unwrap();
        child.add_item(override_item, Some("override")).unwrap();

        let child_items = child.items(None, None).unwrap();
        assert_eq!(child_items.len(), 1);
        assert_eq!(child_items[0].data().unwrap(), b"child");

        let parent_items = repo.items(None, None).unwrap();
        assert_eq!(parent_items[0].data().unwrap(), b"base");
    }

    #[test]
    fn parent_name_matches_enclosing_directory() {
        let tmp = TempDir::new().unwrap();
        let base = init(&tmp);
        let child = base.branch("child", None).unwrap();
        let parent = child.parent().expect("child has a parent");
        assert_eq!(parent.name(), base.name());
    }

    #[test]
    fn describe_round_trips() {
        let tmp = TempDir::new().unwrap();
        let repo = init(&tmp);
        repo.set_description("hello").unwrap();
        assert_eq!(repo.get_description().unwrap(), "hello");
    }

    #[test]
    fn set_version_hard_resets() {
        let tmp = TempDir::new().unwrap();
        let repo = init(&tmp);
        let mut v = repo.add_version().unwrap();
        v.save(Some("m1")).unwrap();
        assert_eq!(repo.versions().unwrap().len(), 2);

        repo.set_version(1).unwrap();
        assert_eq!(repo.versions().unwrap().len(), 1);
    }
}
