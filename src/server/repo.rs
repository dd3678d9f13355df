//! server::repo
//!
//! Read operations against one repository using git2.
//!
//! # Error Handling
//!
//! git2 failures are categorized into [`RepoError`] variants, which convert
//! into wire [`Status`] codes:
//! - [`RepoError::InvalidUid`] / [`RepoError::InvalidRevision`]: invalid argument
//! - [`RepoError::RepoNotFound`] / [`RepoError::RevisionNotFound`] /
//!   [`RepoError::NoMergeBase`]: not found
//! - [`RepoError::Git`]: internal
//!
//! Everything here blocks; callers run it on a blocking thread.

use std::path::{Component, Path, PathBuf};

use git2::{Delta, DiffFindOptions, Oid, Repository, Sort};
use thiserror::Error;

use crate::rpc::messages as rpc;
use crate::rpc::Status;

/// Errors from repository reads.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The repository uid is empty or escapes the storage root.
    #[error("invalid repository uid '{0}'")]
    InvalidUid(String),

    #[error("repository not found: {0}")]
    RepoNotFound(String),

    /// The revision does not resolve to a commit.
    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    /// The revision is syntactically invalid.
    #[error("invalid revision: {0}")]
    InvalidRevision(String),

    #[error("no merge base between '{ref1}' and '{ref2}'")]
    NoMergeBase { ref1: String, ref2: String },

    #[error("{context}: {message}")]
    Git { context: String, message: String },
}

impl RepoError {
    fn git(err: git2::Error, context: &str) -> Self {
        RepoError::Git {
            context: context.to_string(),
            message: err.message().to_string(),
        }
    }

    fn from_revparse(err: git2::Error, rev: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::Peel => {
                RepoError::RevisionNotFound(rev.to_string())
            }
            git2::ErrorCode::InvalidSpec | git2::ErrorCode::Ambiguous => {
                RepoError::InvalidRevision(format!("{} ({})", rev, err.message()))
            }
            _ => RepoError::git(err, rev),
        }
    }
}

impl From<RepoError> for Status {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match err {
            RepoError::InvalidUid(_) | RepoError::InvalidRevision(_) => {
                Status::invalid_argument(message)
            }
            RepoError::RepoNotFound(_)
            | RepoError::RevisionNotFound(_)
            | RepoError::NoMergeBase { .. } => Status::not_found(message),
            RepoError::Git { .. } => Status::internal(message),
        }
    }
}

/// Filters and paging for a commit walk.
#[derive(Debug, Clone, Default)]
pub struct CommitFilter {
    pub git_ref: String,
    pub after: String,
    /// 1-based; 0 is the first page.
    pub page: usize,
    /// 0 means unlimited.
    pub limit: usize,
    pub path: String,
    pub since: i64,
    pub until: i64,
    pub committer: String,
}

impl CommitFilter {
    fn skip(&self) -> usize {
        if self.limit == 0 {
            return 0;
        }
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    fn matches_time(&self, seconds: i64) -> bool {
        (self.since == 0 || seconds >= self.since) && (self.until == 0 || seconds <= self.until)
    }

    fn matches_committer(&self, signature: &git2::Signature<'_>) -> bool {
        if self.committer.is_empty() {
            return true;
        }
        let needle = self.committer.to_lowercase();
        let name = String::from_utf8_lossy(signature.name_bytes()).to_lowercase();
        let email = String::from_utf8_lossy(signature.email_bytes()).to_lowercase();
        name.contains(&needle) || email.contains(&needle)
    }
}

/// How a commit relates to a tracked path.
enum PathChange {
    Untouched,
    Changed,
    /// The path was created by renaming `old_path`.
    Renamed { old_path: String },
}

/// Resolve a repository uid to a directory under `root`.
///
/// The uid must be relative and may not contain `..`. A `<uid>.git`
/// directory is used when `<uid>` does not exist.
pub fn resolve_repo_path(root: &Path, uid: &str) -> Result<PathBuf, RepoError> {
    if uid.is_empty() {
        return Err(RepoError::InvalidUid(uid.to_string()));
    }
    let relative = Path::new(uid);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(RepoError::InvalidUid(uid.to_string()));
    }

    let direct = root.join(relative);
    if direct.exists() {
        return Ok(direct);
    }
    let bare = root.join(format!("{}.git", uid));
    if bare.exists() {
        return Ok(bare);
    }
    Err(RepoError::RepoNotFound(uid.to_string()))
}

/// A repository opened for reading.
pub struct Repo {
    repo: Repository,
}

impl Repo {
    /// Open the repository `uid` under `root`.
    pub fn open(root: &Path, uid: &str) -> Result<Self, RepoError> {
        let path = resolve_repo_path(root, uid)?;
        let repo = Repository::open(&path).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => RepoError::RepoNotFound(uid.to_string()),
            _ => RepoError::git(e, uid),
        })?;
        Ok(Self { repo })
    }

    fn resolve_commit(&self, rev: &str) -> Result<git2::Commit<'_>, RepoError> {
        if rev.is_empty() {
            return Err(RepoError::InvalidRevision("empty revision".to_string()));
        }
        self.repo
            .revparse_single(rev)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|e| RepoError::from_revparse(e, rev))
    }

    /// Look up the commit `rev` resolves to.
    pub fn commit(&self, rev: &str) -> Result<rpc::Commit, RepoError> {
        Ok(to_rpc_commit(&self.resolve_commit(rev)?))
    }

    /// Walk history matching `filter`, handing each message to `sink`.
    ///
    /// Commits come newest first (topological, then time). The walk stops
    /// early when `sink` returns `false`.
    ///
    /// With a path filter, a commit matches when the path differs from its
    /// first parent. If the path was created by a rename, the walk records
    /// the rename, keeps following the old path, and attaches the
    /// cumulative rename list to the next message it sends.
    pub fn walk_commits<F>(&self, filter: &CommitFilter, mut sink: F) -> Result<(), RepoError>
    where
        F: FnMut(rpc::ListCommitsResponse) -> bool,
    {
        let tip = self.resolve_commit(&filter.git_ref)?;

        let mut walk = self
            .repo
            .revwalk()
            .map_err(|e| RepoError::git(e, "revwalk"))?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(|e| RepoError::git(e, "revwalk"))?;
        walk.push(tip.id())
            .map_err(|e| RepoError::git(e, &filter.git_ref))?;
        if !filter.after.is_empty() {
            let after = self.resolve_commit(&filter.after)?;
            walk.hide(after.id())
                .map_err(|e| RepoError::git(e, &filter.after))?;
        }

        let skip = filter.skip();
        let mut path = filter.path.clone();
        let mut renames: Vec<rpc::RenameDetails> = Vec::new();
        let mut renames_pending = false;
        let mut matched = 0usize;
        let mut sent = 0usize;

        for oid in walk {
            let oid = oid.map_err(|e| RepoError::git(e, "revwalk"))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| RepoError::git(e, "find commit"))?;

            // Rename tracking has to see every commit, filtered or not.
            if !path.is_empty() {
                match self.path_change(&commit, &path)? {
                    PathChange::Untouched => continue,
                    PathChange::Changed => {}
                    PathChange::Renamed { old_path } => {
                        let before = commit
                            .parent_id(0)
                            .map(|id| id.to_string())
                            .unwrap_or_default();
                        renames.push(rpc::RenameDetails {
                            old_path: old_path.clone(),
                            new_path: path.clone(),
                            commit_sha_before: before,
                            commit_sha_after: commit.id().to_string(),
                        });
                        renames_pending = true;
                        path = old_path;
                    }
                }
            }

            if !filter.matches_time(commit.committer().when().seconds()) {
                continue;
            }
            if !filter.matches_committer(&commit.committer()) {
                continue;
            }

            matched += 1;
            if matched <= skip {
                continue;
            }

            let rename_details = if renames_pending {
                renames_pending = false;
                Some(renames.clone())
            } else {
                None
            };
            let message = rpc::ListCommitsResponse {
                commit: Some(to_rpc_commit(&commit)),
                rename_details,
            };
            if !sink(message) {
                return Ok(());
            }

            sent += 1;
            if filter.limit > 0 && sent >= filter.limit {
                break;
            }
        }

        Ok(())
    }

    /// Compare `path` in `commit` against its first parent.
    fn path_change(&self, commit: &git2::Commit<'_>, path: &str) -> Result<PathChange, RepoError> {
        let tree = commit.tree().map_err(|e| RepoError::git(e, "commit tree"))?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree().map_err(|e| RepoError::git(e, "parent tree"))?),
            Err(_) => None,
        };

        let entry_id = |t: &git2::Tree<'_>| t.get_path(Path::new(path)).ok().map(|e| e.id());
        let current = entry_id(&tree);
        let previous = parent_tree.as_ref().and_then(entry_id);

        match (previous, current) {
            (None, None) => Ok(PathChange::Untouched),
            (Some(a), Some(b)) if a == b => Ok(PathChange::Untouched),
            (None, Some(_)) => match self.renamed_from(parent_tree.as_ref(), &tree, path)? {
                Some(old_path) => Ok(PathChange::Renamed { old_path }),
                None => Ok(PathChange::Changed),
            },
            _ => Ok(PathChange::Changed),
        }
    }

    fn renamed_from(
        &self,
        old_tree: Option<&git2::Tree<'_>>,
        new_tree: &git2::Tree<'_>,
        path: &str,
    ) -> Result<Option<String>, RepoError> {
        let Some(old_tree) = old_tree else {
            return Ok(None);
        };

        let mut diff = self
            .repo
            .diff_tree_to_tree(Some(old_tree), Some(new_tree), None)
            .map_err(|e| RepoError::git(e, "diff"))?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))
            .map_err(|e| RepoError::git(e, "rename detection"))?;

        let target = Path::new(path);
        let old_path = diff
            .deltas()
            .filter(|d| d.status() == Delta::Renamed && d.new_file().path() == Some(target))
            .find_map(|d| d.old_file().path().map(|p| p.to_string_lossy().into_owned()));
        Ok(old_path)
    }

    /// Count commits unique to each side of `from`/`to`.
    ///
    /// Each side is capped at `max_count` when it is non-zero.
    pub fn divergence(
        &self,
        from: &str,
        to: &str,
        max_count: usize,
    ) -> Result<rpc::CommitDivergence, RepoError> {
        let from_id = self.resolve_commit(from)?.id();
        let to_id = self.resolve_commit(to)?.id();

        let ahead = self.count_exclusive(from_id, to_id, max_count)?;
        let behind = self.count_exclusive(to_id, from_id, max_count)?;

        Ok(rpc::CommitDivergence {
            ahead: saturating_i32(ahead),
            behind: saturating_i32(behind),
        })
    }

    fn count_exclusive(&self, tip: Oid, hide: Oid, max_count: usize) -> Result<usize, RepoError> {
        let mut walk = self
            .repo
            .revwalk()
            .map_err(|e| RepoError::git(e, "revwalk"))?;
        walk.push(tip).map_err(|e| RepoError::git(e, "revwalk"))?;
        walk.hide(hide).map_err(|e| RepoError::git(e, "revwalk"))?;

        let cap = if max_count == 0 { usize::MAX } else { max_count };
        let mut count = 0;
        for oid in walk.take(cap) {
            oid.map_err(|e| RepoError::git(e, "revwalk"))?;
            count += 1;
        }
        Ok(count)
    }

    /// Find the best common ancestor of two revisions.
    pub fn merge_base(&self, ref1: &str, ref2: &str) -> Result<String, RepoError> {
        let one = self.resolve_commit(ref1)?.id();
        let two = self.resolve_commit(ref2)?.id();

        match self.repo.merge_base(one, two) {
            Ok(oid) => Ok(oid.to_string()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Err(RepoError::NoMergeBase {
                ref1: ref1.to_string(),
                ref2: ref2.to_string(),
            }),
            Err(e) => Err(RepoError::git(e, "merge base")),
        }
    }
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn to_rpc_signature(signature: &git2::Signature<'_>) -> rpc::Signature {
    rpc::Signature {
        identity: Some(rpc::Identity {
            name: String::from_utf8_lossy(signature.name_bytes()).into_owned(),
            email: String::from_utf8_lossy(signature.email_bytes()).into_owned(),
        }),
        when: signature.when().seconds(),
    }
}

fn to_rpc_commit(commit: &git2::Commit<'_>) -> rpc::Commit {
    let message = String::from_utf8_lossy(commit.message_bytes()).into_owned();
    let title = message.lines().next().unwrap_or("").trim().to_string();
    rpc::Commit {
        sha: commit.id().to_string(),
        title,
        message,
        author: Some(to_rpc_signature(&commit.author())),
        committer: Some(to_rpc_signature(&commit.committer())),
    }
}
