//! server
//!
//! In-process [`RepoService`] backed by repositories on local disk.
//!
//! # Architecture
//!
//! [`LocalRepoService`] resolves each request's repository uid under a
//! storage root and runs the git work on tokio's blocking pool. The commit
//! walk for `list_commits` produces messages on that blocking task and
//! hands them to the caller through a bounded channel, so a slow or
//! departed consumer applies backpressure or stops the walk.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gitread::client::{CallContext, Client, MergeBaseParams};
//! use gitread::core::types::ReadParams;
//! use gitread::server::LocalRepoService;
//!
//! # tokio_test::block_on(async {
//! let client = Client::new(Arc::new(LocalRepoService::new("/srv/git")));
//! let sha = client
//!     .merge_base(
//!         &CallContext::new(),
//!         &MergeBaseParams {
//!             read: ReadParams::new("team/app"),
//!             ref1: "main".to_string(),
//!             ref2: "feature".to_string(),
//!         },
//!     )
//!     .await?;
//! println!("{}", sha);
//! # Ok::<(), gitread::client::ClientError>(())
//! # });
//! ```

mod repo;

pub use repo::{resolve_repo_path, CommitFilter, Repo, RepoError};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::rpc::messages::{
    GetCommitDivergencesRequest, GetCommitDivergencesResponse, GetCommitRequest,
    GetCommitResponse, ListCommitsRequest, ListCommitsResponse, MergeBaseRequest,
    MergeBaseResponse, ReadRequest,
};
use crate::rpc::{CommitStream, RepoService, Status};

/// Messages buffered between the commit walk and the consumer.
const STREAM_BUFFER: usize = 64;

/// Repository service over a directory of git repositories.
#[derive(Debug, Clone)]
pub struct LocalRepoService {
    git_root: PathBuf,
}

impl LocalRepoService {
    pub fn new(git_root: impl Into<PathBuf>) -> Self {
        Self {
            git_root: git_root.into(),
        }
    }

    pub fn git_root(&self) -> &Path {
        &self.git_root
    }

    /// Run `f` against the request's repository on the blocking pool.
    async fn with_repo<T, F>(&self, base: Option<ReadRequest>, f: F) -> Result<T, Status>
    where
        T: Send + 'static,
        F: FnOnce(&Repo) -> Result<T, RepoError> + Send + 'static,
    {
        let uid = repo_uid(base)?;
        let root = self.git_root.clone();
        tokio::task::spawn_blocking(move || {
            let repo = Repo::open(&root, &uid)?;
            f(&repo)
        })
        .await
        .map_err(|e| Status::internal(format!("repository task failed: {}", e)))?
        .map_err(Status::from)
    }
}

fn repo_uid(base: Option<ReadRequest>) -> Result<String, Status> {
    let base = base.ok_or_else(|| Status::invalid_argument("request has no base"))?;
    if base.repo_uid.is_empty() {
        return Err(Status::invalid_argument("repo_uid is required"));
    }
    Ok(base.repo_uid)
}

fn non_negative(field: &str, value: i32) -> Result<usize, Status> {
    usize::try_from(value)
        .map_err(|_| Status::invalid_argument(format!("{} must not be negative", field)))
}

type Sender = mpsc::Sender<Result<ListCommitsResponse, Status>>;

/// Run `produce` on the blocking pool and stream what it sends.
///
/// If `produce` panics the stream ends with an internal error rather than
/// a clean end of stream.
fn stream_blocking<F>(produce: F) -> CommitStream
where
    F: FnOnce(&Sender) + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let watcher = tx.clone();
    let work = tokio::task::spawn_blocking(move || produce(&tx));
    tokio::spawn(async move {
        if let Err(err) = work.await {
            let _ = watcher
                .send(Err(Status::internal(format!("commit walk failed: {}", err))))
                .await;
        }
    });
    Box::pin(ReceiverStream::new(rx))
}

#[async_trait]
impl RepoService for LocalRepoService {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get_commit(&self, request: GetCommitRequest) -> Result<GetCommitResponse, Status> {
        let sha = request.sha;
        let commit = self.with_repo(request.base, move |repo| repo.commit(&sha)).await?;
        Ok(GetCommitResponse {
            commit: Some(commit),
        })
    }

    async fn list_commits(&self, request: ListCommitsRequest) -> Result<CommitStream, Status> {
        let uid = repo_uid(request.base)?;
        let filter = CommitFilter {
            git_ref: request.git_ref,
            after: request.after,
            page: non_negative("page", request.page)?,
            limit: non_negative("limit", request.limit)?,
            path: request.path,
            since: request.since,
            until: request.until,
            committer: request.committer,
        };
        let root = self.git_root.clone();

        Ok(stream_blocking(move |tx| {
            let result = Repo::open(&root, &uid).and_then(|repo| {
                repo.walk_commits(&filter, |message| tx.blocking_send(Ok(message)).is_ok())
            });
            match result {
                Ok(()) => debug!(repo = %uid, "commit walk finished"),
                Err(err) => {
                    // The receiver may already be gone; nothing left to tell.
                    let _ = tx.blocking_send(Err(Status::from(err)));
                }
            }
        }))
    }

    async fn get_commit_divergences(
        &self,
        request: GetCommitDivergencesRequest,
    ) -> Result<GetCommitDivergencesResponse, Status> {
        let max_count = non_negative("max_count", request.max_count)?;
        let pairs = request.requests;

        let divergences = self
            .with_repo(request.base, move |repo| {
                pairs
                    .iter()
                    .map(|pair| repo.divergence(&pair.from, &pair.to, max_count).map(Some))
                    .collect::<Result<Vec<_>, _>>()
            })
            .await?;

        Ok(GetCommitDivergencesResponse {
            divergences: Some(divergences),
        })
    }

    async fn merge_base(&self, request: MergeBaseRequest) -> Result<MergeBaseResponse, Status> {
        let (ref1, ref2) = (request.ref1, request.ref2);
        let merge_base_sha = self
            .with_repo(request.base, move |repo| repo.merge_base(&ref1, &ref2))
            .await?;
        Ok(MergeBaseResponse { merge_base_sha })
    }
}
