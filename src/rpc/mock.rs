//! rpc::mock
//!
//! Mock read service for deterministic testing.
//!
//! # Design
//!
//! The mock answers from canned data: commits by sha, a scripted
//! `ListCommits` stream, a divergence response and merge bases by ref pair.
//! Each operation can be configured to fail, and every call is recorded so
//! tests can assert on the wire requests the client produced.
//!
//! # Example
//!
//! ```
//! use gitread::rpc::mock::{MockRepoService, StreamItem};
//! use gitread::rpc::messages::{ListCommitsRequest, ListCommitsResponse};
//! use gitread::rpc::RepoService;
//! use futures::StreamExt;
//!
//! # tokio_test::block_on(async {
//! let service = MockRepoService::new()
//!     .with_stream(vec![StreamItem::Message(ListCommitsResponse::default())]);
//!
//! let mut stream = service.list_commits(ListCommitsRequest::default()).await.unwrap();
//! assert!(stream.next().await.unwrap().is_ok());
//! assert!(stream.next().await.is_none());
//! # });
//! ```

use async_trait::async_trait;
use futures::stream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::messages::{
    Commit, CommitDivergence, GetCommitDivergencesRequest, GetCommitDivergencesResponse,
    GetCommitRequest, GetCommitResponse, ListCommitsRequest, ListCommitsResponse,
    MergeBaseRequest, MergeBaseResponse,
};
use super::service::{CommitStream, RepoService};
use super::status::Status;

/// Mock read service for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockRepoService {
    inner: Arc<Mutex<MockRepoServiceInner>>,
}

#[derive(Debug, Default)]
struct MockRepoServiceInner {
    /// Commits returned by `get_commit`, by sha.
    commits: HashMap<String, Commit>,
    /// Items yielded, in order, by every `list_commits` stream.
    stream: Vec<StreamItem>,
    /// Response for `get_commit_divergences`; zero counts when unset.
    divergences: Option<GetCommitDivergencesResponse>,
    /// Merge bases by (ref1, ref2).
    merge_bases: HashMap<(String, String), String>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// One scripted item of a `list_commits` stream.
#[derive(Debug, Clone)]
pub enum StreamItem {
    /// Yield a message.
    Message(ListCommitsResponse),
    /// Yield a transport error.
    Error(Status),
    /// Never yield again (the stream hangs until dropped).
    Stall,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetCommit(Status),
    /// Fail opening the `list_commits` stream (not a mid-stream error).
    ListCommits(Status),
    GetCommitDivergences(Status),
    MergeBase(Status),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOperation {
    GetCommit(GetCommitRequest),
    ListCommits(ListCommitsRequest),
    GetCommitDivergences(GetCommitDivergencesRequest),
    MergeBase(MergeBaseRequest),
}

impl MockRepoService {
    /// Create a mock with no data.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRepoServiceInner::default())),
        }
    }

    /// Add a commit answerable by `get_commit`.
    pub fn with_commit(self, commit: Commit) -> Self {
        self.state().commits.insert(commit.sha.clone(), commit);
        self
    }

    /// Script the items every `list_commits` stream yields.
    pub fn with_stream(self, items: Vec<StreamItem>) -> Self {
        self.state().stream = items;
        self
    }

    /// Set the raw `get_commit_divergences` response.
    pub fn with_divergences(self, response: GetCommitDivergencesResponse) -> Self {
        self.state().divergences = Some(response);
        self
    }

    /// Register the merge base of `ref1` and `ref2`.
    pub fn with_merge_base(self, ref1: &str, ref2: &str, sha: &str) -> Self {
        self.state()
            .merge_bases
            .insert((ref1.to_string(), ref2.to_string()), sha.to_string());
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockRepoServiceInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Option<Status> {
        match &self.state().fail_on {
            Some(FailOn::GetCommit(s)) if expected == "get_commit" => Some(s.clone()),
            Some(FailOn::ListCommits(s)) if expected == "list_commits" => Some(s.clone()),
            Some(FailOn::GetCommitDivergences(s)) if expected == "get_commit_divergences" => {
                Some(s.clone())
            }
            Some(FailOn::MergeBase(s)) if expected == "merge_base" => Some(s.clone()),
            _ => None,
        }
    }
}

impl Default for MockRepoService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoService for MockRepoService {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_commit(&self, request: GetCommitRequest) -> Result<GetCommitResponse, Status> {
        self.record(MockOperation::GetCommit(request.clone()));

        if let Some(status) = self.check_fail("get_commit") {
            return Err(status);
        }

        let commit = self
            .state()
            .commits
            .get(&request.sha)
            .cloned()
            .ok_or_else(|| Status::not_found(format!("commit '{}'", request.sha)))?;

        Ok(GetCommitResponse {
            commit: Some(commit),
        })
    }

    async fn list_commits(&self, request: ListCommitsRequest) -> Result<CommitStream, Status> {
        self.record(MockOperation::ListCommits(request));

        if let Some(status) = self.check_fail("list_commits") {
            return Err(status);
        }

        let items = self.state().stream.clone();
        let stream = stream::unfold(items.into_iter(), |mut items| async move {
            match items.next()? {
                StreamItem::Message(message) => Some((Ok(message), items)),
                StreamItem::Error(status) => Some((Err(status), items)),
                StreamItem::Stall => {
                    futures::future::pending::<()>().await;
                    None
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn get_commit_divergences(
        &self,
        request: GetCommitDivergencesRequest,
    ) -> Result<GetCommitDivergencesResponse, Status> {
        self.record(MockOperation::GetCommitDivergences(request.clone()));

        if let Some(status) = self.check_fail("get_commit_divergences") {
            return Err(status);
        }

        if let Some(response) = self.state().divergences.clone() {
            return Ok(response);
        }

        Ok(GetCommitDivergencesResponse {
            divergences: Some(
                request
                    .requests
                    .iter()
                    .map(|_| Some(CommitDivergence::default()))
                    .collect(),
            ),
        })
    }

    async fn merge_base(&self, request: MergeBaseRequest) -> Result<MergeBaseResponse, Status> {
        self.record(MockOperation::MergeBase(request.clone()));

        if let Some(status) = self.check_fail("merge_base") {
            return Err(status);
        }

        let merge_base_sha = self
            .state()
            .merge_bases
            .get(&(request.ref1, request.ref2))
            .cloned()
            .unwrap_or_default();

        Ok(MergeBaseResponse { merge_base_sha })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::Code;
    use futures::StreamExt;

    fn commit(sha: &str) -> Commit {
        Commit {
            sha: sha.to_string(),
            title: "title".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn get_commit_returns_registered() {
        let service = MockRepoService::new().with_commit(commit("abc"));

        let response = service
            .get_commit(GetCommitRequest {
                base: None,
                sha: "abc".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.commit.unwrap().sha, "abc");
    }

    #[tokio::test]
    async fn get_commit_unknown_is_not_found() {
        let service = MockRepoService::new();

        let result = service.get_commit(GetCommitRequest::default()).await;
        assert_eq!(result.unwrap_err().code(), Code::NotFound);
    }

    #[tokio::test]
    async fn stream_yields_scripted_items_in_order() {
        let service = MockRepoService::new().with_stream(vec![
            StreamItem::Message(ListCommitsResponse {
                commit: Some(commit("a")),
                rename_details: None,
            }),
            StreamItem::Error(Status::unavailable("reset")),
        ]);

        let mut stream = service
            .list_commits(ListCommitsRequest::default())
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.commit.unwrap().sha, "a");
        assert_eq!(
            stream.next().await.unwrap().unwrap_err().code(),
            Code::Unavailable
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn default_divergences_match_request_length() {
        let service = MockRepoService::new();

        let response = service
            .get_commit_divergences(GetCommitDivergencesRequest {
                base: None,
                max_count: 0,
                requests: vec![Default::default(), Default::default()],
            })
            .await
            .unwrap();

        assert_eq!(response.divergences.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fail_on_and_clear() {
        let service =
            MockRepoService::new().fail_on(FailOn::MergeBase(Status::internal("boom")));

        assert!(service.merge_base(MergeBaseRequest::default()).await.is_err());

        service.clear_fail_on();
        let response = service.merge_base(MergeBaseRequest::default()).await.unwrap();
        assert!(response.merge_base_sha.is_empty());
    }

    #[tokio::test]
    async fn operations_are_recorded() {
        let service = MockRepoService::new().with_merge_base("main", "feature", "base");

        service
            .merge_base(MergeBaseRequest {
                base: None,
                ref1: "main".to_string(),
                ref2: "feature".to_string(),
            })
            .await
            .unwrap();

        let ops = service.operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], MockOperation::MergeBase(r) if r.ref1 == "main"));
    }
}
