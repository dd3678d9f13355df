//! rpc::service
//!
//! The `RepoService` trait: the read operations a repository service exposes.
//!
//! # Design
//!
//! The trait is async because every call crosses a process boundary in
//! production. The read client is written against this trait only, so the
//! transport (generated stubs, an in-process implementation, a mock) can be
//! swapped without touching the client or mapper.
//!
//! `list_commits` returns a stream that ends cleanly with `None`. Any
//! `Some(Err(_))` item is a transport failure.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::messages::{
    GetCommitDivergencesRequest, GetCommitDivergencesResponse, GetCommitRequest,
    GetCommitResponse, ListCommitsRequest, ListCommitsResponse, MergeBaseRequest,
    MergeBaseResponse,
};
use super::status::Status;

/// Stream of `ListCommits` messages. Finite and not restartable.
pub type CommitStream = BoxStream<'static, Result<ListCommitsResponse, Status>>;

/// Read operations of the repository service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one instance can serve
/// concurrent requests.
#[async_trait]
pub trait RepoService: Send + Sync {
    /// Get the service name (e.g. "local", "mock").
    fn name(&self) -> &'static str;

    /// Look up a single commit.
    async fn get_commit(&self, request: GetCommitRequest) -> Result<GetCommitResponse, Status>;

    /// Open a stream of commits matching the request.
    async fn list_commits(&self, request: ListCommitsRequest) -> Result<CommitStream, Status>;

    /// Count ahead/behind commits for each requested pair, in request order.
    async fn get_commit_divergences(
        &self,
        request: GetCommitDivergencesRequest,
    ) -> Result<GetCommitDivergencesResponse, Status>;

    /// Find the best common ancestor of two refs.
    async fn merge_base(&self, request: MergeBaseRequest) -> Result<MergeBaseResponse, Status>;
}
