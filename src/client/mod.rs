//! client
//!
//! Read client for the repository service.
//!
//! # Architecture
//!
//! [`Client`] turns domain requests into wire requests, issues them through
//! an injected [`RepoService`], and maps the answers back into domain types.
//! It validates requests before anything is sent, checks every response
//! against the message contract, and never retries.
//!
//! Every call takes a [`CallContext`]; when it is canceled or its deadline
//! passes the call stops (mid-stream for `list_commits`) and returns
//! [`ClientError::Canceled`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gitread::client::{CallContext, Client, GetCommitDivergencesParams};
//! use gitread::core::types::{CommitDivergenceRequest, ReadParams};
//! use gitread::rpc::messages::{CommitDivergence, GetCommitDivergencesResponse};
//! use gitread::rpc::mock::MockRepoService;
//!
//! # tokio_test::block_on(async {
//! let service = MockRepoService::new().with_divergences(GetCommitDivergencesResponse {
//!     divergences: Some(vec![Some(CommitDivergence { ahead: 3, behind: 0 })]),
//! });
//! let client = Client::new(Arc::new(service));
//!
//! let divergences = client
//!     .get_commit_divergences(
//!         &CallContext::new(),
//!         &GetCommitDivergencesParams {
//!             read: ReadParams::new("repo"),
//!             max_count: 0,
//!             requests: vec![CommitDivergenceRequest::new("main", "feature")],
//!         },
//!     )
//!     .await
//!     .unwrap();
//!
//! assert_eq!(divergences[0].ahead, 3);
//! assert_eq!(divergences[0].behind, 0);
//! # });
//! ```

mod context;
mod errors;
pub mod mapping;

pub use context::CallContext;
pub use errors::{ClientError, ErrorKind, MappingError, Rejection};

use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::core::types::{
    Commit, CommitDivergence, CommitDivergenceRequest, ReadParams, RenameDetails,
};
use crate::rpc::messages as rpc;
use crate::rpc::RepoService;

/// Parameters for [`Client::get_commit`].
#[derive(Debug, Clone, Default)]
pub struct GetCommitParams {
    pub read: ReadParams,
    /// Commit sha, or any revision the service can resolve.
    pub sha: String,
}

/// Parameters for [`Client::list_commits`].
#[derive(Debug, Clone, Default)]
pub struct ListCommitsParams {
    pub read: ReadParams,
    /// Branch, tag or commit sha to start from.
    pub git_ref: String,
    /// If set, history stops at this ref (exclusive).
    pub after: String,
    /// 1-based page; 0 is treated as the first page.
    pub page: i32,
    /// Page size; 0 means no limit.
    pub limit: i32,
    /// Only commits touching this path.
    pub path: String,
    /// Only commits committed at or after this Unix time (0 = unbounded).
    pub since: i64,
    /// Only commits committed at or before this Unix time (0 = unbounded).
    pub until: i64,
    /// Only commits whose committer name or email contains this text.
    pub committer: String,
}

/// Result of [`Client::list_commits`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListCommitsOutput {
    /// Commits in the order the server delivered them.
    pub commits: Vec<Commit>,
    /// Renames of the filtered path, from the last message that carried any.
    pub rename_details: Vec<RenameDetails>,
}

/// Parameters for [`Client::get_commit_divergences`].
#[derive(Debug, Clone, Default)]
pub struct GetCommitDivergencesParams {
    pub read: ReadParams,
    /// Upper bound on commits counted per side of each pair (0 = unbounded).
    pub max_count: i32,
    pub requests: Vec<CommitDivergenceRequest>,
}

/// Parameters for [`Client::merge_base`].
#[derive(Debug, Clone, Default)]
pub struct MergeBaseParams {
    pub read: ReadParams,
    pub ref1: String,
    pub ref2: String,
}

/// Client for the repository read service.
#[derive(Clone)]
pub struct Client {
    service: Arc<dyn RepoService>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("service", &self.service.name())
            .finish()
    }
}

impl Client {
    pub fn new(service: Arc<dyn RepoService>) -> Self {
        Self { service }
    }

    /// Get a single commit.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the repository or sha is empty
    /// - `Communication` / `NotFound` from the service
    /// - `ProtocolViolation` if the response has no commit
    /// - `Mapping` if the commit cannot be converted
    pub async fn get_commit(
        &self,
        ctx: &CallContext,
        params: &GetCommitParams,
    ) -> Result<Commit, ClientError> {
        validate_read_params(&params.read)?;
        require("sha", &params.sha)?;

        let request = rpc::GetCommitRequest {
            base: Some(mapping::map_to_rpc_read_request(&params.read)),
            sha: params.sha.clone(),
        };
        let response = ctx
            .run(self.service.get_commit(request))
            .await?
            .map_err(|status| ClientError::from_status(status, "failed to get commit"))?;

        let commit = response.commit.ok_or_else(|| {
            ClientError::ProtocolViolation("get commit response has no commit".to_string())
        })?;

        Ok(mapping::map_rpc_commit(commit)?)
    }

    /// List commits, consuming the server stream to its end.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty repository or ref, or negative paging
    /// - `Communication` if opening or reading the stream fails
    /// - `ProtocolViolation` if a message has no commit
    /// - `Mapping` if a commit cannot be converted
    /// - `Canceled` if `ctx` finishes before the stream ends
    pub async fn list_commits(
        &self,
        ctx: &CallContext,
        params: &ListCommitsParams,
    ) -> Result<ListCommitsOutput, ClientError> {
        validate_read_params(&params.read)?;
        require("git_ref", &params.git_ref)?;
        if params.page < 0 {
            return Err(ClientError::InvalidArgument(format!(
                "page must not be negative, got {}",
                params.page
            )));
        }
        if params.limit < 0 {
            return Err(ClientError::InvalidArgument(format!(
                "limit must not be negative, got {}",
                params.limit
            )));
        }

        let request = rpc::ListCommitsRequest {
            base: Some(mapping::map_to_rpc_read_request(&params.read)),
            git_ref: params.git_ref.clone(),
            after: params.after.clone(),
            page: params.page,
            limit: params.limit,
            path: params.path.clone(),
            since: params.since,
            until: params.until,
            committer: params.committer.clone(),
        };
        let mut stream = ctx
            .run(self.service.list_commits(request))
            .await?
            .map_err(|status| {
                ClientError::from_status(status, "failed to start stream for commits")
            })?;

        // Not sized from `limit`: it may be unbounded.
        let mut output = ListCommitsOutput {
            commits: Vec::with_capacity(16),
            rename_details: Vec::new(),
        };

        loop {
            let next = match ctx.run(stream.next()).await {
                Ok(next) => next,
                Err(err) => {
                    debug!(
                        received = output.commits.len(),
                        "commit stream canceled by caller"
                    );
                    return Err(err);
                }
            };

            let message = match next {
                None => {
                    debug!(received = output.commits.len(), "received end of stream");
                    break;
                }
                Some(Err(status)) => {
                    return Err(ClientError::from_status(
                        status,
                        "received unexpected error from server",
                    ))
                }
                Some(Ok(message)) => message,
            };

            let commit = message.commit.ok_or_else(|| {
                ClientError::ProtocolViolation("expected commit message".to_string())
            })?;
            output.commits.push(mapping::map_rpc_commit(commit)?);

            if let Some(details) = message.rename_details {
                output.rename_details = mapping::map_rpc_rename_details(details);
            }
        }

        Ok(output)
    }

    /// Count ahead/behind commits for each pair in `params.requests`.
    ///
    /// The result has one entry per request, in request order.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty repository, a negative `max_count`
    ///   or a pair with an empty ref
    /// - `Communication` / `NotFound` from the service
    /// - `ProtocolViolation` if the list is absent, has a nil entry, or its
    ///   length differs from the request
    pub async fn get_commit_divergences(
        &self,
        ctx: &CallContext,
        params: &GetCommitDivergencesParams,
    ) -> Result<Vec<CommitDivergence>, ClientError> {
        validate_read_params(&params.read)?;
        if params.max_count < 0 {
            return Err(ClientError::InvalidArgument(format!(
                "max_count must not be negative, got {}",
                params.max_count
            )));
        }
        for (i, pair) in params.requests.iter().enumerate() {
            if pair.from.is_empty() || pair.to.is_empty() {
                return Err(ClientError::InvalidArgument(format!(
                    "divergence request {} has an empty ref",
                    i
                )));
            }
        }

        let request = rpc::GetCommitDivergencesRequest {
            base: Some(mapping::map_to_rpc_read_request(&params.read)),
            max_count: params.max_count,
            requests: params
                .requests
                .iter()
                .map(mapping::map_to_rpc_divergence_request)
                .collect(),
        };
        let response = ctx
            .run(self.service.get_commit_divergences(request))
            .await?
            .map_err(|status| {
                ClientError::from_status(status, "failed to get diverging commits from server")
            })?;

        let divergences = response.divergences.ok_or_else(|| {
            ClientError::ProtocolViolation("server response divergences were nil".to_string())
        })?;
        if divergences.len() != params.requests.len() {
            return Err(ClientError::ProtocolViolation(format!(
                "server returned {} divergences for {} requests",
                divergences.len(),
                params.requests.len()
            )));
        }

        divergences
            .into_iter()
            .map(|d| {
                let d = d.ok_or_else(|| {
                    ClientError::ProtocolViolation("server returned nil divergence".to_string())
                })?;
                Ok(mapping::map_rpc_divergence(d)?)
            })
            .collect()
    }

    /// Find the merge base of two refs.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the repository or either ref is empty
    /// - `NotFound` if the refs have no common ancestor
    /// - `Communication` from the service
    pub async fn merge_base(
        &self,
        ctx: &CallContext,
        params: &MergeBaseParams,
    ) -> Result<String, ClientError> {
        validate_read_params(&params.read)?;
        require("ref1", &params.ref1)?;
        require("ref2", &params.ref2)?;

        let request = rpc::MergeBaseRequest {
            base: Some(mapping::map_to_rpc_read_request(&params.read)),
            ref1: params.ref1.clone(),
            ref2: params.ref2.clone(),
        };
        let response = ctx
            .run(self.service.merge_base(request))
            .await?
            .map_err(|status| {
                ClientError::from_status(status, "failed to get merge base commit")
            })?;

        if response.merge_base_sha.is_empty() {
            return Err(ClientError::NotFound(format!(
                "no merge base between '{}' and '{}'",
                params.ref1, params.ref2
            )));
        }

        Ok(response.merge_base_sha)
    }
}

fn validate_read_params(read: &ReadParams) -> Result<(), ClientError> {
    require("repo_uid", &read.repo_uid)
}

fn require(field: &str, value: &str) -> Result<(), ClientError> {
    if value.is_empty() {
        return Err(ClientError::InvalidArgument(format!("{} is required", field)));
    }
    Ok(())
}
