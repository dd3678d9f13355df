//! rpc::messages
//!
//! Wire messages exchanged with the repository read service.
//!
//! These mirror the shape of generated RPC stubs: nested messages are
//! optional, and list fields that the contract requires are optional too so
//! that a transport which drops them can be detected instead of being read as
//! "empty". Nothing here is validated; the client mapper does that.

/// Repository locator carried by every read request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadRequest {
    pub repo_uid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub identity: Option<Identity>,
    /// Unix timestamp in seconds.
    pub when: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    pub title: String,
    pub message: String,
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCommitRequest {
    pub base: Option<ReadRequest>,
    pub sha: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCommitResponse {
    pub commit: Option<Commit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCommitsRequest {
    pub base: Option<ReadRequest>,
    pub git_ref: String,
    pub after: String,
    pub page: i32,
    pub limit: i32,
    pub path: String,
    /// Unix seconds, 0 when unset.
    pub since: i64,
    /// Unix seconds, 0 when unset.
    pub until: i64,
    pub committer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameDetails {
    pub old_path: String,
    pub new_path: String,
    pub commit_sha_before: String,
    pub commit_sha_after: String,
}

/// One message of the `ListCommits` stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCommitsResponse {
    pub commit: Option<Commit>,
    /// All renames detected so far for the query, when this message adds one.
    pub rename_details: Option<Vec<RenameDetails>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitDivergenceRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCommitDivergencesRequest {
    pub base: Option<ReadRequest>,
    pub max_count: i32,
    pub requests: Vec<CommitDivergenceRequest>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitDivergence {
    pub ahead: i32,
    pub behind: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCommitDivergencesResponse {
    pub divergences: Option<Vec<Option<CommitDivergence>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeBaseRequest {
    pub base: Option<ReadRequest>,
    pub ref1: String,
    pub ref2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeBaseResponse {
    /// Empty when the refs share no history.
    pub merge_base_sha: String,
}
