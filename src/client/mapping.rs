//! client::mapping
//!
//! Conversions between domain requests/entities and wire messages.
//!
//! Outbound conversions are infallible. Inbound conversions validate what
//! the domain model requires (a non-empty sha, present signatures, a
//! representable timestamp) and return [`MappingError`] otherwise.

use chrono::DateTime;

use super::errors::MappingError;
use crate::core::types::{
    Commit, CommitDivergence, CommitDivergenceRequest, Identity, ReadParams, RenameDetails,
    Signature,
};
use crate::rpc::messages as rpc;

pub(crate) fn map_to_rpc_read_request(params: &ReadParams) -> rpc::ReadRequest {
    rpc::ReadRequest {
        repo_uid: params.repo_uid.clone(),
    }
}

pub(crate) fn map_to_rpc_divergence_request(
    request: &CommitDivergenceRequest,
) -> rpc::CommitDivergenceRequest {
    rpc::CommitDivergenceRequest {
        from: request.from.clone(),
        to: request.to.clone(),
    }
}

pub fn map_rpc_commit(commit: rpc::Commit) -> Result<Commit, MappingError> {
    if commit.sha.is_empty() {
        return Err(MappingError::EmptySha);
    }

    let author = commit
        .author
        .ok_or_else(|| MappingError::MissingSignature {
            sha: commit.sha.clone(),
            role: "author",
        })
        .and_then(map_rpc_signature)?;
    let committer = commit
        .committer
        .ok_or_else(|| MappingError::MissingSignature {
            sha: commit.sha.clone(),
            role: "committer",
        })
        .and_then(map_rpc_signature)?;

    Ok(Commit {
        sha: commit.sha,
        title: commit.title,
        message: commit.message,
        author,
        committer,
    })
}

pub fn map_rpc_signature(signature: rpc::Signature) -> Result<Signature, MappingError> {
    let identity = signature.identity.ok_or(MappingError::MissingIdentity)?;
    let when = DateTime::from_timestamp(signature.when, 0)
        .ok_or(MappingError::InvalidTimestamp(signature.when))?;

    Ok(Signature {
        identity: Identity {
            name: identity.name,
            email: identity.email,
        },
        when,
    })
}

pub fn map_rpc_rename_details(details: Vec<rpc::RenameDetails>) -> Vec<RenameDetails> {
    details
        .into_iter()
        .map(|d| RenameDetails {
            old_path: d.old_path,
            new_path: d.new_path,
            commit_sha_before: d.commit_sha_before,
            commit_sha_after: d.commit_sha_after,
        })
        .collect()
}

pub fn map_rpc_divergence(
    divergence: rpc::CommitDivergence,
) -> Result<CommitDivergence, MappingError> {
    let count = |n: i32| u32::try_from(n).map_err(|_| MappingError::NegativeCount(n));
    Ok(CommitDivergence {
        ahead: count(divergence.ahead)?,
        behind: count(divergence.behind)?,
    })
}
