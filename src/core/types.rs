//! core::types
//!
//! Domain types shared by the read client, the diff parser and the cache.
//!
//! # Types
//!
//! - [`Commit`] - A commit with its author and committer signatures
//! - [`Signature`] / [`Identity`] - Who did something, and when
//! - [`RenameDetails`] - A path rename detected along a filtered history query
//! - [`CommitDivergence`] - Ahead/behind counts for one pair of refs
//! - [`DiffFileHeader`] / [`HunkHeader`] / [`DiffFileHunkHeaders`] - Diff structure
//! - [`ReadParams`] - Repository locator embedded in every read request
//!
//! # JSON Shape
//!
//! `Commit` and `Signature` serialize to the shape API consumers expect:
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use gitread::core::types::{Commit, Identity, Signature};
//!
//! let sig = Signature {
//!     identity: Identity::new("Jane", "jane@example.com"),
//!     when: Utc.timestamp_opt(0, 0).unwrap(),
//! };
//! let commit = Commit {
//!     sha: "abc123".to_string(),
//!     title: "Initial commit".to_string(),
//!     message: String::new(),
//!     author: sig.clone(),
//!     committer: sig,
//! };
//!
//! let json = serde_json::to_value(&commit).unwrap();
//! assert_eq!(json["author"]["identity"]["name"], "Jane");
//! assert!(json.get("message").is_none());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The name and email of a person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Create an identity from a name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// An identity paired with the time it authored or committed something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub identity: Identity,
    pub when: DateTime<Utc>,
}

/// A commit as returned by the read service.
///
/// `sha` is never empty for a commit produced by the mapper; an empty sha
/// on the wire is rejected before a `Commit` is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub author: Signature,
    pub committer: Signature,
}

/// A rename of the filtered path detected while listing commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameDetails {
    pub old_path: String,
    pub new_path: String,
    /// The commit before the rename (parent of `commit_sha_after`).
    pub commit_sha_before: String,
    /// The commit that performed the rename.
    pub commit_sha_after: String,
}

/// Refs for which the diverging commits should be counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDivergenceRequest {
    /// The ref from which the counting of the diverging commits starts.
    pub from: String,
    /// The ref at which the counting of the diverging commits ends.
    pub to: String,
}

impl CommitDivergenceRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Count of diverging commits between two refs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDivergence {
    /// Commits the `from` ref is ahead of the `to` ref.
    pub ahead: u32,
    /// Commits the `from` ref is behind the `to` ref.
    pub behind: u32,
}

/// Old and new file names of one file entry in a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFileHeader {
    pub old_file_name: String,
    pub new_file_name: String,
}

/// Line ranges of one hunk (`@@ -old_line,old_span +new_line,new_span @@ text`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkHeader {
    pub old_line: u32,
    pub old_span: u32,
    pub new_line: u32,
    pub new_span: u32,
    /// Section heading git prints after the closing `@@`, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.old_line, self.old_span, self.new_line, self.new_span
        )?;
        if !self.text.is_empty() {
            write!(f, " {}", self.text)?;
        }
        Ok(())
    }
}

/// A file header with the hunk headers that followed it.
///
/// `hunk_headers` is empty for entries without content changes
/// (e.g. a pure rename or a mode change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFileHunkHeaders {
    pub file_header: DiffFileHeader,
    pub hunk_headers: Vec<HunkHeader>,
}

/// Locator shared by all read requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadParams {
    /// Repository uid, relative to the service's git root.
    pub repo_uid: String,
}

impl ReadParams {
    pub fn new(repo_uid: impl Into<String>) -> Self {
        Self {
            repo_uid: repo_uid.into(),
        }
    }
}
