//! history
//!
//! Last-commit lookup: the most recent commit touching a path, as seen
//! from a ref.
//!
//! [`Client`] answers it with a one-commit, path-filtered `ListCommits`.
//! [`CachedLastCommitFinder`] puts a [`LastCommitCache`] in front of any
//! finder. Cache failures degrade to a lookup; they never fail the call.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{LastCommitCache, LastCommitKey};
use crate::client::{CallContext, Client, ClientError, ListCommitsParams};
use crate::core::types::{Commit, ReadParams};

/// Finds the last commit that touched a path.
#[async_trait]
pub trait LastCommitFinder: Send + Sync {
    /// Find the most recent commit reachable from `git_ref` that changed
    /// `path`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such commit exists, otherwise whatever the lookup
    /// failed with.
    async fn find_last_commit(
        &self,
        ctx: &CallContext,
        read: &ReadParams,
        git_ref: &str,
        path: &str,
    ) -> Result<Commit, ClientError>;
}

#[async_trait]
impl LastCommitFinder for Client {
    async fn find_last_commit(
        &self,
        ctx: &CallContext,
        read: &ReadParams,
        git_ref: &str,
        path: &str,
    ) -> Result<Commit, ClientError> {
        let params = ListCommitsParams {
            read: read.clone(),
            git_ref: git_ref.to_string(),
            page: 1,
            limit: 1,
            path: path.to_string(),
            ..Default::default()
        };

        self.list_commits(ctx, &params)
            .await?
            .commits
            .into_iter()
            .next()
            .ok_or_else(|| {
                ClientError::NotFound(format!("no commit touches '{}' in '{}'", path, git_ref))
            })
    }
}

/// A [`LastCommitFinder`] that consults a cache first.
pub struct CachedLastCommitFinder<F> {
    inner: F,
    cache: Arc<dyn LastCommitCache>,
    ttl: Duration,
}

impl<F: LastCommitFinder> CachedLastCommitFinder<F> {
    pub fn new(inner: F, cache: Arc<dyn LastCommitCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl<F: LastCommitFinder> LastCommitFinder for CachedLastCommitFinder<F> {
    async fn find_last_commit(
        &self,
        ctx: &CallContext,
        read: &ReadParams,
        git_ref: &str,
        path: &str,
    ) -> Result<Commit, ClientError> {
        let key = LastCommitKey::new(read.repo_uid.as_str(), git_ref, path);

        match self.cache.get(&key).await {
            Ok(Some(commit)) => {
                debug!(backend = self.cache.name(), repo = %key.repo_uid, path, "last commit cache hit");
                return Ok(commit);
            }
            Ok(None) => {
                debug!(backend = self.cache.name(), repo = %key.repo_uid, path, "last commit cache miss");
            }
            Err(err) => {
                warn!(backend = self.cache.name(), error = %err, "last commit cache read failed");
            }
        }

        let commit = self.inner.find_last_commit(ctx, read, git_ref, path).await?;

        if let Err(err) = self.cache.set(&key, &commit, self.ttl).await {
            warn!(backend = self.cache.name(), error = %err, "last commit cache write failed");
        }

        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, DisabledCache, LocalCache};
    use crate::client::ErrorKind;
    use crate::core::types::{Identity, Signature};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn commit(sha: &str) -> Commit {
        let signature = Signature {
            identity: Identity::new("Test User", "test@example.com"),
            when: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        Commit {
            sha: sha.to_string(),
            title: "title".to_string(),
            message: String::new(),
            author: signature.clone(),
            committer: signature,
        }
    }

    /// Finder that counts lookups.
    #[derive(Default)]
    struct CountingFinder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LastCommitFinder for CountingFinder {
        async fn find_last_commit(
            &self,
            _ctx: &CallContext,
            _read: &ReadParams,
            _git_ref: &str,
            path: &str,
        ) -> Result<Commit, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if path == "missing" {
                return Err(ClientError::NotFound(path.to_string()));
            }
            Ok(commit("abc"))
        }
    }

    /// Cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl LastCommitCache for BrokenCache {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &LastCommitKey) -> Result<Option<Commit>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn set(
            &self,
            _key: &LastCommitKey,
            _commit: &Commit,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    async fn lookup<F: LastCommitFinder>(finder: &F, path: &str) -> Result<Commit, ClientError> {
        finder
            .find_last_commit(&CallContext::new(), &ReadParams::new("repo"), "main", path)
            .await
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let finder = CachedLastCommitFinder::new(
            CountingFinder::default(),
            Arc::new(LocalCache::new(10)),
            Duration::from_secs(60),
        );

        assert_eq!(lookup(&finder, "a.txt").await.unwrap().sha, "abc");
        assert_eq!(lookup(&finder, "a.txt").await.unwrap().sha, "abc");

        assert_eq!(finder.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_cache_always_looks_up() {
        let finder = CachedLastCommitFinder::new(
            CountingFinder::default(),
            Arc::new(DisabledCache),
            Duration::from_secs(60),
        );

        lookup(&finder, "a.txt").await.unwrap();
        lookup(&finder, "a.txt").await.unwrap();

        assert_eq!(finder.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broken_cache_degrades_to_lookup() {
        let finder = CachedLastCommitFinder::new(
            CountingFinder::default(),
            Arc::new(BrokenCache),
            Duration::from_secs(60),
        );

        assert_eq!(lookup(&finder, "a.txt").await.unwrap().sha, "abc");
    }

    #[tokio::test]
    async fn not_found_is_not_cached() {
        let finder = CachedLastCommitFinder::new(
            CountingFinder::default(),
            Arc::new(LocalCache::new(10)),
            Duration::from_secs(60),
        );

        let err = lookup(&finder, "missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        lookup(&finder, "missing").await.unwrap_err();

        assert_eq!(finder.inner.calls.load(Ordering::SeqCst), 2);
    }

    mod client_finder {
        use super::*;
        use crate::rpc::messages as rpc;
        use crate::rpc::mock::{MockOperation, MockRepoService, StreamItem};

        #[tokio::test]
        async fn requests_one_commit_for_path() {
            let signature = rpc::Signature {
                identity: Some(rpc::Identity::default()),
                when: 0,
            };
            let service = MockRepoService::new().with_stream(vec![StreamItem::Message(
                rpc::ListCommitsResponse {
                    commit: Some(rpc::Commit {
                        sha: "abc".to_string(),
                        author: Some(signature.clone()),
                        committer: Some(signature),
                        ..Default::default()
                    }),
                    rename_details: None,
                },
            )]);
            let client = Client::new(Arc::new(service.clone()));

            let commit = lookup(&client, "docs/a.md").await.unwrap();

            assert_eq!(commit.sha, "abc");
            match &service.operations()[0] {
                MockOperation::ListCommits(request) => {
                    assert_eq!(request.limit, 1);
                    assert_eq!(request.path, "docs/a.md");
                    assert_eq!(request.git_ref, "main");
                }
                other => panic!("unexpected operation {:?}", other),
            }
        }

        #[tokio::test]
        async fn empty_history_is_not_found() {
            let client = Client::new(Arc::new(MockRepoService::new()));

            let err = lookup(&client, "docs/a.md").await.unwrap_err();

            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }
}
