//! client::context
//!
//! Cancellation and deadline carried by every client call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::errors::ClientError;

/// Cancellation signal and optional deadline for one or more calls.
///
/// Cloning shares the cancellation token, so canceling any clone cancels
/// every call using it.
///
/// # Example
///
/// ```
/// use gitread::client::CallContext;
/// use std::time::Duration;
///
/// let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
/// assert!(!ctx.is_done());
///
/// ctx.cancel();
/// assert!(ctx.is_done());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never done unless canceled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one tied to an incoming request.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set a deadline relative to now. An earlier existing deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline. An earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check whether the context is canceled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolve once the context is canceled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Run `fut` unless the context finishes first.
    pub(crate) async fn run<F, T>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.done() => Err(ClientError::Canceled),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_completes_when_not_canceled() {
        let ctx = CallContext::new();
        let result = ctx.run(async { 7 }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn run_returns_canceled_when_already_canceled() {
        let ctx = CallContext::new();
        ctx.cancel();

        let result = ctx.run(async { 7 }).await;
        assert!(matches!(result, Err(ClientError::Canceled)));
    }

    #[tokio::test]
    async fn deadline_cancels_pending_future() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));

        let result = ctx.run(futures::future::pending::<()>()).await;
        assert!(matches!(result, Err(ClientError::Canceled)));
        assert!(ctx.is_done());
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = CallContext::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn clones_share_cancellation() {
        let ctx = CallContext::new();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_done());
    }
}
