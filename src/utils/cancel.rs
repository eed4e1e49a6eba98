//! Cancellation utilities
//!
//! A cloneable handle shared between the caller and the client. It is observed
//! while waiting on the rate limiter, during each HTTP roundtrip and during each
//! backoff sleep.

use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. In-flight operations observing this handle fail
    /// with [`ClientError::Cancelled`] as soon as they reach a wait point.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// A handle cancelled together with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Run `fut` unless cancellation wins the race.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ClientError>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ClientError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_handle_short_circuits() {
        let handle = CancelHandle::new();
        handle.cancel();
        let res = handle.run(tokio::time::sleep(Duration::from_secs(10))).await;
        assert!(matches!(res, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn child_follows_parent() {
        let parent = CancelHandle::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn uncancelled_future_completes() {
        let handle = CancelHandle::new();
        assert_eq!(handle.run(async { 7 }).await.unwrap(), 7);
    }
}
