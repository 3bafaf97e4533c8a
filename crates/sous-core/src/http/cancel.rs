//! Cooperative cancellation tokens
//!
//! A token is triggered at most once; the first trigger wins and records
//! whether the attempt was abandoned because its timer fired or because the
//! user asked for it. Every clone observes the same state.

use std::sync::Arc;
use tokio::sync::watch;

/// What caused a token to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelSource {
    /// The per-attempt timer elapsed
    Timeout,
    /// Explicit cancellation requested by the caller
    User,
}

/// Shared, clonable cancellation handle for one attempt
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<Option<CancelSource>>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Create a live token
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            state: Arc::new(sender),
        }
    }

    /// Request cancellation on behalf of the user.
    ///
    /// Returns `false` if the token had already fired.
    pub fn cancel(&self) -> bool {
        self.trigger(CancelSource::User)
    }

    /// Fire the token with the given source unless it already fired
    pub fn trigger(&self, source: CancelSource) -> bool {
        self.state.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(source);
            true
        })
    }

    /// The source that fired this token, if any
    pub fn source(&self) -> Option<CancelSource> {
        *self.state.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.source().is_some()
    }

    /// Wait until the token fires and return its source
    pub async fn cancelled(&self) -> CancelSource {
        let mut receiver = self.state.subscribe();
        loop {
            if let Some(source) = *receiver.borrow_and_update() {
                return source;
            }
            // The sender lives as long as `self`, so this only errors if the
            // channel is torn down underneath us.
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_trigger_wins() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        assert!(token.trigger(CancelSource::Timeout));
        assert!(!token.cancel());
        assert_eq!(token.source(), Some(CancelSource::Timeout));
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert_eq!(token.source(), Some(CancelSource::User));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_trigger() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let source = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert_eq!(source, CancelSource::User);
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_fired() {
        let token = CancelToken::new();
        token.trigger(CancelSource::Timeout);
        assert_eq!(token.cancelled().await, CancelSource::Timeout);
    }
}
