//! Send with retries
//!
//! A [`RequestOrchestrator`] drives one logical call: it sends through the
//! [`Transport`], classifies every failure, and retries retryable ones on the
//! [`BackoffPolicy`] schedule until the budget is spent. Attempts are strictly
//! sequential.
//!
//! Each attempt gets a fresh [`CancelToken`] which becomes the "current"
//! token. The token for the next attempt is installed *before* the backoff
//! sleep, so a [`cancel`](RequestOrchestrator::cancel) issued while sleeping
//! aborts the chain without another send.

use crate::http::builder::ApiRequest;
use crate::http::cancel::CancelToken;
use crate::http::error::{classify, AiError, ErrorKind, RawFailure};
use crate::http::retry::{with_retry_after, BackoffPolicy};
use crate::http::transport::Transport;
use backoff::backoff::Backoff;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Retrying driver for a single logical call.
///
/// Create one per logical call; once cancelled, an orchestrator stays
/// cancelled and every later send fails with [`ErrorKind::Cancelled`].
pub struct RequestOrchestrator {
    transport: Arc<Transport>,
    policy: BackoffPolicy,
    current: Mutex<Option<CancelToken>>,
    abandoned: AtomicBool,
}

impl RequestOrchestrator {
    pub fn new(transport: Arc<Transport>, policy: BackoffPolicy) -> Self {
        Self {
            transport,
            policy,
            current: Mutex::new(None),
            abandoned: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Cancel the current attempt, or the next one if the chain has not
    /// started yet. Calling it more than once has no further effect.
    pub fn cancel(&self) {
        if self.abandoned.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(token) = self.slot().as_ref() {
            token.cancel();
        }
        tracing::debug!("request chain cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Whether an attempt (or the backoff before one) is outstanding
    pub fn is_in_flight(&self) -> bool {
        self.slot().is_some()
    }

    /// Send `request`, retrying retryable failures, and decode the 2xx body.
    ///
    /// Makes at most `max_retries + 1` transport calls. The surfaced error
    /// carries the classifier's kind, message and retryability.
    pub async fn send_with_retries<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        timeout: Duration,
    ) -> Result<T, AiError> {
        let _clear = ClearOnDrop(&self.current);
        let mut backoff = self.policy.backoff();
        let mut token = self.install();

        loop {
            let attempt = backoff.attempts();
            tracing::debug!(attempt, path = %request.path, "sending provider request");

            let failure = match self.transport.send::<T>(request, timeout, &token).await {
                Ok(value) => {
                    tracing::debug!(attempt, path = %request.path, "provider request succeeded");
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let error = classify(&failure);
            if !error.retryable {
                tracing::warn!(
                    attempt,
                    kind = %error.kind,
                    detail = error.detail.as_deref().unwrap_or(""),
                    "provider request failed, not retrying"
                );
                return Err(error);
            }

            let delay = match backoff.next_backoff() {
                Some(scheduled) => with_retry_after(scheduled, advertised_delay(&error, &failure)),
                None => {
                    tracing::warn!(
                        attempts = attempt + 1,
                        kind = %error.kind,
                        detail = error.detail.as_deref().unwrap_or(""),
                        "provider request failed, retry budget exhausted"
                    );
                    return Err(error);
                }
            };

            tracing::info!(
                attempt,
                kind = %error.kind,
                delay_ms = delay.as_millis() as u64,
                "retrying provider request"
            );

            token = self.install();
            tokio::select! {
                biased;
                source = token.cancelled() => {
                    return Err(classify(&RawFailure::Cancelled { source }));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Install a fresh token as the current one
    fn install(&self) -> CancelToken {
        let token = CancelToken::new();
        let mut slot = self.slot();
        if self.abandoned.load(Ordering::SeqCst) {
            token.cancel();
        }
        *slot = Some(token.clone());
        token
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Only rate-limited responses stretch the schedule
fn advertised_delay(error: &AiError, failure: &RawFailure) -> Option<Duration> {
    if error.kind == ErrorKind::RateLimited {
        failure.retry_after()
    } else {
        None
    }
}

/// Clears the current token when the logical call ends, however it ends
struct ClearOnDrop<'a>(&'a Mutex<Option<CancelToken>>);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }
}
