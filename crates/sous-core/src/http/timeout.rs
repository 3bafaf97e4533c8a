//! Timeout configuration and the per-attempt timer
//!
//! A timeout is delivered through the attempt's cancellation token, so at
//! the transport layer it looks exactly like a cancellation; only the
//! recorded [`CancelSource`] tells the two apart.

use crate::http::cancel::{CancelSource, CancelToken};
use crate::http::error::RawFailure;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Default timeout for chat completions
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Default timeout for model catalog fetches
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(10);
/// Default connection establishment timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout configuration for provider requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Total time allowed for one chat completion attempt
    pub request_timeout: Duration,
    /// Total time allowed for one model catalog fetch
    pub catalog_timeout: Duration,
    /// Time to establish a connection
    pub connect_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            catalog_timeout: DEFAULT_CATALOG_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl TimeoutConfig {
    /// Override the chat completion timeout
    pub fn with_request_timeout(&self, timeout: Duration) -> Self {
        let mut config = self.clone();
        config.request_timeout = timeout;
        config
    }

    /// Override the catalog timeout
    pub fn with_catalog_timeout(&self, timeout: Duration) -> Self {
        let mut config = self.clone();
        config.catalog_timeout = timeout;
        config
    }

    /// Validate timeout configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be zero".to_string());
        }

        if self.catalog_timeout.is_zero() {
            return Err("Catalog timeout cannot be zero".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("Connect timeout cannot be zero".to_string());
        }

        Ok(())
    }
}

/// Drive `exchange` until it settles, the token fires, or `timeout` elapses.
///
/// When the timer wins it fires the token with [`CancelSource::Timeout`];
/// if the user cancelled first the token keeps its original source. The
/// exchange future is dropped (aborting the request) on either path.
pub async fn race<F, T>(exchange: F, timeout: Duration, token: &CancelToken) -> Result<T, RawFailure>
where
    F: Future<Output = Result<T, RawFailure>>,
{
    if let Some(source) = token.source() {
        return Err(RawFailure::Cancelled { source });
    }

    tokio::select! {
        biased;
        source = token.cancelled() => Err(RawFailure::Cancelled { source }),
        _ = tokio::time::sleep(timeout) => {
            token.trigger(CancelSource::Timeout);
            Err(RawFailure::Cancelled {
                source: token.source().unwrap_or(CancelSource::Timeout),
            })
        }
        result = exchange => result,
    }
}
