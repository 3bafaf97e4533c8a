//! HTTP layer for provider API communication
//!
//! This module provides:
//! - Cooperative cancellation tokens with a timeout/user source
//! - Request building and bearer authentication
//! - A timed, cancellable transport over a pluggable connector
//! - Error classification into a closed taxonomy
//! - A fixed backoff schedule and the retrying orchestrator

pub mod auth;
pub mod builder;
pub mod cancel;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod timeout;
pub mod transport;

pub use auth::{AuthError, AuthHandler, BearerAuth};
pub use builder::{ApiRequest, RequestBuilder};
pub use cancel::{CancelSource, CancelToken};
pub use error::{classify, AiError, ErrorKind, RawFailure};
pub use orchestrator::RequestOrchestrator;
pub use retry::{next_delay_ms, BackoffPolicy, RetryDecision, ScheduledBackoff, MAX_RETRY_ATTEMPTS};
pub use timeout::TimeoutConfig;
pub use transport::{Connector, ReqwestConnector, Transport, WireRequest, WireResponse};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
