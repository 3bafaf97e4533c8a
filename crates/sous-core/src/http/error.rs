//! Error classification for provider failures
//!
//! The transport reports failures as data ([`RawFailure`]); [`classify`]
//! maps each one onto the closed [`ErrorKind`] taxonomy together with the
//! retryability verdict. The mapping is pure and does not depend on the
//! attempt count.

use crate::http::cancel::CancelSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Closed taxonomy of provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AiTimeout,
    Cancelled,
    NetworkError,
    ServerError,
    Unauthorized,
    RateLimited,
    ModelUnavailable,
    TokenLimitExceeded,
    ContentFiltered,
    BudgetExceeded,
    Unknown,
}

impl ErrorKind {
    /// Check if this error kind should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::AiTimeout
                | ErrorKind::NetworkError
                | ErrorKind::ServerError
                | ErrorKind::RateLimited
                | ErrorKind::Unknown
        )
    }

    /// Short presentable message for this kind
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::AiTimeout => "The AI took too long to respond. Please try again.",
            ErrorKind::Cancelled => "The request was cancelled.",
            ErrorKind::NetworkError => {
                "Could not reach the AI service. Check your connection and try again."
            }
            ErrorKind::ServerError => {
                "The AI service is having trouble right now. Please try again shortly."
            }
            ErrorKind::Unauthorized => {
                "The AI service rejected our credentials. Check the API key configuration."
            }
            ErrorKind::RateLimited => {
                "Too many requests to the AI service. Please wait a moment and try again."
            }
            ErrorKind::ModelUnavailable => {
                "The selected AI model is not available. Choose a different model."
            }
            ErrorKind::TokenLimitExceeded => {
                "The request is too long for the selected model. Try shortening it."
            }
            ErrorKind::ContentFiltered => {
                "The AI service declined this request because of its content policy."
            }
            ErrorKind::BudgetExceeded => {
                "The AI service budget has been exhausted. Add credits and try again."
            }
            ErrorKind::Unknown => {
                "Something went wrong while talking to the AI service. Please try again."
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Classified provider error surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({kind})")]
pub struct AiError {
    pub kind: ErrorKind,
    /// Presentable message, distinct per kind
    pub message: String,
    pub retryable: bool,
    /// HTTP status when a response was received
    pub status: Option<u16>,
    /// Diagnostic detail for logs; never shown to users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AiError {
    /// Error of the given kind with its standard message and retryability
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.user_message().to_string(),
            retryable: kind.is_retryable(),
            status: None,
            detail: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Override the retryability verdict
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }
}

/// A failure exactly as the transport observed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFailure {
    /// The attempt's token fired before the exchange settled
    Cancelled { source: CancelSource },
    /// The request could not be built or was never dispatched
    Request { message: String },
    /// Dispatched, but no response was received
    Network { message: String },
    /// A non-2xx response
    Status {
        status: u16,
        body: String,
        retry_after: Option<u64>,
    },
    /// A 2xx response whose body could not be decoded
    Decode { message: String },
}

impl RawFailure {
    /// `Retry-After` advertised by a rate-limited response
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RawFailure::Status {
                retry_after: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawFailure::Cancelled { source } => write!(f, "attempt cancelled ({:?})", source),
            RawFailure::Request { message } => write!(f, "request not dispatched: {}", message),
            RawFailure::Network { message } => write!(f, "network failure: {}", message),
            RawFailure::Status { status, body, .. } => write!(f, "HTTP {}: {}", status, body),
            RawFailure::Decode { message } => write!(f, "undecodable response: {}", message),
        }
    }
}

/// Map a raw failure onto the taxonomy.
///
/// Rules are evaluated in priority order; the first match wins.
pub fn classify(failure: &RawFailure) -> AiError {
    match failure {
        RawFailure::Cancelled {
            source: CancelSource::Timeout,
        } => AiError::new(ErrorKind::AiTimeout),
        RawFailure::Cancelled {
            source: CancelSource::User,
        } => AiError::new(ErrorKind::Cancelled),
        // Never dispatched: a construction bug, not a flaky network.
        RawFailure::Request { message } => AiError::new(ErrorKind::Unknown)
            .with_retryable(false)
            .with_detail(message.clone()),
        RawFailure::Network { message } => {
            AiError::new(ErrorKind::NetworkError).with_detail(message.clone())
        }
        RawFailure::Status { status, body, .. } => {
            let kind = classify_status(*status, body);
            AiError::new(kind)
                .with_status(*status)
                .with_detail(extract_provider_message(body))
        }
        RawFailure::Decode { message } => {
            AiError::new(ErrorKind::Unknown).with_detail(message.clone())
        }
    }
}

/// Classify an HTTP status and its body
fn classify_status(status: u16, body: &str) -> ErrorKind {
    match status {
        500..=599 => ErrorKind::ServerError,
        401 | 403 => ErrorKind::Unauthorized,
        429 => ErrorKind::RateLimited,
        404 => ErrorKind::ModelUnavailable,
        400 => {
            let body = body.to_lowercase();
            if body.contains("token") {
                ErrorKind::TokenLimitExceeded
            } else if body.contains("content") {
                ErrorKind::ContentFiltered
            } else {
                ErrorKind::Unknown
            }
        }
        402 => ErrorKind::BudgetExceeded,
        _ => ErrorKind::Unknown,
    }
}

/// Extract a provider error message from a response body
fn extract_provider_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        // OpenAI / OpenRouter error format
        if let Some(message) = json
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }

        // Generic JSON error format
        if let Some(message) = json.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }

    // Fallback to raw body
    body.to_string()
}
