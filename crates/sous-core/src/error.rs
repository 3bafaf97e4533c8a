//! Error types for the Sous core library
//!
//! Provider failures are classified into [`AiError`] by the HTTP layer; this
//! module wraps them together with the failures that originate elsewhere
//! (configuration, collaborators, bad arguments, state machine rejections).

use crate::http::AiError;
use crate::recipe::{OperationKind, RecipeId};
use thiserror::Error;

/// Main error type for Sous operations
#[derive(Error, Debug)]
pub enum Error {
    /// Classified provider failure
    #[error("AI request failed: {0}")]
    Ai(#[from] AiError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Validation errors for inputs and provider output
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// `retry_last` was called without a usable operation record
    #[error("Nothing to retry: {reason}")]
    NothingToRetry { reason: String },

    /// Another operation of the same kind is still pending
    #[error("A {kind} operation is already in progress")]
    OperationPending { kind: OperationKind },

    /// The requested recipe does not exist or is not owned by the user
    #[error("Recipe {id} not found")]
    RecipeNotFound { id: RecipeId },

    /// Recipe or preference store failures
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// No user is signed in
    #[error("No authenticated user")]
    Unauthenticated,

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error without a source
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap a collaborator failure
    pub fn store(message: impl Into<String>, source: anyhow::Error) -> Self {
        Error::Store {
            message: message.into(),
            source: Some(source),
        }
    }

    /// The classified provider error, if this is one
    pub fn as_ai(&self) -> Option<&AiError> {
        match self {
            Error::Ai(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the caller may reasonably offer a "Retry" action.
    ///
    /// For provider failures this is the classifier's verdict and nothing else.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Ai(err) => err.retryable,
            Error::Store { .. } => true,
            _ => false,
        }
    }

    /// Short presentable message, never a raw provider payload
    pub fn user_message(&self) -> String {
        match self {
            Error::Ai(err) => err.message.clone(),
            Error::Validation { message, .. } => message.clone(),
            Error::NothingToRetry { .. } => "There is nothing to retry.".to_string(),
            Error::OperationPending { kind } => {
                format!("Please wait for the current {} to finish.", kind.activity())
            }
            Error::RecipeNotFound { .. } => "That recipe could not be found.".to_string(),
            Error::Store { .. } => "Your recipes could not be reached. Please try again.".to_string(),
            Error::Unauthenticated => "Please sign in to continue.".to_string(),
            Error::Configuration { .. } => {
                "The AI assistant is not configured correctly.".to_string()
            }
            Error::Json { .. } | Error::Internal { .. } => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::configuration("missing API key");
        assert_eq!(err.to_string(), "Configuration error: missing API key");
    }

    #[test]
    fn test_retryable_follows_classifier() {
        let err = Error::from(AiError::new(ErrorKind::RateLimited));
        assert!(err.is_retryable());

        let err = Error::from(AiError::new(ErrorKind::Unauthorized));
        assert!(!err.is_retryable());

        assert!(!Error::Unauthenticated.is_retryable());
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = Error::from(
            AiError::new(ErrorKind::ServerError).with_detail("{\"error\":{\"message\":\"boom\"}}"),
        );
        assert!(!err.user_message().contains("boom"));
        assert_eq!(err.user_message(), ErrorKind::ServerError.user_message());
    }

    #[test]
    fn test_pending_message_mentions_activity() {
        let err = Error::OperationPending {
            kind: OperationKind::Save,
        };
        assert_eq!(err.to_string(), "A save operation is already in progress");
        assert!(err.user_message().contains("saving"));
    }
}
