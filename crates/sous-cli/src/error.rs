//! Error types and handling for the CLI
//!
//! Every failure maps to a distinct process exit code. Provider failures
//! are shown with their presentable message only; the diagnostic detail
//! goes to the log.

use sous_core::ErrorKind;
use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from sous-core
    #[error("{0}")]
    Core(#[from] sous_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {}", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model not offered by the provider
    #[error("Model '{}' is not in the provider catalog", model)]
    ModelNotFound { model: String },

    /// Recipe store failure
    #[error("Recipe store error: {0}")]
    Store(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl From<sous_core::AiError> for Error {
    fn from(error: sous_core::AiError) -> Self {
        Error::Core(sous_core::Error::Ai(error))
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(core) => match core.as_ai().map(|ai| ai.kind) {
                Some(ErrorKind::Cancelled) => 130,
                Some(ErrorKind::AiTimeout) => 11,
                Some(ErrorKind::NetworkError) => 10,
                _ => 2,
            },
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::ModelNotFound { .. } => 8,
            Self::Store(_) => 9,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Other { .. } => 99,
        }
    }

    /// Whether re-running the same command may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Core(core) => core.is_retryable(),
            _ => false,
        }
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let message = match error {
        // Local misconfiguration is actionable, so show it in full
        Error::Core(core @ sous_core::Error::Configuration { .. }) => core.to_string(),
        Error::Core(core) => core.user_message(),
        other => other.to_string(),
    };

    let hint = if error.is_retryable() {
        "\nThis may be temporary; running the command again could succeed."
    } else {
        ""
    };

    if use_color {
        use colored::Colorize;
        format!("{} {}{}", "Error:".red().bold(), message, hint.dimmed())
    } else {
        format!("Error: {}{}", message, hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sous_core::AiError;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let cancelled: Error = AiError::cancelled().into();
        assert_eq!(cancelled.exit_code(), 130);

        let timeout: Error = AiError::new(ErrorKind::AiTimeout).into();
        assert_eq!(timeout.exit_code(), 11);

        let unauthorized: Error = AiError::new(ErrorKind::Unauthorized).into();
        assert_eq!(unauthorized.exit_code(), 2);

        assert_eq!(Error::config("bad").exit_code(), 5);
    }

    #[test]
    fn test_format_error_hides_provider_detail() {
        let error: Error = AiError::new(ErrorKind::ServerError)
            .with_status(503)
            .with_detail("upstream connect error or disconnect/reset")
            .into();

        let formatted = format_error(&error, false);
        assert!(formatted.starts_with("Error: "));
        assert!(formatted.contains(ErrorKind::ServerError.user_message()));
        assert!(!formatted.contains("upstream connect error"));
        assert!(formatted.contains("running the command again"));
    }

    #[test]
    fn test_format_error_without_retry_hint() {
        let error: Error = AiError::new(ErrorKind::Unauthorized).into();
        let formatted = format_error(&error, false);
        assert!(!formatted.contains("running the command again"));
    }
}
