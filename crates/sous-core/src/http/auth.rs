//! Authentication handling for the provider API
//!
//! The provider expects `Authorization: Bearer <key>`. Keys never appear in
//! `Debug` output.

use std::collections::HashMap;
use std::fmt;

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Invalid authentication configuration: {0}")]
    InvalidConfig(String),
}

/// Trait for applying credentials to outgoing requests
pub trait AuthHandler: Send + Sync {
    /// Apply authentication to request headers
    fn apply_auth(&self, headers: &mut HashMap<String, String>) -> Result<(), AuthError>;

    /// Validate that required credentials are available
    fn validate_credentials(&self) -> Result<(), AuthError>;
}

/// Bearer token authentication
#[derive(Clone)]
pub struct BearerAuth {
    api_key: String,
}

impl BearerAuth {
    /// Create with explicit API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("api_key", &"***")
            .finish()
    }
}

impl AuthHandler for BearerAuth {
    fn apply_auth(&self, headers: &mut HashMap<String, String>) -> Result<(), AuthError> {
        self.validate_credentials()?;
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key.trim()),
        );
        Ok(())
    }

    fn validate_credentials(&self) -> Result<(), AuthError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(AuthError::MissingApiKey(
                "Set SOUS_API_KEY in the environment".to_string(),
            ));
        }
        if key.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(AuthError::InvalidConfig(
                "API key contains whitespace or control characters".to_string(),
            ));
        }
        Ok(())
    }
}
