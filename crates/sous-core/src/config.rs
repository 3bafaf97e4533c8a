//! Client configuration
//!
//! Supplied once at construction and immutable afterwards. Values come from
//! explicit builders or from the environment (a `.env` file is honoured).

use crate::error::{Error, Result};
use crate::http::retry::MAX_RETRY_ATTEMPTS;
use crate::http::timeout::TimeoutConfig;
use crate::types::ModelParameters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Default provider base URL
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1";
/// Model used when none is selected
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
/// Referrer sent for provider analytics
pub const DEFAULT_APP_REFERER: &str = "https://github.com/sous-app/sous";
/// Application title sent for provider analytics
pub const DEFAULT_APP_TITLE: &str = "Sous";

/// Environment variable holding the provider API key
pub const ENV_API_KEY: &str = "SOUS_API_KEY";
/// Fallback API key variable
pub const ENV_API_KEY_FALLBACK: &str = "OPENROUTER_API_KEY";
pub const ENV_API_URL: &str = "SOUS_API_URL";
pub const ENV_MODEL: &str = "SOUS_MODEL";
pub const ENV_TIMEOUT_MS: &str = "SOUS_TIMEOUT_MS";
pub const ENV_RETRIES: &str = "SOUS_RETRIES";

/// Load variables from a `.env` file in the working directory, if any.
///
/// Variables already set in the process environment win.
pub fn load_env_file() {
    if let Ok(path) = dotenv::dotenv() {
        log::debug!("loaded environment from {}", path.display());
    }
}

/// Configuration for [`AiClient`](crate::AiClient)
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub api_url: String,
    pub default_model: String,
    pub default_parameters: ModelParameters,
    pub timeouts: TimeoutConfig,
    /// Additional attempts after the first send
    pub retries: u32,
    pub app_referer: String,
    pub app_title: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"***")
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("default_parameters", &self.default_parameters)
            .field("timeouts", &self.timeouts)
            .field("retries", &self.retries)
            .field("app_referer", &self.app_referer)
            .field("app_title", &self.app_title)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration with library defaults and the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_parameters: ModelParameters::default(),
            timeouts: TimeoutConfig::default(),
            retries: MAX_RETRY_ATTEMPTS,
            app_referer: DEFAULT_APP_REFERER.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
        }
    }

    /// Load configuration from the environment
    ///
    /// Reads a `.env` file first if one exists. The API key is required.
    pub fn from_env() -> Result<Self> {
        load_env_file();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = get(ENV_API_KEY)
            .or_else(|| get(ENV_API_KEY_FALLBACK))
            .ok_or_else(|| {
                Error::configuration(format!(
                    "{} is not set (or {})",
                    ENV_API_KEY, ENV_API_KEY_FALLBACK
                ))
            })?;

        let mut config = Self::new(api_key);

        if let Some(url) = get(ENV_API_URL) {
            config.api_url = url;
        }
        if let Some(model) = get(ENV_MODEL) {
            config.default_model = model;
        }
        if let Some(raw) = get(ENV_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|e| Error::Configuration {
                message: format!("{} must be a number of milliseconds", ENV_TIMEOUT_MS),
                source: Some(anyhow::Error::new(e)),
            })?;
            config.timeouts = config
                .timeouts
                .with_request_timeout(Duration::from_millis(millis));
        }
        if let Some(raw) = get(ENV_RETRIES) {
            config.retries = raw.trim().parse().map_err(|e| Error::Configuration {
                message: format!("{} must be a non-negative integer", ENV_RETRIES),
                source: Some(anyhow::Error::new(e)),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Override default parameters; unset fields keep the library defaults
    pub fn with_default_parameters(mut self, parameters: ModelParameters) -> Self {
        self.default_parameters = self.default_parameters.merged_with(&parameters);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts = self.timeouts.with_request_timeout(timeout);
        self
    }

    pub fn with_catalog_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts = self.timeouts.with_catalog_timeout(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_app_identity(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.app_referer = referer.into();
        self.app_title = title.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::configuration("API key must not be empty"));
        }

        let url = Url::parse(&self.api_url).map_err(|e| Error::Configuration {
            message: format!("Invalid API URL '{}'", self.api_url),
            source: Some(anyhow::Error::new(e)),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "API URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.default_model.trim().is_empty() {
            return Err(Error::configuration("Default model must not be empty"));
        }

        self.timeouts.validate().map_err(Error::configuration)?;

        Ok(())
    }

    /// Static headers sent with every request for provider analytics
    pub fn analytics_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if !self.app_referer.is_empty() {
            headers.insert("HTTP-Referer".to_string(), self.app_referer.clone());
        }
        if !self.app_title.is_empty() {
            headers.insert("X-Title".to_string(), self.app_title.clone());
        }
        headers
    }
}
