//! Configuration management for the CLI
//!
//! This module handles loading and merging configuration from:
//! - Default values
//! - Configuration files (YAML/JSON/TOML)
//! - Environment variables (which take precedence over the file)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sous_core::config::{ENV_API_KEY, ENV_API_URL, ENV_MODEL, ENV_RETRIES, ENV_TIMEOUT_MS};
use sous_core::{ClientConfig, DietaryPreferences};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local identity that owns saved recipes
    pub user: Option<String>,

    /// Provider connection settings
    pub provider: ProviderConfig,

    /// Dietary preferences folded into every prompt
    pub preferences: DietaryPreferences,

    /// Output settings
    pub output: OutputConfig,

    /// Path settings
    pub paths: PathConfig,
}

/// Provider connection settings
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key; prefer the `SOUS_API_KEY` environment variable
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL override
    pub api_url: Option<String>,

    /// Default model
    pub model: Option<String>,

    /// Chat completion timeout in milliseconds
    pub timeout_ms: Option<u64>,

    /// Model catalog timeout in milliseconds
    pub catalog_timeout_ms: Option<u64>,

    /// Additional attempts after the first send
    pub retries: Option<u32>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout_ms", &self.timeout_ms)
            .field("catalog_timeout_ms", &self.catalog_timeout_ms)
            .field("retries", &self.retries)
            .finish()
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use colored output by default
    pub color: bool,

    /// Show progress indicators
    pub progress: bool,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory holding saved recipes
    pub recipes_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            progress: true,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            recipes_dir: data_dir.join("sous").join("recipes"),
        }
    }
}

/// Supported configuration file formats, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Yaml,
    Json,
    Toml,
}

impl FileFormat {
    fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Some(FileFormat::Yaml),
            Some("json") => Some(FileFormat::Json),
            Some("toml") => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let format = FileFormat::of(path).ok_or_else(|| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "a .yaml, .yml, .json or .toml file".to_string(),
        })?;
        let content = std::fs::read_to_string(path)?;

        let config = match format {
            FileFormat::Yaml => serde_yaml::from_str(&content)?,
            FileFormat::Json => serde_json::from_str(&content)?,
            FileFormat::Toml => toml::from_str(&content).map_err(|e| Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: format!("TOML ({})", e.message()),
            })?,
        };

        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Configuration file locations, in search order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        for name in [".sous.yaml", ".sous.json", ".sous.toml"] {
            paths.push(PathBuf::from(name));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let sous_dir = config_dir.join("sous");
            for name in ["config.yaml", "config.json", "config.toml"] {
                paths.push(sous_dir.join(name));
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            for name in [".sous.yaml", ".sous.json", ".sous.toml"] {
                paths.push(home_dir.join(name));
            }
        }

        paths
    }

    /// Identity used for saved recipes
    pub fn user_id(&self) -> sous_core::UserId {
        let name = self
            .user
            .clone()
            .filter(|user| !user.trim().is_empty())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "local".to_string());
        sous_core::UserId::new(name)
    }

    /// Client configuration with `env` layered over the file's provider section
    pub fn client_config<F>(&self, env: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = &self.provider;
        let from_file = |name: &str| match name {
            ENV_API_KEY => provider.api_key.clone(),
            ENV_API_URL => provider.api_url.clone(),
            ENV_MODEL => provider.model.clone(),
            ENV_TIMEOUT_MS => provider.timeout_ms.map(|ms| ms.to_string()),
            ENV_RETRIES => provider.retries.map(|n| n.to_string()),
            _ => None,
        };

        let mut config = ClientConfig::from_lookup(|name| env(name).or_else(|| from_file(name)))?;
        if let Some(ms) = provider.catalog_timeout_ms {
            config = config.with_catalog_timeout(Duration::from_millis(ms));
        }
        config.validate()?;
        Ok(config)
    }
}
