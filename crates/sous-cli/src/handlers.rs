//! Command handlers for CLI subcommands
//!
//! Each subcommand lives in its own module; this module holds the pieces
//! they share: assembling an assistant session from configuration and
//! running an operation so that Ctrl-C cancels it.

mod completions;
mod config;
mod generate;
mod models;
mod modify;
mod recipes;

pub use completions::handle_completions;
pub use config::handle_config;
pub use generate::handle_generate;
pub use models::handle_models;
pub use modify::handle_modify;
pub use recipes::handle_recipes;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::FileRecipeStore;
use sous_core::{AiClient, MemoryPreferenceStore, RecipeAssistant, RecipeDraft, StaticAuth};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Everything a recipe command needs
pub struct Session {
    pub client: AiClient,
    pub assistant: RecipeAssistant,
}

impl Session {
    /// Build a session from configuration, with environment overrides
    pub async fn open(config: &Config) -> Result<Self> {
        sous_core::config::load_env_file();
        let client_config = config.client_config(|name| std::env::var(name).ok())?;
        let client = AiClient::new(client_config)?;
        Self::with_client(config, client).await
    }

    /// Build a session around an existing client
    pub async fn with_client(config: &Config, client: AiClient) -> Result<Self> {
        let user = config.user_id();
        let recipes = Arc::new(FileRecipeStore::new(&config.paths.recipes_dir));
        tracing::debug!(user = %user, recipes = %recipes.dir().display(), "opening session");

        let preferences = Arc::new(MemoryPreferenceStore::new());
        preferences.set(&user, config.preferences.clone()).await;

        let assistant = RecipeAssistant::new(
            client.clone(),
            recipes,
            preferences,
            Arc::new(StaticAuth::signed_in(user)),
        );
        Ok(Self { client, assistant })
    }

    /// Select `model` for this session, failing if the provider lacks it
    pub async fn select_model(&self, model: &str) -> Result<()> {
        match self.client.catalog().select_model(model).await? {
            Some(_) => Ok(()),
            None => Err(Error::ModelNotFound {
                model: model.to_string(),
            }),
        }
    }
}

/// Drive `operation` to completion, cancelling the assistant's pending
/// work if Ctrl-C arrives first.
///
/// After a cancel the operation is still awaited so it can settle with
/// its own cancelled result.
pub async fn until_interrupted<F>(assistant: &RecipeAssistant, operation: F) -> F::Output
where
    F: Future,
{
    tokio::pin!(operation);

    tokio::select! {
        result = &mut operation => return result,
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                tracing::warn!("interrupted, cancelling pending operation");
                assistant.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "could not listen for Ctrl-C"),
        },
    }

    operation.await
}

/// Read a recipe from a file: YAML by extension, otherwise JSON or plain
/// text as the assistant would parse a completion.
pub fn read_recipe_file(path: &Path) -> Result<RecipeDraft> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s == "yaml" || s == "yml")
        .unwrap_or(false);

    if is_yaml {
        return Ok(serde_yaml::from_str(&content)?);
    }

    sous_core::parse_recipe_content(&content).map_err(|_| Error::InvalidFormat {
        path: path.to_path_buf(),
        expected: "a recipe with a title and content".to_string(),
    })
}
