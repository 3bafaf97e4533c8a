//! Saved recipe command handlers

use crate::cli::{RecipesAction, RecipesArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use crate::store::FileRecipeStore;
use sous_core::RecipeStore;

/// Handle the recipes command
pub async fn handle_recipes(
    args: RecipesArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let user = config.user_id();
    let store = FileRecipeStore::new(&config.paths.recipes_dir);

    match args.action {
        RecipesAction::List => {
            let recipes = store
                .list(&user)
                .await
                .map_err(|e| Error::Store(format!("{:#}", e)))?;

            if recipes.is_empty() {
                output.info(&format!("No saved recipes in {}", store.dir().display()))?;
                return Ok(());
            }
            if output.format() != crate::cli::OutputFormat::Human {
                return output.data(&recipes);
            }

            let rows = recipes
                .iter()
                .map(|recipe| {
                    vec![
                        recipe.id.to_string(),
                        recipe.title.clone(),
                        recipe.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                    ]
                })
                .collect();
            output.table(&["ID", "TITLE", "UPDATED"], rows)
        }
        RecipesAction::Show { id } => {
            let recipe = store
                .get(&user, id)
                .await
                .map_err(|e| Error::Store(format!("{:#}", e)))?
                .ok_or(sous_core::Error::RecipeNotFound { id })?;
            output.saved_recipe(&recipe)
        }
    }
}
