//! Recipe store backed by a directory of JSON files
//!
//! Each recipe lives in `<dir>/<id>.json`. Ids are allocated as one past
//! the highest id on disk.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sous_core::{PersistedRecipe, RecipeDraft, RecipeId, RecipeStore, UserId};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

pub struct FileRecipeStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRecipeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Recipes owned by `user`, oldest first
    pub async fn list(&self, user: &UserId) -> Result<Vec<PersistedRecipe>> {
        let mut recipes = Vec::new();
        for id in self.ids().await? {
            if let Some(recipe) = self.read(id).await? {
                if &recipe.owner == user {
                    recipes.push(recipe);
                }
            }
        }
        recipes.sort_by_key(|recipe| recipe.id);
        Ok(recipes)
    }

    fn path(&self, id: RecipeId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    async fn ids(&self) -> Result<Vec<RecipeId>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context(format!("reading {}", self.dir.display())),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse().ok())
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn read(&self, id: RecipeId) -> Result<Option<PersistedRecipe>> {
        let path = self.path(id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context(format!("reading {}", path.display())),
        };
        let recipe = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(recipe))
    }

    async fn write(&self, recipe: &PersistedRecipe) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let path = self.path(recipe.id);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(recipe)?).await?;
        fs::rename(&staging, &path)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "recipe written");
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for FileRecipeStore {
    async fn get(&self, user: &UserId, id: RecipeId) -> Result<Option<PersistedRecipe>> {
        Ok(self.read(id).await?.filter(|recipe| &recipe.owner == user))
    }

    async fn create(&self, user: &UserId, draft: &RecipeDraft) -> Result<PersistedRecipe> {
        let _guard = self.write_lock.lock().await;

        let id = self.ids().await?.into_iter().max().unwrap_or(0) + 1;
        let now = Utc::now();
        let recipe = PersistedRecipe {
            id,
            owner: user.clone(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            created_at: now,
            updated_at: now,
        };
        self.write(&recipe).await?;
        Ok(recipe)
    }

    async fn update(
        &self,
        user: &UserId,
        id: RecipeId,
        draft: &RecipeDraft,
    ) -> Result<PersistedRecipe> {
        let _guard = self.write_lock.lock().await;

        let mut recipe = self
            .get(user, id)
            .await?
            .ok_or_else(|| anyhow!("recipe {} not found for {}", id, user))?;
        recipe.title = draft.title.clone();
        recipe.content = draft.content.clone();
        recipe.updated_at = Utc::now();
        self.write(&recipe).await?;
        Ok(recipe)
    }
}
