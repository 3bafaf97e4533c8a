//! Collaborator interfaces: recipe persistence, preferences, identity
//!
//! Ownership checks belong to the store: `get` and `update` only see
//! recipes owned by the given user.

use crate::recipe::{DietaryPreferences, PersistedRecipe, RecipeDraft, RecipeId, UserId};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Persisted recipes
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Recipe `id` if it exists and is owned by `user`
    async fn get(&self, user: &UserId, id: RecipeId) -> Result<Option<PersistedRecipe>>;

    async fn create(&self, user: &UserId, draft: &RecipeDraft) -> Result<PersistedRecipe>;

    /// Replace title and content of recipe `id`
    async fn update(&self, user: &UserId, id: RecipeId, draft: &RecipeDraft)
        -> Result<PersistedRecipe>;
}

/// Per-user dietary preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn preferences(&self, user: &UserId) -> Result<DietaryPreferences>;
}

/// Identity of the caller
pub trait AuthContext: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// In-memory [`RecipeStore`]
#[derive(Debug)]
pub struct MemoryRecipeStore {
    recipes: RwLock<HashMap<RecipeId, PersistedRecipe>>,
    next_id: AtomicU64,
}

impl Default for MemoryRecipeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self {
            recipes: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Seed a recipe for `user`, returning the stored record
    pub async fn insert(&self, user: &UserId, draft: RecipeDraft) -> PersistedRecipe {
        let now = Utc::now();
        let recipe = PersistedRecipe {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            owner: user.clone(),
            title: draft.title,
            content: draft.content,
            created_at: now,
            updated_at: now,
        };
        self.recipes.write().await.insert(recipe.id, recipe.clone());
        recipe
    }

    pub async fn len(&self) -> usize {
        self.recipes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.recipes.read().await.is_empty()
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn get(&self, user: &UserId, id: RecipeId) -> Result<Option<PersistedRecipe>> {
        let recipes = self.recipes.read().await;
        Ok(recipes.get(&id).filter(|r| &r.owner == user).cloned())
    }

    async fn create(&self, user: &UserId, draft: &RecipeDraft) -> Result<PersistedRecipe> {
        Ok(self.insert(user, draft.clone()).await)
    }

    async fn update(
        &self,
        user: &UserId,
        id: RecipeId,
        draft: &RecipeDraft,
    ) -> Result<PersistedRecipe> {
        let mut recipes = self.recipes.write().await;
        let recipe = recipes
            .get_mut(&id)
            .filter(|r| &r.owner == user)
            .ok_or_else(|| anyhow!("recipe {} not found for {}", id, user))?;

        recipe.title = draft.title.clone();
        recipe.content = draft.content.clone();
        recipe.updated_at = Utc::now();
        Ok(recipe.clone())
    }
}

/// In-memory [`PreferenceStore`]
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    preferences: RwLock<HashMap<UserId, DietaryPreferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, user: &UserId, preferences: DietaryPreferences) {
        self.preferences
            .write()
            .await
            .insert(user.clone(), preferences);
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn preferences(&self, user: &UserId) -> Result<DietaryPreferences> {
        Ok(self
            .preferences
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default())
    }
}

/// Fixed identity
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    user: Option<UserId>,
}

impl StaticAuth {
    pub fn signed_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

impl AuthContext for StaticAuth {
    fn current_user(&self) -> Option<UserId> {
        self.user.clone()
    }
}
