//! Recipe assistant: the operations the application calls
//!
//! Each operation checks for a signed-in user, registers with the
//! [`OperationStateMachine`], runs, and reports its outcome back so the
//! status and retry record stay current. AI calls get their own
//! [`RequestOrchestrator`](crate::http::RequestOrchestrator); saves race the
//! store call against a cancellation token.

use crate::cache::RecipeDetailCache;
use crate::client::AiClient;
use crate::error::{Error, Result};
use crate::http::{AiError, CancelToken};
use crate::prompts;
use crate::recipe::{
    DietaryPreferences, GenerateParams, ModifyOutcome, ModifyParams, OperationParams,
    OperationRecord, PersistedRecipe, RecipeDraft, RecipeId, SaveParams, UserId,
};
use crate::response::parse_recipe_content;
use crate::state::{
    Canceller, OperationError, OperationOutcome, OperationStateMachine, OperationStatus,
    OperationTicket,
};
use crate::store::{AuthContext, PreferenceStore, RecipeStore};
use crate::types::Message;
use std::sync::{Arc, Mutex};

/// Entry point for generate, modify and save
pub struct RecipeAssistant {
    client: AiClient,
    recipes: Arc<dyn RecipeStore>,
    preferences: Arc<dyn PreferenceStore>,
    auth: Arc<dyn AuthContext>,
    state: OperationStateMachine,
    cache: Option<Arc<Mutex<RecipeDetailCache>>>,
}

impl RecipeAssistant {
    pub fn new(
        client: AiClient,
        recipes: Arc<dyn RecipeStore>,
        preferences: Arc<dyn PreferenceStore>,
        auth: Arc<dyn AuthContext>,
    ) -> Self {
        Self {
            client,
            recipes,
            preferences,
            auth,
            state: OperationStateMachine::new(),
            cache: None,
        }
    }

    /// Share a recipe detail cache with the rest of the application
    pub fn with_detail_cache(mut self, cache: Arc<Mutex<RecipeDetailCache>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn client(&self) -> &AiClient {
        &self.client
    }

    /// Generate a new recipe draft
    pub async fn generate(&self, params: GenerateParams) -> Result<RecipeDraft> {
        let user = self.require_user()?;

        let orchestrator = Arc::new(self.client.orchestrator());
        let ticket = self.state.start(
            OperationRecord::generate(params.clone()),
            Canceller::Orchestrator(orchestrator.clone()),
        )?;
        tracing::info!(user = %user, "generating recipe");

        let result = async {
            let preferences = self.load_preferences(&user).await;
            let messages = prompts::generate_messages(&preferences, &params);
            self.ask(&orchestrator, messages).await
        }
        .await;

        self.settle(ticket, result, OperationOutcome::Generated)
    }

    /// Rewrite recipe `target_id` according to `params`
    pub async fn modify(&self, target_id: RecipeId, params: ModifyParams) -> Result<ModifyOutcome> {
        let user = self.require_user()?;
        if params.instructions.trim().is_empty() {
            return Err(Error::validation(
                "instructions",
                "Describe the changes you want to make.",
            ));
        }

        let orchestrator = Arc::new(self.client.orchestrator());
        let ticket = self.state.start(
            OperationRecord::modify(target_id, params.clone()),
            Canceller::Orchestrator(orchestrator.clone()),
        )?;
        tracing::info!(user = %user, recipe = target_id, "modifying recipe");

        let result = async {
            let original = self.load_recipe(&user, target_id).await?;
            let preferences = self.load_preferences(&user).await;
            let messages = prompts::modify_messages(&preferences, &original, &params);
            let modified = self.ask(&orchestrator, messages).await?;
            Ok::<_, Error>(ModifyOutcome { original, modified })
        }
        .await;

        self.settle(ticket, result, OperationOutcome::Modified)
    }

    /// Persist `draft`, either as a new recipe or over `replace_target`
    pub async fn save(
        &self,
        draft: RecipeDraft,
        is_new: bool,
        replace_target: Option<RecipeId>,
    ) -> Result<PersistedRecipe> {
        let user = self.require_user()?;
        if draft.title.trim().is_empty() {
            return Err(Error::validation("title", "A recipe needs a title."));
        }
        if draft.content.trim().is_empty() {
            return Err(Error::validation("content", "A recipe needs instructions."));
        }
        let target = match (is_new, replace_target) {
            (true, _) => None,
            (false, Some(id)) => Some(id),
            (false, None) => {
                return Err(Error::validation(
                    "replace_target",
                    "Choose the recipe to replace.",
                ))
            }
        };

        let token = CancelToken::new();
        let ticket = self.state.start(
            OperationRecord::save(SaveParams {
                draft: draft.clone(),
                is_new,
                replace_target,
            }),
            Canceller::Token(token.clone()),
        )?;
        tracing::info!(user = %user, replace = ?target, "saving recipe");

        let store_call = async {
            match target {
                None => self.recipes.create(&user, &draft).await,
                Some(id) => self.recipes.update(&user, id, &draft).await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Ai(AiError::cancelled())),
            saved = store_call => saved.map_err(|e| Error::store("Failed to save recipe", e)),
        };

        if let (Ok(saved), Some(cache)) = (&result, &self.cache) {
            let mut cache = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(replaced) = replace_target.filter(|id| *id != saved.id) {
                cache.invalidate(replaced);
            }
            cache.put(saved.clone());
        }

        self.settle(ticket, result, OperationOutcome::Saved)
    }

    /// Cancel every pending operation; `false` if nothing was pending
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    /// Re-run the most recent operation with its recorded parameters
    pub async fn retry_last(&self) -> Result<OperationOutcome> {
        let record = self.state.retry_target()?;
        tracing::info!(kind = %record.kind, "retrying last operation");

        match record.params {
            OperationParams::Generate(params) => {
                self.generate(params).await.map(OperationOutcome::Generated)
            }
            OperationParams::Modify(params) => {
                let target = record.target_id.ok_or_else(|| Error::NothingToRetry {
                    reason: "the last modify has no target recipe".to_string(),
                })?;
                self.modify(target, params).await.map(OperationOutcome::Modified)
            }
            OperationParams::Save(params) => self
                .save(params.draft, params.is_new, params.replace_target)
                .await
                .map(OperationOutcome::Saved),
        }
    }

    /// Cancel anything pending and forget the last operation
    pub fn reset(&self) {
        self.state.reset();
    }

    pub fn status(&self) -> OperationStatus {
        self.state.status()
    }

    fn require_user(&self) -> Result<UserId> {
        self.auth.current_user().ok_or(Error::Unauthenticated)
    }

    /// Preferences are best effort: a failing store yields none
    async fn load_preferences(&self, user: &UserId) -> DietaryPreferences {
        match self.preferences.preferences(user).await {
            Ok(preferences) => preferences,
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "could not load dietary preferences");
                DietaryPreferences::default()
            }
        }
    }

    async fn load_recipe(&self, user: &UserId, id: RecipeId) -> Result<PersistedRecipe> {
        if let Some(cache) = &self.cache {
            let cached = cache
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .get(id)
                .filter(|recipe| &recipe.owner == user);
            if let Some(recipe) = cached {
                return Ok(recipe);
            }
        }

        let recipe = self
            .recipes
            .get(user, id)
            .await
            .map_err(|e| Error::store("Failed to load recipe", e))?
            .ok_or(Error::RecipeNotFound { id })?;

        if let Some(cache) = &self.cache {
            cache
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .put(recipe.clone());
        }
        Ok(recipe)
    }

    /// One chat completion, decoded into a draft
    async fn ask(
        &self,
        orchestrator: &crate::http::RequestOrchestrator,
        messages: Vec<Message>,
    ) -> Result<RecipeDraft> {
        let payload = self.client.build_payload(messages);
        let response = self.client.complete(orchestrator, &payload).await?;

        let content = response
            .first_content()
            .ok_or_else(|| Error::validation("content", "The AI returned an empty response."))?;
        parse_recipe_content(content)
    }

    /// Report `result` to the state machine and hand it back.
    ///
    /// A completion that lost its ticket to `cancel` or `reset` is reported
    /// to the caller as cancelled.
    fn settle<T: Clone>(
        &self,
        ticket: OperationTicket,
        result: Result<T>,
        outcome: fn(T) -> OperationOutcome,
    ) -> Result<T> {
        let current = match &result {
            Ok(value) => self.state.succeed(ticket, outcome(value.clone())),
            Err(error) => {
                tracing::warn!(
                    kind = %ticket.kind,
                    error = %error,
                    "operation failed"
                );
                self.state.fail(ticket, OperationError::from(error))
            }
        };

        if current {
            result
        } else {
            Err(Error::Ai(AiError::cancelled()))
        }
    }
}
