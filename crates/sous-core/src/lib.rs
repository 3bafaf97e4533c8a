//! Sous Core - AI request orchestration for recipe generation
//!
//! This crate owns every call made to the generative-AI provider on behalf
//! of the recipe application: it times and cancels requests, retries
//! transient failures on a fixed backoff schedule, classifies provider
//! failures into a closed taxonomy, and tracks the in-flight
//! generate/modify/save operations so the last one can be retried.
//!
//! # Main Components
//!
//! - **Error Classifier** (`http::error`): raw failure to [`ErrorKind`]
//! - **Backoff Policy** (`http::retry`): delay schedule and retry budget
//! - **HTTP Transport** (`http::transport`): one timed, cancellable exchange
//! - **Request Orchestrator** (`http::orchestrator`): send with retries
//! - **Operation State Machine** (`state`): pending flags and retry-last
//! - **Model Catalog** (`catalog`): time-cached list of provider models
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sous_core::{
//!     AiClient, ClientConfig, GenerateParams, MemoryPreferenceStore,
//!     MemoryRecipeStore, RecipeAssistant, StaticAuth, UserId,
//! };
//!
//! async fn example() -> sous_core::Result<()> {
//!     let client = AiClient::new(ClientConfig::from_env()?)?;
//!     let assistant = RecipeAssistant::new(
//!         client,
//!         Arc::new(MemoryRecipeStore::new()),
//!         Arc::new(MemoryPreferenceStore::new()),
//!         Arc::new(StaticAuth::signed_in(UserId::new("cook"))),
//!     );
//!     let draft = assistant
//!         .generate(GenerateParams::with_additional("low carb"))
//!         .await?;
//!     println!("{}", draft.title);
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod prompts;
pub mod recipe;
pub mod response;
pub mod state;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use assistant::RecipeAssistant;
pub use cache::{CacheConfig, CacheStats, RecipeDetailCache};
pub use catalog::{ModelCatalog, CATALOG_CACHE_DURATION};
pub use client::AiClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use http::{
    classify, AiError, BackoffPolicy, CancelSource, CancelToken, Connector, ErrorKind,
    RawFailure, RequestOrchestrator, Transport, MAX_RETRY_ATTEMPTS,
};
pub use recipe::{
    DietaryPreferences, GenerateParams, ModifyOutcome, ModifyParams, OperationKind,
    OperationParams, OperationRecord, PersistedRecipe, RecipeDraft, RecipeId, SaveParams, UserId,
};
pub use response::parse_recipe_content;
pub use state::{OperationError, OperationOutcome, OperationStateMachine, OperationStatus};
pub use store::{
    AuthContext, MemoryPreferenceStore, MemoryRecipeStore, PreferenceStore, RecipeStore,
    StaticAuth,
};
pub use types::{
    ChatPayload, ChatResponse, Message, MessageRole, ModelInfo, ModelParameters, ResponseFormat,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::Validation {
            field: "title".to_string(),
            message: "must not be empty".to_string(),
        };
        assert!(err.to_string().contains("must not be empty"));
    }
}
