//! Time-cached catalog of provider models
//!
//! The list is served from memory while it is younger than
//! [`CATALOG_CACHE_DURATION`] and non-empty. Concurrent callers that find it
//! stale share one fetch: the first leads it and the rest subscribe to its
//! outcome. A failed fetch is reported to every waiter.

use crate::http::{classify, AiError, ApiRequest, CancelToken, Transport};
use crate::types::{ApiModelList, ModelInfo, ModelParameters};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// How long a fetched catalog stays fresh
pub const CATALOG_CACHE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Ceiling applied to `max_tokens` by [`ModelCatalog::get_default_parameters`]
pub const MAX_DEFAULT_COMPLETION_TOKENS: u32 = 2048;

/// Outcome of the in-flight fetch, `None` until it settles
type FetchOutcome = Option<Result<Vec<ModelInfo>, AiError>>;

#[derive(Debug, Default)]
struct CatalogState {
    models: Vec<ModelInfo>,
    last_fetch: Option<Instant>,
    selected: Option<String>,
    in_flight: Option<watch::Receiver<FetchOutcome>>,
}

enum Role {
    Lead(watch::Sender<FetchOutcome>),
    Follow(watch::Receiver<FetchOutcome>),
}

/// Clears the in-flight slot when the leading fetch ends, even if the
/// leader is dropped before it settles
struct InFlight<'a>(&'a ModelCatalog);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().in_flight = None;
    }
}

impl CatalogState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        match self.last_fetch {
            Some(at) => !self.models.is_empty() && at.elapsed() < ttl,
            None => false,
        }
    }

    fn find(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|model| model.id == id)
    }
}

/// Process-memory model catalog
pub struct ModelCatalog {
    transport: Arc<Transport>,
    timeout: Duration,
    ttl: Duration,
    state: Mutex<CatalogState>,
}

impl ModelCatalog {
    pub fn new(transport: Arc<Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            ttl: CATALOG_CACHE_DURATION,
            state: Mutex::new(CatalogState::default()),
        }
    }

    /// Override the freshness window
    pub fn with_cache_duration(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Available models, fetched only when the cache is stale or empty
    pub async fn get_available_models(&self) -> Result<Vec<ModelInfo>, AiError> {
        if let Some(models) = self.fresh_models() {
            log::trace!("serving {} models from cache", models.len());
            return Ok(models);
        }
        self.shared_fetch(false).await
    }

    /// Refetch regardless of freshness.
    ///
    /// Joins a fetch that is already in flight instead of starting another.
    pub async fn refresh(&self) -> Result<Vec<ModelInfo>, AiError> {
        self.shared_fetch(true).await
    }

    /// Select `id` if the catalog lists it.
    ///
    /// Returns `None` and leaves the selection untouched for unknown ids.
    pub async fn select_model(&self, id: &str) -> Result<Option<ModelInfo>, AiError> {
        self.get_available_models().await?;

        let mut state = self.lock();
        let found = state.find(id).cloned();
        match &found {
            Some(model) => {
                log::info!("selected model {}", model.id);
                state.selected = Some(model.id.clone());
            }
            None => log::warn!("model {} is not in the catalog", id),
        }
        Ok(found)
    }

    /// Currently selected model id
    pub fn selected_model(&self) -> Option<String> {
        self.lock().selected.clone()
    }

    /// Cached record for `id`, without fetching
    pub fn cached_model(&self, id: &str) -> Option<ModelInfo> {
        self.lock().find(id).cloned()
    }

    /// Completion limit of `id` if the cached catalog knows it
    pub fn known_completion_limit(&self, id: &str) -> Option<u32> {
        self.lock()
            .find(id)
            .and_then(|model| model.max_completion_tokens)
    }

    /// Library defaults, with `max_tokens` set to
    /// `min(maxCompletionTokens, 2048)` when the model and its limit are known.
    ///
    /// `None` means the selected model.
    pub fn get_default_parameters(&self, model_id: Option<&str>) -> ModelParameters {
        let mut parameters = ModelParameters::default();

        let state = self.lock();
        let id = model_id.map(str::to_string).or_else(|| state.selected.clone());
        let limit = id
            .as_deref()
            .and_then(|id| state.find(id))
            .and_then(|model| model.max_completion_tokens);

        if let Some(limit) = limit {
            parameters.max_tokens = Some(limit.min(MAX_DEFAULT_COMPLETION_TOKENS));
        }
        parameters
    }

    /// Time since the last successful fetch
    pub fn age(&self) -> Option<Duration> {
        self.lock().last_fetch.map(|at| at.elapsed())
    }

    /// Lead a fetch, or wait for the outcome of the one in flight
    async fn shared_fetch(&self, force: bool) -> Result<Vec<ModelInfo>, AiError> {
        loop {
            let role = {
                let mut state = self.lock();
                if !force && state.is_fresh(self.ttl) {
                    return Ok(state.models.clone());
                }
                match &state.in_flight {
                    Some(receiver) => Role::Follow(receiver.clone()),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        state.in_flight = Some(receiver);
                        Role::Lead(sender)
                    }
                }
            };

            match role {
                Role::Lead(sender) => {
                    let _in_flight = InFlight(self);
                    let result = self.fetch().await;
                    sender.send_replace(Some(result.clone()));
                    return result;
                }
                Role::Follow(mut receiver) => {
                    log::trace!("waiting on in-flight catalog fetch");
                    let outcome = match receiver.wait_for(Option::is_some).await {
                        Ok(outcome) => (*outcome).clone(),
                        // Leader dropped before settling
                        Err(_) => None,
                    };
                    if let Some(result) = outcome {
                        return result;
                    }
                }
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<ModelInfo>, AiError> {
        log::debug!("fetching model catalog from {}", self.transport.base_url());

        let token = CancelToken::new();
        let list: ApiModelList = self
            .transport
            .send(&ApiRequest::get("models"), self.timeout, &token)
            .await
            .map_err(|failure| {
                let error = classify(&failure);
                log::warn!("model catalog fetch failed: {} ({})", failure, error.kind);
                error
            })?;

        let models: Vec<ModelInfo> = list.data.into_iter().map(ModelInfo::from).collect();
        log::info!("fetched {} models", models.len());

        let mut state = self.lock();
        state.models = models.clone();
        state.last_fetch = Some(Instant::now());
        Ok(models)
    }

    fn fresh_models(&self) -> Option<Vec<ModelInfo>> {
        let state = self.lock();
        state.is_fresh(self.ttl).then(|| state.models.clone())
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
