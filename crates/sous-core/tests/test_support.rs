//! Shared test support utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use sous_core::http::{Connector, RawFailure, WireRequest, WireResponse};
use sous_core::{
    AiClient, ClientConfig, MemoryPreferenceStore, MemoryRecipeStore, RecipeAssistant,
    StaticAuth, UserId,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// What the scripted provider does for one chat completion request
#[derive(Debug, Clone)]
pub enum Step {
    Reply {
        status: u16,
        body: String,
        retry_after: Option<u64>,
    },
    /// Never answer; only the timer or a cancel ends the attempt
    Stall,
    Fail(RawFailure),
}

impl Step {
    pub fn status(status: u16, body: &str) -> Self {
        Step::Reply {
            status,
            body: body.to_string(),
            retry_after: None,
        }
    }
}

/// A request the scripted provider received
#[derive(Debug, Clone)]
pub struct Call {
    pub path: String,
    pub at: Instant,
    pub body: Option<Value>,
}

/// Provider double: chat completions follow a script, `/models` returns a
/// fixed catalog
pub struct ScriptedConnector {
    chat: Mutex<VecDeque<Step>>,
    models_body: String,
    models_status: u16,
    models_delay: Duration,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedConnector {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Self::build(steps, 200, Duration::ZERO)
    }

    /// Connector whose `/models` responses take `delay` to arrive
    pub fn with_models_delay(delay: Duration) -> Arc<Self> {
        Self::build(Vec::new(), 200, delay)
    }

    /// Connector whose `/models` responses are a 503 arriving after `delay`
    pub fn with_failing_models(delay: Duration) -> Arc<Self> {
        Self::build(Vec::new(), 503, delay)
    }

    fn build(steps: Vec<Step>, models_status: u16, models_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            chat: Mutex::new(steps.into()),
            models_body: models_catalog().to_string(),
            models_status,
            models_delay,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn chat_calls(&self) -> Vec<Call> {
        self.calls_to("/chat/completions")
    }

    pub fn model_calls(&self) -> Vec<Call> {
        self.calls_to("/models")
    }

    /// Gaps between consecutive chat completion requests
    pub fn chat_gaps(&self) -> Vec<Duration> {
        self.chat_calls()
            .windows(2)
            .map(|pair| pair[1].at - pair[0].at)
            .collect()
    }

    fn calls_to(&self, suffix: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.path.ends_with(suffix))
            .collect()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, RawFailure> {
        let path = request.url.path().to_string();
        let body = request
            .body
            .as_deref()
            .map(|bytes| serde_json::from_slice(bytes).unwrap());
        self.calls.lock().unwrap().push(Call {
            path: path.clone(),
            at: Instant::now(),
            body,
        });

        if path.ends_with("/models") {
            tokio::time::sleep(self.models_delay).await;
            if self.models_status != 200 {
                return Ok(WireResponse {
                    status: self.models_status,
                    body: r#"{"error": {"message": "catalog unavailable"}}"#.to_string(),
                    retry_after: None,
                });
            }
            return Ok(WireResponse {
                status: 200,
                body: self.models_body.clone(),
                retry_after: None,
            });
        }

        let step = self
            .chat
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| recipe_reply("Fallback", "Unscripted request"));

        match step {
            Step::Reply {
                status,
                body,
                retry_after,
            } => Ok(WireResponse {
                status,
                body,
                retry_after,
            }),
            Step::Stall => std::future::pending().await,
            Step::Fail(failure) => Err(failure),
        }
    }
}

/// Chat completion whose message content is the given text
pub fn completion(content: &str) -> String {
    json!({
        "id": "gen-1",
        "model": "openai/gpt-4o-mini",
        "created": 1_700_000_000,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 34, "total_tokens": 46}
    })
    .to_string()
}

/// A 200 reply carrying a structured recipe
pub fn recipe_reply(title: &str, content: &str) -> Step {
    let recipe = json!({"title": title, "content": content}).to_string();
    Step::status(200, &completion(&recipe))
}

pub fn models_catalog() -> Value {
    json!({"data": [
        {"id": "openai/gpt-4o-mini", "name": "GPT-4o mini", "context_length": 128000,
         "top_provider": {"max_completion_tokens": 16384}},
        {"id": "meta/llama-small", "name": "Llama Small", "context_length": 8192,
         "top_provider": {"max_completion_tokens": 700}}
    ]})
}

pub fn config() -> ClientConfig {
    ClientConfig::new("sk-test").with_api_url("https://provider.test/api/v1")
}

pub fn client(connector: Arc<ScriptedConnector>) -> AiClient {
    AiClient::with_connector(config(), connector).unwrap()
}

pub fn cook() -> UserId {
    UserId::new("cook")
}

/// Assistant for a signed-in cook, with its recipe store
pub fn assistant(connector: Arc<ScriptedConnector>) -> (RecipeAssistant, Arc<MemoryRecipeStore>) {
    let recipes = Arc::new(MemoryRecipeStore::new());
    let assistant = RecipeAssistant::new(
        client(connector),
        recipes.clone(),
        Arc::new(MemoryPreferenceStore::new()),
        Arc::new(StaticAuth::signed_in(cook())),
    );
    (assistant, recipes)
}

/// Text of the user message in a recorded chat request
pub fn user_prompt(call: &Call) -> String {
    call.body.as_ref().unwrap()["messages"][1]["content"]
        .as_str()
        .unwrap()
        .to_string()
}
