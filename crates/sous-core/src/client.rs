//! Provider client
//!
//! Composes the configuration, one shared [`Transport`] and the
//! [`ModelCatalog`]. Every logical call gets its own
//! [`RequestOrchestrator`] so cancellation never crosses calls.

use crate::catalog::ModelCatalog;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{
    AiError, ApiRequest, BackoffPolicy, Connector, ReqwestConnector, RequestOrchestrator,
    Transport,
};
use crate::types::{ChatPayload, ChatResponse, Message, ResponseFormat};
use std::sync::Arc;

/// Chat completions endpoint, relative to the API base URL
pub const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Client for the generative-AI provider
#[derive(Clone)]
pub struct AiClient {
    config: Arc<ClientConfig>,
    transport: Arc<Transport>,
    catalog: Arc<ModelCatalog>,
}

impl AiClient {
    /// Create a client that talks to the provider over HTTP
    pub fn new(config: ClientConfig) -> Result<Self> {
        let connector = ReqwestConnector::new(config.timeouts.connect_timeout)?;
        Self::with_connector(config, Arc::new(connector))
    }

    /// Create a client over a custom connector
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;

        let transport = Arc::new(Transport::new(
            connector,
            &config.api_url,
            &config.api_key,
            config.analytics_headers(),
        )?);
        let catalog = Arc::new(ModelCatalog::new(
            transport.clone(),
            config.timeouts.catalog_timeout,
        ));

        tracing::debug!(
            api_url = %config.api_url,
            model = %config.default_model,
            retries = config.retries,
            "AI client configured"
        );

        Ok(Self {
            config: Arc::new(config),
            transport,
            catalog,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    /// Fresh orchestrator for one logical call
    pub fn orchestrator(&self) -> RequestOrchestrator {
        RequestOrchestrator::new(self.transport.clone(), BackoffPolicy::new(self.config.retries))
    }

    /// Model used for the next request: the catalog selection, else the
    /// configured default
    pub fn active_model(&self) -> String {
        self.catalog
            .selected_model()
            .unwrap_or_else(|| self.config.default_model.clone())
    }

    /// Build a JSON-mode chat payload for `messages`.
    ///
    /// Configured defaults apply; `max_tokens` is capped to the model's
    /// completion limit when the catalog knows it.
    pub fn build_payload(&self, messages: Vec<Message>) -> ChatPayload {
        let model = self.active_model();
        let mut parameters = self.config.default_parameters.clone();
        if let Some(limit) = self.catalog.known_completion_limit(&model) {
            parameters.cap_max_tokens(limit);
        }

        ChatPayload {
            model,
            messages,
            parameters,
            response_format: Some(ResponseFormat::json_object()),
        }
    }

    /// `POST chat/completions` through `orchestrator`, with retries
    pub async fn complete(
        &self,
        orchestrator: &RequestOrchestrator,
        payload: &ChatPayload,
    ) -> std::result::Result<ChatResponse, AiError> {
        let request = ApiRequest::post(CHAT_COMPLETIONS_PATH, payload)
            .map_err(|failure| crate::http::classify(&failure))?;

        tracing::info!(
            model = %payload.model,
            messages = payload.messages.len(),
            "requesting chat completion"
        );
        orchestrator
            .send_with_retries(&request, self.config.timeouts.request_timeout)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{RawFailure, WireRequest, WireResponse};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        bodies: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Connector for Recorder {
        async fn execute(&self, request: WireRequest) -> std::result::Result<WireResponse, RawFailure> {
            if let Some(body) = request.body {
                self.bodies
                    .lock()
                    .unwrap()
                    .push(serde_json::from_slice(&body).unwrap());
            }
            let body = if request.url.path().ends_with("/models") {
                r#"{"data":[{"id":"tiny/model","top_provider":{"max_completion_tokens":256}}]}"#
            } else {
                r#"{"id":"c1","choices":[{"message":{"role":"assistant","content":"ok"}}]}"#
            };
            Ok(WireResponse {
                status: 200,
                body: body.to_string(),
                retry_after: None,
            })
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = AiClient::with_connector(ClientConfig::new(""), Arc::new(Recorder::default()));
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_uses_defaults() {
        let client =
            AiClient::with_connector(ClientConfig::new("sk"), Arc::new(Recorder::default())).unwrap();
        let payload = client.build_payload(vec![Message::user("hi")]);
        assert_eq!(payload.model, "openai/gpt-4o-mini");
        assert_eq!(payload.parameters.max_tokens, Some(1024));
        assert_eq!(payload.response_format, Some(ResponseFormat::json_object()));
    }

    #[tokio::test]
    async fn test_payload_caps_to_selected_model() {
        let client =
            AiClient::with_connector(ClientConfig::new("sk"), Arc::new(Recorder::default())).unwrap();
        client.catalog().select_model("tiny/model").await.unwrap();

        let payload = client.build_payload(vec![Message::user("hi")]);
        assert_eq!(payload.model, "tiny/model");
        assert_eq!(payload.parameters.max_tokens, Some(256));
    }

    #[tokio::test]
    async fn test_complete_posts_payload() {
        let recorder = Arc::new(Recorder::default());
        let client = AiClient::with_connector(ClientConfig::new("sk"), recorder.clone()).unwrap();

        let payload = client.build_payload(vec![Message::system("chef"), Message::user("soup")]);
        let response = client.complete(&client.orchestrator(), &payload).await.unwrap();
        assert_eq!(response.first_content(), Some("ok"));

        let bodies = recorder.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["messages"][1]["content"], "soup");
        assert_eq!(bodies[0]["response_format"]["type"], "json_object");
        assert_eq!(bodies[0]["max_tokens"], 1024);
    }
}
