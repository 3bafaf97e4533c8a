//! Provider wire types
//!
//! Request and response shapes for the OpenAI-compatible chat completion
//! and model listing endpoints.

use serde::{Deserialize, Serialize};

/// Message role enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default nucleus sampling
pub const DEFAULT_TOP_P: f32 = 1.0;
/// Default completion budget
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Sampling parameters sent with every chat completion.
///
/// All fields are optional on the wire; unset fields are omitted and the
/// provider applies its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: Some(DEFAULT_TEMPERATURE),
            top_p: Some(DEFAULT_TOP_P),
            frequency_penalty: None,
            presence_penalty: None,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        }
    }
}

impl ModelParameters {
    /// Parameters with every field unset
    pub fn empty() -> Self {
        Self {
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            max_tokens: None,
        }
    }

    /// Overlay explicitly set values from `overrides` onto `self`
    pub fn merged_with(&self, overrides: &ModelParameters) -> ModelParameters {
        ModelParameters {
            temperature: overrides.temperature.or(self.temperature),
            top_p: overrides.top_p.or(self.top_p),
            frequency_penalty: overrides.frequency_penalty.or(self.frequency_penalty),
            presence_penalty: overrides.presence_penalty.or(self.presence_penalty),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
        }
    }

    /// Cap `max_tokens` to `limit`. Only `max_tokens` is ever clamped.
    pub fn cap_max_tokens(&mut self, limit: u32) {
        self.max_tokens = Some(match self.max_tokens {
            Some(current) => current.min(limit),
            None => limit,
        });
    }
}

/// Requested response format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    /// Ask the provider for a JSON object
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// Body of `POST /chat/completions`. Built fresh for every logical call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub parameters: ModelParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Successful chat completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Content of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|content| !content.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A model offered by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub context_window: u32,
    pub max_completion_tokens: Option<u32>,
}

/// Body of `GET /models`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiModelList {
    #[serde(default)]
    pub data: Vec<ApiModelData>,
}

/// Raw provider model record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiModelData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context_length: Option<u32>,
    #[serde(default)]
    pub top_provider: Option<ApiTopProvider>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTopProvider {
    #[serde(default)]
    pub max_completion_tokens: Option<u32>,
}

impl From<ApiModelData> for ModelInfo {
    fn from(raw: ApiModelData) -> Self {
        let name = raw
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| raw.id.clone());

        ModelInfo {
            name,
            description: raw.description.unwrap_or_default(),
            context_window: raw.context_length.unwrap_or(0),
            max_completion_tokens: raw.top_provider.and_then(|p| p.max_completion_tokens),
            id: raw.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_flattens_parameters() {
        let payload = ChatPayload {
            model: "test/model".to_string(),
            messages: vec![Message::system("be brief"), Message::user("soup")],
            parameters: ModelParameters::default(),
            response_format: Some(ResponseFormat::json_object()),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["model"], "test/model");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["response_format"]["type"], "json_object");
        assert!(value.get("frequency_penalty").is_none());
        assert!(value.get("parameters").is_none());
    }

    #[test]
    fn test_merge_prefers_explicit_overrides() {
        let base = ModelParameters::default();
        let overrides = ModelParameters {
            temperature: Some(0.2),
            ..ModelParameters::empty()
        };

        let merged = base.merged_with(&overrides);
        assert_eq!(merged.temperature, Some(0.2));
        assert_eq!(merged.top_p, Some(DEFAULT_TOP_P));
        assert_eq!(merged.max_tokens, Some(DEFAULT_MAX_TOKENS));
    }

    #[test]
    fn test_cap_max_tokens() {
        let mut params = ModelParameters::default();
        params.cap_max_tokens(512);
        assert_eq!(params.max_tokens, Some(512));

        params.cap_max_tokens(4096);
        assert_eq!(params.max_tokens, Some(512));
    }

    #[test]
    fn test_first_content_skips_blank() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "gen-1",
            "choices": [{ "message": { "role": "assistant", "content": "  " } }]
        }))
        .unwrap();
        assert_eq!(response.first_content(), None);

        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "hello" } }]
        }))
        .unwrap();
        assert_eq!(response.first_content(), Some("hello"));
    }

    #[test]
    fn test_model_info_mapping() {
        let raw: ApiModelData = serde_json::from_value(json!({
            "id": "vendor/model",
            "context_length": 128000,
            "top_provider": { "max_completion_tokens": 16384 }
        }))
        .unwrap();

        let info = ModelInfo::from(raw);
        assert_eq!(info.name, "vendor/model");
        assert_eq!(info.context_window, 128000);
        assert_eq!(info.max_completion_tokens, Some(16384));
        assert!(info.description.is_empty());
    }
}
