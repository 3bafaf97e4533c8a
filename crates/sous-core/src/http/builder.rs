//! HTTP request builder for provider API requests
//!
//! Turns an [`ApiRequest`] (method, path, JSON body) into a fully formed
//! [`WireRequest`]. Anything that goes wrong here happens before dispatch
//! and is reported as [`RawFailure::Request`].

use crate::http::auth::AuthHandler;
use crate::http::error::RawFailure;
use crate::http::transport::WireRequest;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Caller-level description of one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `chat/completions`
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    /// `GET {path}`
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    /// `POST {path}` with a JSON body
    pub fn post<T: Serialize>(path: impl Into<String>, body: &T) -> Result<Self, RawFailure> {
        let body = serde_json::to_value(body).map_err(|e| RawFailure::Request {
            message: format!("Failed to serialize request body: {}", e),
        })?;
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        })
    }
}

/// Builder for constructing HTTP requests against the provider base URL
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: Url,
    headers: HashMap<String, String>,
}

impl RequestBuilder {
    /// Create a builder rooted at `base_url` with static extra headers
    pub fn new(base_url: &str, headers: HashMap<String, String>) -> Result<Self, RawFailure> {
        // `Url::join` replaces the last segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        let base_url = Url::parse(&normalized).map_err(|e| RawFailure::Request {
            message: format!("Invalid base URL {}: {}", base_url, e),
        })?;

        Ok(Self { base_url, headers })
    }

    /// Base URL every path is joined onto
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the wire request for `request`, applying credentials
    pub fn build(
        &self,
        request: &ApiRequest,
        auth: &dyn AuthHandler,
    ) -> Result<WireRequest, RawFailure> {
        let url = self.build_url(&request.path)?;

        let mut header_values = self.headers.clone();
        auth.apply_auth(&mut header_values)
            .map_err(|e| RawFailure::Request {
                message: e.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        for (key, value) in &header_values {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| RawFailure::Request {
                message: format!("Invalid header name {}: {}", key, e),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| RawFailure::Request {
                message: format!("Invalid value for header {}: {}", key, e),
            })?;
            headers.insert(name, value);
        }

        let body = match &request.body {
            Some(body) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(serde_json::to_vec(body).map_err(|e| RawFailure::Request {
                    message: format!("Failed to encode request body: {}", e),
                })?)
            }
            None => None,
        };

        Ok(WireRequest {
            method: request.method.clone(),
            url,
            headers,
            body,
        })
    }

    /// Build the full URL from base URL and endpoint path
    fn build_url(&self, path: &str) -> Result<Url, RawFailure> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RawFailure::Request {
                message: format!("Failed to join path {}: {}", path, e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::auth::BearerAuth;
    use serde_json::json;

    fn analytics_headers() -> HashMap<String, String> {
        HashMap::from([
            ("HTTP-Referer".to_string(), "https://sous.example".to_string()),
            ("X-Title".to_string(), "Sous".to_string()),
        ])
    }

    #[test]
    fn test_url_join_keeps_base_path() {
        let builder = RequestBuilder::new("https://openrouter.ai/api/v1", HashMap::new()).unwrap();
        let request = ApiRequest::get("/models");
        let wire = builder.build(&request, &BearerAuth::new("k")).unwrap();
        assert_eq!(wire.url.as_str(), "https://openrouter.ai/api/v1/models");
    }

    #[test]
    fn test_post_carries_auth_and_json() {
        let builder = RequestBuilder::new("https://api.example.com/v1/", analytics_headers()).unwrap();
        let request = ApiRequest::post("chat/completions", &json!({"model": "m"})).unwrap();
        let wire = builder.build(&request, &BearerAuth::new("sk-1")).unwrap();

        assert_eq!(wire.method, Method::POST);
        assert_eq!(wire.url.as_str(), "https://api.example.com/v1/chat/completions");
        assert_eq!(wire.headers["authorization"], "Bearer sk-1");
        assert_eq!(wire.headers["content-type"], "application/json");
        assert_eq!(wire.headers["x-title"], "Sous");
        let body: Value = serde_json::from_slice(wire.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["model"], "m");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            RequestBuilder::new("not a url", HashMap::new()),
            Err(RawFailure::Request { .. })
        ));
    }

    #[test]
    fn test_invalid_header_is_undispatched_failure() {
        let headers = HashMap::from([("X-Title".to_string(), "line\nbreak".to_string())]);
        let builder = RequestBuilder::new("https://api.example.com", headers).unwrap();
        let result = builder.build(&ApiRequest::get("models"), &BearerAuth::new("k"));
        assert!(matches!(result, Err(RawFailure::Request { .. })));
    }

    #[test]
    fn test_missing_key_is_undispatched_failure() {
        let builder = RequestBuilder::new("https://api.example.com", HashMap::new()).unwrap();
        let result = builder.build(&ApiRequest::get("models"), &BearerAuth::new(""));
        assert!(matches!(result, Err(RawFailure::Request { .. })));
    }
}
