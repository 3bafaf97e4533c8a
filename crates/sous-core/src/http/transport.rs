//! HTTP transport: one timed, cancellable exchange with the provider
//!
//! [`Transport`] owns credentials, request building, the timer and the
//! decoding of 2xx bodies. The raw network hop sits behind the
//! [`Connector`] trait so it can be swapped out; [`ReqwestConnector`] is the
//! production implementation. The transport never retries and never
//! classifies: every failure comes back as a [`RawFailure`] value.

use crate::http::auth::{AuthHandler, BearerAuth};
use crate::http::builder::{ApiRequest, RequestBuilder};
use crate::http::cancel::CancelToken;
use crate::http::error::RawFailure;
use crate::http::timeout;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, Method, Url};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A fully built request, ready to dispatch
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// A response as received, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
    /// Parsed `Retry-After` header in seconds
    pub retry_after: Option<u64>,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The raw network hop. Implementations perform exactly one exchange and
/// neither time out nor retry on their own.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, RawFailure>;
}

/// Production connector backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    client: ReqwestClient,
}

impl ReqwestConnector {
    /// Create a connector with the given connect timeout
    pub fn new(connect_timeout: Duration) -> crate::Result<Self> {
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| crate::Error::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e.into()),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Connector for ReqwestConnector {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, RawFailure> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let request = builder.build().map_err(|e| RawFailure::Request {
            message: format!("Failed to build request: {}", e),
        })?;

        let response = self.client.execute(request).await.map_err(|e| {
            // Builder errors surface here when reqwest defers validation
            if e.is_builder() {
                RawFailure::Request {
                    message: e.to_string(),
                }
            } else {
                RawFailure::Network {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());

        let body = response.text().await.map_err(|e| RawFailure::Network {
            message: format!("Failed to read response body: {}", e),
        })?;

        Ok(WireResponse {
            status,
            body,
            retry_after,
        })
    }
}

/// Timed, cancellable transport over a [`Connector`]
pub struct Transport {
    connector: Arc<dyn Connector>,
    builder: RequestBuilder,
    auth: Arc<dyn AuthHandler>,
}

impl Transport {
    /// Create a transport for `api_url` using bearer credentials
    pub fn new(
        connector: Arc<dyn Connector>,
        api_url: &str,
        api_key: &str,
        headers: HashMap<String, String>,
    ) -> crate::Result<Self> {
        let builder = RequestBuilder::new(api_url, headers)
            .map_err(|e| crate::Error::configuration(e.to_string()))?;

        Ok(Self {
            connector,
            builder,
            auth: Arc::new(BearerAuth::new(api_key)),
        })
    }

    /// Base URL of the provider API
    pub fn base_url(&self) -> &Url {
        self.builder.base_url()
    }

    /// Perform one exchange and return the raw response.
    ///
    /// Non-2xx responses are returned as [`RawFailure::Status`].
    pub async fn send_raw(
        &self,
        request: &ApiRequest,
        timeout: Duration,
        token: &CancelToken,
    ) -> Result<WireResponse, RawFailure> {
        let wire = self.builder.build(request, self.auth.as_ref())?;

        tracing::trace!(method = %wire.method, url = %wire.url, "dispatching provider request");
        let response = timeout::race(self.connector.execute(wire), timeout, token).await?;

        if !response.is_success() {
            tracing::debug!(status = response.status, body = %response.body, "provider returned error status");
            return Err(RawFailure::Status {
                status: response.status,
                body: response.body,
                retry_after: response.retry_after,
            });
        }

        Ok(response)
    }

    /// Perform one exchange and decode the 2xx body as `T`
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        timeout: Duration,
        token: &CancelToken,
    ) -> Result<T, RawFailure> {
        let response = self.send_raw(request, timeout, token).await?;
        serde_json::from_str(&response.body).map_err(|e| RawFailure::Decode {
            message: format!("Failed to parse response as JSON: {}", e),
        })
    }
}
