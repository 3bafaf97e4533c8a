//! The reqwest connector against a real HTTP server

use serde_json::{json, Value};
use sous_core::http::{
    classify, ApiRequest, CancelToken, ErrorKind, RawFailure, ReqwestConnector, Transport,
};
use sous_core::{AiClient, ClientConfig, Message};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(base: &str) -> Transport {
    let connector = ReqwestConnector::new(Duration::from_secs(5)).unwrap();
    let headers = HashMap::from([("X-Title".to_string(), "Sous".to_string())]);
    Transport::new(Arc::new(connector), base, "sk-live", headers).unwrap()
}

#[tokio::test]
async fn test_post_carries_credentials_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-live"))
        .and(header("content-type", "application/json"))
        .and(header("x-title", "Sous"))
        .and(body_partial_json(json!({"model": "m"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&format!("{}/api/v1", server.uri()));
    let request = ApiRequest::post("chat/completions", &json!({"model": "m"})).unwrap();
    let value: Value = transport
        .send(&request, Duration::from_secs(5), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn test_rate_limit_reports_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "3")
                .set_body_string(r#"{"error":{"message":"slow down"}}"#),
        )
        .mount(&server)
        .await;

    let result: Result<Value, RawFailure> = transport(&server.uri())
        .send(&ApiRequest::get("models"), Duration::from_secs(5), &CancelToken::new())
        .await;
    let failure = result.unwrap_err();
    assert_eq!(failure.retry_after(), Some(Duration::from_secs(3)));

    let error = classify(&failure);
    assert_eq!(error.kind, ErrorKind::RateLimited);
    assert_eq!(error.status, Some(429));
    assert_eq!(error.detail.as_deref(), Some("slow down"));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let token = CancelToken::new();
    let result: Result<Value, RawFailure> = transport(&server.uri())
        .send(&ApiRequest::get("models"), Duration::from_millis(100), &token)
        .await;
    assert_eq!(classify(&result.unwrap_err()).kind, ErrorKind::AiTimeout);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Bind and drop a server so the port is closed
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let result: Result<Value, RawFailure> = transport(&uri)
        .send(&ApiRequest::get("models"), Duration::from_secs(5), &CancelToken::new())
        .await;
    let failure = result.unwrap_err();
    assert!(matches!(failure, RawFailure::Network { .. }), "{:?}", failure);
    assert_eq!(classify(&failure).kind, ErrorKind::NetworkError);
}

#[tokio::test]
async fn test_client_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("http-referer", "https://sous.test"))
        .and(body_partial_json(json!({
            "model": "openai/gpt-4o-mini",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-9",
            "model": "openai/gpt-4o-mini",
            "created": 1,
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"title\":\"T\",\"content\":\"C\"}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new("sk-live")
        .with_api_url(server.uri())
        .with_app_identity("https://sous.test", "Sous Test");
    let client = AiClient::new(config).unwrap();

    let payload = client.build_payload(vec![Message::user("soup")]);
    let response = client.complete(&client.orchestrator(), &payload).await.unwrap();
    assert_eq!(response.id, "gen-9");
    assert_eq!(
        response.first_content(),
        Some("{\"title\":\"T\",\"content\":\"C\"}")
    );
}
