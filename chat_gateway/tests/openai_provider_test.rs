//! Tests of the reqwest-backed provider against a stub OpenAI-compatible
//! server bound to an ephemeral local port

mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chat_gateway::{
    app_context::AppContext,
    config::{ApiKey, ApiKeySource, GatewayConfig},
    protocols::chat::{ChatCompletionRequest, Role, UpstreamMessage},
    provider::{OpenAiProvider, StreamEvent, TranscriptionRequest, UpstreamProvider},
    server::{build_app, AppState},
};
use common::{body_json, body_string, multipart_body, multipart_content_type, FormPart, TEST_KEY};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

async fn spawn_stub(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", TEST_KEY);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "message": "Incorrect API key provided for organization org-abc123.",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })),
    )
        .into_response()
}

fn sse_chunk(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]})
    )
}

fn sse_body(deltas: &[&str], done: bool) -> String {
    let mut body: String = deltas.iter().map(|d| sse_chunk(d)).collect();
    if done {
        body.push_str(&format!(
            "data: {}\n\n",
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]})
        ));
        body.push_str("data: [DONE]\n\n");
    }
    body
}

async fn chat_completions(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body["stream"] == json!(true) {
        return (
            [(header::CONTENT_TYPE, "text/event-stream")],
            sse_body(&["Hel", "lo ", "wörld"], true),
        )
            .into_response();
    }
    Json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": format!("model={}", body["model"].as_str().unwrap_or(""))},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

async fn truncated_stream(_body: Bytes) -> Response {
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        sse_body(&["cut"], false),
    )
        .into_response()
}

async fn transcriptions(headers: HeaderMap, body: Bytes) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let text = String::from_utf8_lossy(&body);
    let has_file = text.contains("name=\"file\"; filename=\"clip.webm\"");
    let has_model = text.contains("name=\"model\"") && text.contains("whisper-1");
    if !(has_file && has_model) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"message": "malformed upload", "type": "invalid_request_error"}})),
        )
            .into_response();
    }
    Json(json!({"text": "transcribed"})).into_response()
}

fn stub_router() -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/audio/transcriptions", post(transcriptions))
}

fn provider(base_url: &str) -> OpenAiProvider {
    OpenAiProvider::new(reqwest::Client::new(), base_url, Duration::from_secs(5))
}

fn key() -> ApiKey {
    ApiKey::new(TEST_KEY).unwrap()
}

fn probe_request(stream: bool) -> ChatCompletionRequest {
    let req = ChatCompletionRequest::new(
        "gpt-3.5-turbo",
        vec![UpstreamMessage::text(Role::User, "ping")],
    );
    if stream {
        req.streaming()
    } else {
        req
    }
}

#[tokio::test]
async fn test_complete_chat() {
    let base = spawn_stub(stub_router()).await;
    let completion = provider(&base)
        .complete_chat(&key(), probe_request(false))
        .await
        .unwrap();
    assert_eq!(completion.first_content(), Some("model=gpt-3.5-turbo"));
}

#[tokio::test]
async fn test_stream_chat_yields_deltas_in_order() {
    let base = spawn_stub(stub_router()).await;
    let stream = provider(&base)
        .stream_chat(&key(), probe_request(false))
        .await
        .unwrap();
    let events: Vec<_> = stream.collect().await;
    assert_eq!(
        events,
        vec![
            Ok(StreamEvent::Delta("Hel".to_string())),
            Ok(StreamEvent::Delta("lo ".to_string())),
            Ok(StreamEvent::Delta("wörld".to_string())),
            Ok(StreamEvent::Finish("stop".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_provider_error_status_preserved_and_sanitized() {
    let base = spawn_stub(stub_router()).await;
    let bad_key = ApiKey::new("sk-wrong").unwrap();
    let err = provider(&base)
        .complete_chat(&bad_key, probe_request(false))
        .await
        .unwrap_err();
    assert_eq!(err.status, Some(401));
    assert_eq!(err.provider_type.as_deref(), Some("invalid_request_error"));
    assert!(err.message.starts_with("Incorrect API key provided"));
    assert!(!err.message.contains("org-abc123"));
}

#[tokio::test]
async fn test_connection_failure_has_no_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = provider(&format!("http://{}/v1", addr))
        .complete_chat(&key(), probe_request(false))
        .await
        .unwrap_err();
    assert_eq!(err.status, None);
    assert_eq!(err.provider_type.as_deref(), Some("connection_error"));
}

#[tokio::test]
async fn test_transcribe_sends_file_and_model() {
    let base = spawn_stub(stub_router()).await;
    let result = provider(&base)
        .transcribe(
            &key(),
            TranscriptionRequest {
                audio: Bytes::from_static(b"\x1a\x45\xdf\xa3"),
                file_name: "clip.webm".to_string(),
                model: "whisper-1".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(result.text.as_deref(), Some("transcribed"));
}

fn gateway_config(base_url: &str) -> GatewayConfig {
    GatewayConfig::builder()
        .provider_base_url(base_url)
        .api_key_source(ApiKeySource::fixed(TEST_KEY))
        .request_timeout_secs(5)
        .build()
        .unwrap()
}

fn gateway(base_url: &str) -> Router {
    let context = AppContext::new(gateway_config(base_url)).unwrap();
    build_app(AppState::new(Arc::new(context)))
}

#[tokio::test]
async fn test_gateway_chat_end_to_end() {
    let base = spawn_stub(stub_router()).await;
    let req = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"messages": [{"role": "user", "content": "hi"}]}).to_string(),
        ))
        .unwrap();

    let resp = gateway(&base).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(&lines[1..], &["0:\"Hel\"", "0:\"lo \"", "0:\"wörld\"", "d:{\"finishReason\":\"stop\"}"]);
}

#[tokio::test]
async fn test_gateway_truncated_stream_reports_error() {
    let stub = Router::new().route("/v1/chat/completions", post(truncated_stream));
    let base = spawn_stub(stub).await;
    let req = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"messages": []}"#))
        .unwrap();

    let resp = gateway(&base).oneshot(req).await.unwrap();
    let body = body_string(resp).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[1], "0:\"cut\"");
    assert_eq!(lines[2], "3:\"Upstream stream ended before completion\"");
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_gateway_transcribe_end_to_end() {
    let base = spawn_stub(stub_router()).await;
    let req = Request::builder()
        .method("POST")
        .uri("/transcribe")
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(&[FormPart::File {
            name: "audio",
            file_name: "clip.webm",
            content_type: "audio/webm",
            data: b"\x1a\x45\xdf\xa3",
        }])))
        .unwrap();

    let resp = gateway(&base).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"text": "transcribed"}));
}

#[tokio::test]
async fn test_gateway_key_check_rejected() {
    let base = spawn_stub(stub_router()).await;
    let config = GatewayConfig::builder()
        .provider_base_url(base.as_str())
        .api_key_source(ApiKeySource::fixed("sk-wrong"))
        .build()
        .unwrap();
    let app = build_app(AppState::new(Arc::new(AppContext::new(config).unwrap())));

    let resp = app
        .oneshot(Request::builder().uri("/diagnostics/key").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["apiKeyStatus"], json!("invalid"));
    assert!(!body["error"].as_str().unwrap().contains("org-abc123"));
}
