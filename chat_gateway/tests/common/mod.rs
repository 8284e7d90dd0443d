//! Shared fixtures for gateway integration tests
#![allow(dead_code)]

use std::{
    io::Cursor,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::{body::Body, http::Response, Router};
use chat_gateway::{
    app_context::AppContext,
    config::{ApiKey, ApiKeySource, GatewayConfig},
    protocols::{
        chat::{AssistantMessage, ChatCompletionRequest, ChatCompletionResponse, Choice},
        transcription::TranscriptionResponse,
    },
    provider::{StreamEvent, TextDeltaStream, TranscriptionRequest, UpstreamError, UpstreamProvider},
    server::{build_app, AppState},
};
use futures::{stream, StreamExt};
use serde_json::Value;

pub const TEST_KEY: &str = "sk-test-key";

/// Sets a flag when dropped; used to observe provider stream teardown
struct DropGuard(Arc<AtomicBool>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Provider double that counts calls and replays canned replies
pub struct MockProvider {
    calls: AtomicUsize,
    stream_events: Vec<Result<StreamEvent, UpstreamError>>,
    /// Keep the stream open after the canned events
    hang_after_events: bool,
    stream_dropped: Arc<AtomicBool>,
    completion: ChatCompletionResponse,
    transcription: TranscriptionResponse,
    error: Option<UpstreamError>,
    pub last_chat: Mutex<Option<ChatCompletionRequest>>,
    pub last_transcription: Mutex<Option<TranscriptionRequest>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            stream_events: vec![
                Ok(StreamEvent::Delta("Hello".to_string())),
                Ok(StreamEvent::Delta(", how can I help?".to_string())),
                Ok(StreamEvent::Finish("stop".to_string())),
            ],
            hang_after_events: false,
            stream_dropped: Arc::new(AtomicBool::new(false)),
            completion: completion_with(Some("red")),
            transcription: TranscriptionResponse {
                text: Some("hello world".to_string()),
            },
            error: None,
            last_chat: Mutex::new(None),
            last_transcription: Mutex::new(None),
        }
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(mut self, events: Vec<Result<StreamEvent, UpstreamError>>) -> Self {
        self.stream_events = events;
        self
    }

    pub fn hanging_stream(mut self) -> Self {
        self.hang_after_events = true;
        self
    }

    pub fn with_completion(mut self, completion: ChatCompletionResponse) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_transcription(mut self, transcription: TranscriptionResponse) -> Self {
        self.transcription = transcription;
        self
    }

    pub fn failing(mut self, error: UpstreamError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UpstreamProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn stream_chat(
        &self,
        _key: &ApiKey,
        request: ChatCompletionRequest,
    ) -> Result<TextDeltaStream, UpstreamError> {
        self.record_call()?;
        *self.last_chat.lock().unwrap() = Some(request);

        let guard = DropGuard(self.stream_dropped.clone());
        let events = stream::iter(self.stream_events.clone());
        let tail = if self.hang_after_events {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };
        Ok(Box::pin(events.chain(tail).map(move |item| {
            let _guard = &guard;
            item
        })))
    }

    async fn complete_chat(
        &self,
        _key: &ApiKey,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, UpstreamError> {
        self.record_call()?;
        *self.last_chat.lock().unwrap() = Some(request);
        Ok(self.completion.clone())
    }

    async fn transcribe(
        &self,
        _key: &ApiKey,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, UpstreamError> {
        self.record_call()?;
        *self.last_transcription.lock().unwrap() = Some(request);
        Ok(self.transcription.clone())
    }
}

pub fn completion_with(content: Option<&str>) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: Some("chatcmpl-test".to_string()),
        choices: vec![Choice {
            message: Some(AssistantMessage {
                content: content.map(str::to_string),
            }),
            finish_reason: Some("stop".to_string()),
        }],
    }
}

pub fn test_config(key: ApiKeySource) -> GatewayConfig {
    GatewayConfig::builder()
        .host("127.0.0.1")
        .port(0)
        .api_key_source(key)
        .build_unchecked()
}

pub fn create_app(provider: Arc<MockProvider>, key: ApiKeySource) -> Router {
    create_app_with_config(provider, test_config(key))
}

pub fn create_app_with_config(provider: Arc<MockProvider>, config: GatewayConfig) -> Router {
    let context = AppContext::with_provider(config, provider);
    build_app(AppState::new(Arc::new(context)))
}

pub fn keyed_app(provider: Arc<MockProvider>) -> Router {
    create_app(provider, ApiKeySource::fixed(TEST_KEY))
}

// ============================================================================
// Multipart bodies
// ============================================================================

pub const BOUNDARY: &str = "----chat-gateway-test-boundary";

pub enum FormPart<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    /// Text part that carries its own Content-Type header
    TypedText {
        name: &'a str,
        content_type: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::TypedText {
                name,
                content_type,
                value,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// 10x10 solid red PNG
pub fn red_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(10, 10, image::Rgb([255, 0, 0]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode png");
    buf
}

// ============================================================================
// Response helpers
// ============================================================================

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf-8 body")
}
