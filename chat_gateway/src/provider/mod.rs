//! Provider Gateway
//!
//! Performs exactly one outbound call per request against the upstream
//! model provider, in one of two transport modes:
//! - streaming: a live sequence of [`StreamEvent`]s, never buffered here
//! - blocking: a fully materialized response object
//!
//! Failures are surfaced as [`UpstreamError`] with the provider-reported status
//! preserved. Nothing is retried.

mod openai;
pub mod sse;
mod utils;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chat_protocol::{
    chat::{ChatCompletionRequest, ChatCompletionResponse},
    transcription::TranscriptionResponse,
};
use futures::Stream;
pub use openai::OpenAiProvider;
use thiserror::Error;
use tracing::debug;
pub use utils::sanitize_provider_message;

use crate::config::ApiKey;

/// Failure of an outbound provider call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    /// HTTP status reported by the provider; `None` for transport failures
    pub status: Option<u16>,
    pub message: String,
    /// Provider error type (e.g. `invalid_request_error`)
    pub provider_type: Option<String>,
}

impl UpstreamError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            provider_type: None,
        }
    }

    pub fn with_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = Some(provider_type.into());
        self
    }

    /// Failure that happened after the provider accepted the request
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(None, message).with_type("stream_error")
    }
}

/// One item of a streamed completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Finish(String),
}

pub type TextDeltaStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, UpstreamError>> + Send>>;

/// Audio payload for the transcription endpoint
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Bytes,
    pub file_name: String,
    pub model: String,
}

/// Upstream operations the gateway needs.
///
/// The key is passed on every call so it is never captured at construction.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn stream_chat(
        &self,
        key: &ApiKey,
        request: ChatCompletionRequest,
    ) -> Result<TextDeltaStream, UpstreamError>;

    async fn complete_chat(
        &self,
        key: &ApiKey,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, UpstreamError>;

    async fn transcribe(
        &self,
        key: &ApiKey,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, UpstreamError>;
}

// ============================================================================
// Normalized request / materialized output
// ============================================================================

/// Upstream-ready request produced by the Input Normalizer
#[derive(Debug, Clone)]
pub enum UpstreamRequest {
    /// Conversation turn, streamed back
    Chat(ChatCompletionRequest),
    /// Image + prompt completion
    Vision(ChatCompletionRequest),
    /// Credential probe completion
    Probe(ChatCompletionRequest),
    Transcription(TranscriptionRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Streaming,
    Blocking,
}

impl UpstreamRequest {
    pub fn transport_mode(&self) -> TransportMode {
        match self {
            UpstreamRequest::Chat(_) => TransportMode::Streaming,
            _ => TransportMode::Blocking,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamRequest::Chat(_) => "chat",
            UpstreamRequest::Vision(_) => "vision",
            UpstreamRequest::Probe(_) => "probe",
            UpstreamRequest::Transcription(_) => "transcription",
        }
    }
}

/// Provider output handed to the Response Adapter
pub enum UpstreamOutput {
    Stream(TextDeltaStream),
    Completion(ChatCompletionResponse),
    Transcription(TranscriptionResponse),
}

impl UpstreamOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamOutput::Stream(_) => "stream",
            UpstreamOutput::Completion(_) => "completion",
            UpstreamOutput::Transcription(_) => "transcription",
        }
    }
}

impl std::fmt::Debug for UpstreamOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamOutput::Stream(_) => f.write_str("Stream(<deltas>)"),
            UpstreamOutput::Completion(c) => f.debug_tuple("Completion").field(c).finish(),
            UpstreamOutput::Transcription(t) => f.debug_tuple("Transcription").field(t).finish(),
        }
    }
}

/// Issue the single outbound call for `request`
pub async fn invoke(
    provider: &dyn UpstreamProvider,
    key: &ApiKey,
    request: UpstreamRequest,
) -> Result<UpstreamOutput, UpstreamError> {
    debug!(
        provider = provider.name(),
        kind = request.kind(),
        mode = ?request.transport_mode(),
        "Invoking upstream provider"
    );

    match request {
        UpstreamRequest::Chat(req) => provider.stream_chat(key, req).await.map(UpstreamOutput::Stream),
        UpstreamRequest::Vision(req) | UpstreamRequest::Probe(req) => provider
            .complete_chat(key, req)
            .await
            .map(UpstreamOutput::Completion),
        UpstreamRequest::Transcription(req) => provider
            .transcribe(key, req)
            .await
            .map(UpstreamOutput::Transcription),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_kind_omits_payload() {
        let completion = UpstreamOutput::Completion(ChatCompletionResponse::default());
        assert_eq!(completion.kind(), "completion");

        let transcription = UpstreamOutput::Transcription(TranscriptionResponse {
            text: Some("secret words".to_string()),
        });
        assert_eq!(transcription.kind(), "transcription");
        assert!(!transcription.kind().contains("secret"));
    }
}
