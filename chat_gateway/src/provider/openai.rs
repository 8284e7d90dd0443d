//! OpenAI-compatible provider client
//!
//! Calls `{base_url}/chat/completions` (streaming and blocking) and
//! `{base_url}/audio/transcriptions`, authenticating with a bearer key that is
//! supplied per call.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chat_protocol::{
    chat::{ChatCompletionRequest, ChatCompletionResponse},
    transcription::TranscriptionResponse,
};
use http::header;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{
    sse,
    utils::{error_from_response, error_from_transport},
    TextDeltaStream, TranscriptionRequest, UpstreamError, UpstreamProvider,
};
use crate::config::ApiKey;

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send and classify the outcome; non-2xx responses become errors.
    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, UpstreamError> {
        let start = Instant::now();
        let response = builder.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request to provider failed");
            error_from_transport(&e)
        })?;

        let status = response.status();
        debug!(
            url = %url,
            status = %status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Received response from provider"
        );

        if !status.is_success() {
            let err = error_from_response(response).await;
            warn!(
                url = %url,
                status = %status,
                provider_type = err.provider_type.as_deref().unwrap_or(""),
                "Provider returned error"
            );
            return Err(err);
        }
        Ok(response)
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, UpstreamError> {
        response.json::<T>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse provider response");
            UpstreamError::new(None, format!("Invalid response from provider: {}", e))
                .with_type("parse_error")
        })
    }
}

#[async_trait]
impl UpstreamProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn stream_chat(
        &self,
        key: &ApiKey,
        request: ChatCompletionRequest,
    ) -> Result<TextDeltaStream, UpstreamError> {
        let url = self.endpoint("chat/completions");
        let request = request.streaming();
        debug!(
            url = %url,
            model = %request.model,
            message_count = request.messages.len(),
            "Sending streaming chat request"
        );

        let builder = self
            .client
            .post(&url)
            .bearer_auth(key.expose())
            .header(header::ACCEPT, "text/event-stream")
            .json(&request);

        // Only the wait for response headers is bounded here; the body may
        // stream for as long as the provider keeps producing it.
        let response = match tokio::time::timeout(self.timeout, self.send(builder, &url)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(url = %url, timeout_secs = self.timeout.as_secs(), "Provider did not respond in time");
                return Err(UpstreamError::new(
                    None,
                    format!("Request timeout: no response within {}s", self.timeout.as_secs()),
                )
                .with_type("timeout"));
            }
        };

        Ok(Box::pin(sse::chunk_stream(response.bytes_stream())))
    }

    async fn complete_chat(
        &self,
        key: &ApiKey,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, UpstreamError> {
        let url = self.endpoint("chat/completions");
        debug!(
            url = %url,
            model = %request.model,
            message_count = request.messages.len(),
            "Sending chat completion request"
        );

        let builder = self
            .client
            .post(&url)
            .bearer_auth(key.expose())
            .timeout(self.timeout)
            .json(&request);
        let response = self.send(builder, &url).await?;
        let completion: ChatCompletionResponse = Self::parse_json(response).await?;

        info!(
            model = %request.model,
            choices = completion.choices.len(),
            "Completed chat completion request"
        );
        Ok(completion)
    }

    async fn transcribe(
        &self,
        key: &ApiKey,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, UpstreamError> {
        let url = self.endpoint("audio/transcriptions");
        debug!(
            url = %url,
            model = %request.model,
            audio_bytes = request.audio.len(),
            "Sending transcription request"
        );

        let part = Part::bytes(request.audio.to_vec()).file_name(request.file_name);
        let form = Form::new()
            .part("file", part)
            .text("model", request.model.clone());

        let builder = self
            .client
            .post(&url)
            .bearer_auth(key.expose())
            .timeout(self.timeout)
            .multipart(form);
        let response = self.send(builder, &url).await?;
        let transcription: TranscriptionResponse = Self::parse_json(response).await?;

        info!(
            model = %request.model,
            text_len = transcription.text.as_deref().map(str::len).unwrap_or(0),
            "Completed transcription request"
        );
        Ok(transcription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let provider = OpenAiProvider::new(
            reqwest::Client::new(),
            "http://localhost:8080/v1/",
            Duration::from_secs(5),
        );
        assert_eq!(
            provider.endpoint("chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }
}
