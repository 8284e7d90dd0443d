use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_protocol::{
    chat::{ChatCompletionRequest, Role, UpstreamMessage},
    envelope::{KeyCheckResponse, ProviderCheckResponse},
    stream::StreamFormat,
};

use super::{unexpected_output, BodyKind, Modality};
use crate::{
    adapter::completion_text,
    config::ProviderConfig,
    provider::{UpstreamOutput, UpstreamRequest},
    routers::{context::ParsedInput, error::GatewayError},
};

pub const PROBE_MESSAGE: &str =
    "Hello, this is a test message. Please respond with 'API key is working'.";
const PROBE_FALLBACK: &str = "No response";
const KEY_NOT_SET_ERROR: &str = "OpenAI API key is not set in environment variables";
const NO_DETAILS: &str = "No additional details";

const GREETING_MESSAGE: &str = "Say hello";
const GREETING_MAX_TOKENS: u32 = 10;

/// Credential probe: one tiny completion to prove the key works
pub struct KeyCheckModality;

impl Modality for KeyCheckModality {
    fn name(&self) -> &'static str {
        "key_check"
    }

    fn body_kind(&self) -> BodyKind {
        BodyKind::Empty
    }

    fn normalize(
        &self,
        _input: ParsedInput,
        provider: &ProviderConfig,
    ) -> Result<UpstreamRequest, GatewayError> {
        let request = ChatCompletionRequest::new(
            provider.probe_model.clone(),
            vec![UpstreamMessage::text(Role::User, PROBE_MESSAGE)],
        )
        .with_max_tokens(provider.probe_max_tokens);
        Ok(UpstreamRequest::Probe(request))
    }

    fn adapt(&self, output: UpstreamOutput, _format: StreamFormat) -> Response {
        match output {
            UpstreamOutput::Completion(completion) => (
                StatusCode::OK,
                Json(KeyCheckResponse::valid(completion_text(
                    &completion,
                    PROBE_FALLBACK,
                ))),
            )
                .into_response(),
            other => unexpected_output(self.name(), &other),
        }
    }

    /// Always 500: this endpoint reports key validity, not provider status.
    fn error_response(&self, error: GatewayError) -> Response {
        let body = match error {
            GatewayError::Config(_) => KeyCheckResponse::invalid(KEY_NOT_SET_ERROR, None),
            GatewayError::Upstream(e) => {
                let details = match (e.status, e.provider_type) {
                    (Some(status), Some(t)) => format!("{} ({})", t, status),
                    (Some(status), None) => format!("Provider status {}", status),
                    (None, Some(t)) => t,
                    (None, None) => NO_DETAILS.to_string(),
                };
                KeyCheckResponse::invalid(e.message, Some(details))
            }
            other => KeyCheckResponse::invalid(other.to_string(), None),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Provider smoke test: a short greeting, reporting which model answered
pub struct ProviderCheckModality {
    model: String,
}

impl ProviderCheckModality {
    pub fn new(provider: &ProviderConfig) -> Self {
        Self {
            model: provider.probe_model.clone(),
        }
    }
}

impl Modality for ProviderCheckModality {
    fn name(&self) -> &'static str {
        "provider_check"
    }

    fn body_kind(&self) -> BodyKind {
        BodyKind::Empty
    }

    fn normalize(
        &self,
        _input: ParsedInput,
        _provider: &ProviderConfig,
    ) -> Result<UpstreamRequest, GatewayError> {
        let request = ChatCompletionRequest::new(
            self.model.clone(),
            vec![UpstreamMessage::text(Role::User, GREETING_MESSAGE)],
        )
        .with_max_tokens(GREETING_MAX_TOKENS);
        Ok(UpstreamRequest::Probe(request))
    }

    fn adapt(&self, output: UpstreamOutput, _format: StreamFormat) -> Response {
        match output {
            UpstreamOutput::Completion(completion) => Json(ProviderCheckResponse::ok(
                completion_text(&completion, PROBE_FALLBACK),
                self.model.clone(),
            ))
            .into_response(),
            other => unexpected_output(self.name(), &other),
        }
    }

    fn error_response(&self, error: GatewayError) -> Response {
        let message = match error {
            GatewayError::Upstream(e) => e.message,
            other => other.to_string(),
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ProviderCheckResponse::failed(message)),
        )
            .into_response()
    }
}
