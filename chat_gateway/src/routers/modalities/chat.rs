use axum::response::{IntoResponse, Response};
use chat_protocol::{envelope::ErrorEnvelope, stream::StreamFormat};

use super::{unexpected_input, unexpected_output, BodyKind, Modality};
use crate::{
    adapter::streaming_response,
    config::ProviderConfig,
    normalize::normalize_chat,
    provider::{UpstreamOutput, UpstreamRequest},
    routers::{
        context::ParsedInput,
        error::{envelope_response, upstream_status, GatewayError},
    },
};

const CHAT_FAILED_ERROR: &str = "Failed to process chat request";

/// Conversation turn, answered as a live stream
pub struct ChatModality;

impl Modality for ChatModality {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn body_kind(&self) -> BodyKind {
        BodyKind::Json
    }

    fn normalize(
        &self,
        input: ParsedInput,
        provider: &ProviderConfig,
    ) -> Result<UpstreamRequest, GatewayError> {
        match input {
            ParsedInput::Json(body) => normalize_chat(body, provider).map(UpstreamRequest::Chat),
            other => Err(unexpected_input(self.name(), &other)),
        }
    }

    fn adapt(&self, output: UpstreamOutput, format: StreamFormat) -> Response {
        match output {
            UpstreamOutput::Stream(stream) => streaming_response(stream, format),
            other => unexpected_output(self.name(), &other),
        }
    }

    fn error_response(&self, error: GatewayError) -> Response {
        match error {
            GatewayError::Upstream(e) => envelope_response(
                upstream_status(&e),
                ErrorEnvelope::new(CHAT_FAILED_ERROR).with_details(e.message),
            ),
            other => other.into_response(),
        }
    }
}
