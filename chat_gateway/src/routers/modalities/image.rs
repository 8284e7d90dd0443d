use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_protocol::{
    envelope::{ErrorEnvelope, ImageChatResponse},
    stream::StreamFormat,
};
use tracing::info;

use super::{unexpected_input, unexpected_output, BodyKind, Modality};
use crate::{
    adapter::{completion_text, NO_RESPONSE_FALLBACK},
    config::ProviderConfig,
    normalize::normalize_image,
    provider::{UpstreamOutput, UpstreamRequest},
    routers::{
        context::ParsedInput,
        error::{envelope_response, upstream_status, GatewayError},
    },
};

const PROVIDER_ERROR: &str = "OpenAI API error";
const DEFAULT_ERROR_TYPE: &str = "api_error";

/// Image + prompt, answered with one completion
pub struct ImageModality;

impl Modality for ImageModality {
    fn name(&self) -> &'static str {
        "image"
    }

    fn body_kind(&self) -> BodyKind {
        BodyKind::Form
    }

    fn normalize(
        &self,
        input: ParsedInput,
        provider: &ProviderConfig,
    ) -> Result<UpstreamRequest, GatewayError> {
        match input {
            ParsedInput::Form(form) => normalize_image(form, provider).map(UpstreamRequest::Vision),
            other => Err(unexpected_input(self.name(), &other)),
        }
    }

    fn adapt(&self, output: UpstreamOutput, _format: StreamFormat) -> Response {
        match output {
            UpstreamOutput::Completion(completion) => {
                let response = completion_text(&completion, NO_RESPONSE_FALLBACK);
                info!(response_len = response.len(), "Image analysis completed");
                (StatusCode::OK, Json(ImageChatResponse { response })).into_response()
            }
            other => unexpected_output(self.name(), &other),
        }
    }

    fn error_response(&self, error: GatewayError) -> Response {
        match error {
            GatewayError::Upstream(e) => {
                let status = upstream_status(&e);
                let envelope = ErrorEnvelope::new(PROVIDER_ERROR)
                    .with_details(e.message)
                    .with_type(e.provider_type.unwrap_or_else(|| DEFAULT_ERROR_TYPE.to_string()))
                    .with_status(status.as_u16());
                envelope_response(status, envelope)
            }
            other => other.into_response(),
        }
    }
}
