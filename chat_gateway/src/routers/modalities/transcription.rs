use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_protocol::{
    envelope::{ErrorEnvelope, TranscriptionResult},
    stream::StreamFormat,
};
use tracing::info;

use super::{unexpected_input, unexpected_output, BodyKind, Modality};
use crate::{
    adapter::transcription_text,
    config::ProviderConfig,
    normalize::normalize_audio,
    provider::{UpstreamOutput, UpstreamRequest},
    routers::{
        context::ParsedInput,
        error::{envelope_response, upstream_status, GatewayError},
    },
};

const TRANSCRIBE_FAILED_ERROR: &str = "Failed to transcribe audio";

/// Audio upload, answered with its transcript
pub struct TranscriptionModality;

impl Modality for TranscriptionModality {
    fn name(&self) -> &'static str {
        "transcription"
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
            ParsedInput::Form(form) => {
                normalize_audio(form, provider).map(UpstreamRequest::Transcription)
            }
            other => Err(unexpected_input(self.name(), &other)),
        }
    }

    fn adapt(&self, output: UpstreamOutput, _format: StreamFormat) -> Response {
        match output {
            UpstreamOutput::Transcription(transcription) => {
                let text = transcription_text(transcription);
                info!(text_len = text.len(), "Transcription completed");
                (StatusCode::OK, Json(TranscriptionResult { text })).into_response()
            }
            other => unexpected_output(self.name(), &other),
        }
    }

    fn error_response(&self, error: GatewayError) -> Response {
        match error {
            // Provider answered with an error status: relay its message as-is
            GatewayError::Upstream(e) if e.status.is_some() => {
                envelope_response(upstream_status(&e), ErrorEnvelope::new(e.message))
            }
            GatewayError::Upstream(e) => envelope_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorEnvelope::new(TRANSCRIBE_FAILED_ERROR).with_details(e.message),
            ),
            other => other.into_response(),
        }
    }
}
