//! Modality strategies plugged into the shared pipeline
//!
//! A modality decides how its body is decoded, how the decoded input becomes
//! an upstream request, how provider output becomes the client envelope, and
//! how failures are worded.

mod chat;
mod image;
mod key_check;
mod transcription;

use axum::response::{IntoResponse, Response};
pub use chat::ChatModality;
use chat_protocol::stream::StreamFormat;
pub use image::ImageModality;
pub use key_check::{KeyCheckModality, ProviderCheckModality};
pub use transcription::TranscriptionModality;

use super::{context::ParsedInput, error::GatewayError};
use crate::{
    config::ProviderConfig,
    provider::{UpstreamOutput, UpstreamRequest},
};

/// How the inbound body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    /// Body ignored
    Empty,
}

pub trait Modality: Send + Sync {
    fn name(&self) -> &'static str;

    fn body_kind(&self) -> BodyKind;

    /// Validate the decoded input and build the upstream request
    fn normalize(
        &self,
        input: ParsedInput,
        provider: &ProviderConfig,
    ) -> Result<UpstreamRequest, GatewayError>;

    /// Shape successful provider output into the client response
    fn adapt(&self, output: UpstreamOutput, format: StreamFormat) -> Response;

    /// Render a terminal failure
    fn error_response(&self, error: GatewayError) -> Response {
        error.into_response()
    }
}

/// Input shape the modality did not ask for
fn unexpected_input(modality: &str, input: &ParsedInput) -> GatewayError {
    GatewayError::Parse {
        message: "Unexpected request body".to_string(),
        details: Some(format!("{} received a {} body", modality, input.kind())),
    }
}

/// Provider output the modality cannot adapt
fn unexpected_output(modality: &str, output: &UpstreamOutput) -> Response {
    tracing::error!(
        modality,
        output = output.kind(),
        "Provider output does not match modality"
    );
    super::error::pipeline_fault("unexpected_output", "Internal error: unexpected provider output")
}
