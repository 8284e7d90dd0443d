//! Parse stage: decode the inbound body for the modality's content type

use async_trait::async_trait;
use tracing::debug;

use super::{missing_state, PipelineStage, StageResult};
use crate::{
    normalize::read_multipart,
    routers::{
        context::{ParsedInput, RequestContext},
        error::{GatewayError, BODY_PARSE_ERROR},
        modalities::BodyKind,
    },
};

pub(crate) struct ParseStage {
    body_kind: BodyKind,
    max_payload_size: usize,
    max_upload_bytes: Option<usize>,
}

impl ParseStage {
    pub fn new(body_kind: BodyKind, max_payload_size: usize, max_upload_bytes: Option<usize>) -> Self {
        Self {
            body_kind,
            max_payload_size,
            max_upload_bytes,
        }
    }
}

#[async_trait]
impl PipelineStage for ParseStage {
    async fn execute(&self, ctx: &mut RequestContext) -> StageResult {
        let body = ctx
            .input
            .body
            .take()
            .ok_or_else(|| missing_state(self.name(), "a request body"))?;

        let parsed = match self.body_kind {
            BodyKind::Json => {
                let bytes = axum::body::to_bytes(body, self.max_payload_size)
                    .await
                    .map_err(|e| GatewayError::Parse {
                        message: BODY_PARSE_ERROR.to_string(),
                        details: Some(e.to_string()),
                    })?;
                let value = serde_json::from_slice(&bytes).map_err(|e| GatewayError::Parse {
                    message: BODY_PARSE_ERROR.to_string(),
                    details: Some(e.to_string()),
                })?;
                debug!(modality = ctx.modality, body_len = bytes.len(), "Parsed JSON body");
                ParsedInput::Json(value)
            }
            BodyKind::Form => {
                let form = read_multipart(
                    &ctx.input.headers,
                    body,
                    self.max_payload_size,
                    self.max_upload_bytes,
                )
                .await?;
                debug!(
                    modality = ctx.modality,
                    fields = form.fields().len(),
                    total_bytes = form.total_bytes(),
                    "Parsed form body"
                );
                ParsedInput::Form(form)
            }
            BodyKind::Empty => ParsedInput::Empty,
        };

        ctx.state.parsed = Some(parsed);
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "parse"
    }
}
