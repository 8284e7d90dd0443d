//! Adaptation stage: provider output to client envelope

use std::sync::Arc;

use async_trait::async_trait;
use chat_protocol::stream::StreamFormat;

use super::{missing_state, PipelineStage, StageResult};
use crate::routers::{context::RequestContext, modalities::Modality};

pub(crate) struct AdaptationStage {
    modality: Arc<dyn Modality>,
    stream_format: StreamFormat,
}

impl AdaptationStage {
    pub fn new(modality: Arc<dyn Modality>, stream_format: StreamFormat) -> Self {
        Self {
            modality,
            stream_format,
        }
    }
}

#[async_trait]
impl PipelineStage for AdaptationStage {
    async fn execute(&self, ctx: &mut RequestContext) -> StageResult {
        let output = ctx
            .state
            .upstream_output
            .take()
            .ok_or_else(|| missing_state(self.name(), "provider output"))?;

        Ok(Some(self.modality.adapt(output, self.stream_format)))
    }

    fn name(&self) -> &'static str {
        "adaptation"
    }
}
