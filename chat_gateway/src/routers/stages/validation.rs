//! Validation stage: required fields present, upstream request built

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{missing_state, PipelineStage, StageResult};
use crate::{
    config::ProviderConfig,
    routers::{context::RequestContext, modalities::Modality},
};

pub(crate) struct ValidationStage {
    modality: Arc<dyn Modality>,
    provider: ProviderConfig,
}

impl ValidationStage {
    pub fn new(modality: Arc<dyn Modality>, provider: ProviderConfig) -> Self {
        Self { modality, provider }
    }
}

#[async_trait]
impl PipelineStage for ValidationStage {
    async fn execute(&self, ctx: &mut RequestContext) -> StageResult {
        let parsed = ctx
            .state
            .parsed
            .take()
            .ok_or_else(|| missing_state(self.name(), "parsed input"))?;

        let input_kind = parsed.kind();
        let request = self.modality.normalize(parsed, &self.provider)?;
        debug!(
            modality = ctx.modality,
            input = input_kind,
            upstream = request.kind(),
            "Built upstream request"
        );

        ctx.state.upstream_request = Some(request);
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "validation"
    }
}
