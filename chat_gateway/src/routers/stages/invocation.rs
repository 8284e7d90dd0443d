//! Invocation stage: exactly one provider call

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{missing_state, PipelineStage, StageResult};
use crate::{
    provider::{self, UpstreamProvider},
    routers::context::RequestContext,
};

pub(crate) struct InvocationStage {
    provider: Arc<dyn UpstreamProvider>,
}

impl InvocationStage {
    pub fn new(provider: Arc<dyn UpstreamProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl PipelineStage for InvocationStage {
    async fn execute(&self, ctx: &mut RequestContext) -> StageResult {
        let key = ctx
            .state
            .api_key
            .take()
            .ok_or_else(|| missing_state(self.name(), "an API key"))?;
        let request = ctx
            .state
            .upstream_request
            .take()
            .ok_or_else(|| missing_state(self.name(), "an upstream request"))?;

        match provider::invoke(self.provider.as_ref(), &key, request).await {
            Ok(output) => {
                debug!(
                    modality = ctx.modality,
                    elapsed_ms = ctx.elapsed_ms(),
                    "Provider call succeeded"
                );
                ctx.state.upstream_output = Some(output);
                Ok(None)
            }
            Err(e) => {
                warn!(
                    modality = ctx.modality,
                    provider = self.provider.name(),
                    upstream_status = ?e.status,
                    provider_type = e.provider_type.as_deref().unwrap_or(""),
                    elapsed_ms = ctx.elapsed_ms(),
                    "Provider call failed"
                );
                Err(e.into())
            }
        }
    }

    fn name(&self) -> &'static str {
        "invocation"
    }
}
