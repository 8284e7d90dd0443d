//! Precondition stage: the provider key must be configured

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{PipelineStage, StageResult};
use crate::{
    config::ApiKeySource,
    routers::{context::RequestContext, error::GatewayError},
};

pub(crate) struct PreconditionStage {
    api_key: ApiKeySource,
}

impl PreconditionStage {
    pub fn new(api_key: ApiKeySource) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl PipelineStage for PreconditionStage {
    async fn execute(&self, ctx: &mut RequestContext) -> StageResult {
        // Resolved on every request so a rotated key takes effect immediately
        match self.api_key.resolve() {
            Some(key) => {
                debug!(modality = ctx.modality, "Provider key present");
                ctx.state.api_key = Some(key);
                Ok(None)
            }
            None => {
                warn!(modality = ctx.modality, source = ?self.api_key, "Provider API key is missing");
                Err(GatewayError::missing_key())
            }
        }
    }

    fn name(&self) -> &'static str {
        "precondition"
    }
}
