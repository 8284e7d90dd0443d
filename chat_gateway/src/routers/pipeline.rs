//! Request Handler pipeline
//!
//! One `ModalityPipeline` per endpoint chains the five shared stages and
//! renders failures through the modality, so every request ends in exactly
//! one response: the success envelope or a JSON error envelope.

use std::sync::Arc;

use axum::{extract::Request, response::Response};
use tracing::{debug, error, info, warn};

use super::{
    context::RequestContext,
    error::pipeline_fault,
    modalities::Modality,
    stages::{
        AdaptationStage, InvocationStage, ParseStage, PipelineStage, PreconditionStage,
        ValidationStage,
    },
};
use crate::app_context::AppContext;

pub struct ModalityPipeline {
    modality: Arc<dyn Modality>,
    stages: Vec<Box<dyn PipelineStage>>,
}

impl ModalityPipeline {
    pub fn new(modality: Arc<dyn Modality>, context: &AppContext) -> Self {
        let config = &context.config;
        let stages: Vec<Box<dyn PipelineStage>> = vec![
            Box::new(PreconditionStage::new(config.provider.api_key.clone())),
            Box::new(ParseStage::new(
                modality.body_kind(),
                config.max_payload_size,
                config.max_upload_bytes,
            )),
            Box::new(ValidationStage::new(
                modality.clone(),
                config.provider.clone(),
            )),
            Box::new(InvocationStage::new(context.provider.clone())),
            Box::new(AdaptationStage::new(modality.clone(), config.stream_format)),
        ];

        Self { modality, stages }
    }

    pub async fn execute(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let mut ctx = RequestContext::new(self.modality.name(), parts.headers, body);

        debug!(modality = ctx.modality, "Processing request through pipeline");

        for stage in &self.stages {
            let stage_name = stage.name();
            debug!(stage = %stage_name, "Executing pipeline stage");

            match stage.execute(&mut ctx).await {
                Ok(Some(response)) => {
                    info!(
                        modality = ctx.modality,
                        status = %response.status(),
                        elapsed_ms = ctx.elapsed_ms(),
                        "Request completed"
                    );
                    return response;
                }
                Ok(None) => {
                    debug!(stage = %stage_name, "Stage completed, continuing");
                }
                Err(e) => {
                    warn!(
                        modality = ctx.modality,
                        stage = %stage_name,
                        kind = e.kind(),
                        status = %e.status(),
                        error = %e,
                        elapsed_ms = ctx.elapsed_ms(),
                        "Request failed"
                    );
                    return self.modality.error_response(e);
                }
            }
        }

        error!(modality = ctx.modality, "Pipeline completed without producing a response");
        pipeline_fault(
            "no_response",
            "Internal error: pipeline completed without response",
        )
    }
}

impl std::fmt::Debug for ModalityPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalityPipeline")
            .field("modality", &self.modality.name())
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
