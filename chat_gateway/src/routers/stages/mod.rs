//! Pipeline stages shared by every modality
//!
//! Each stage performs one step of request processing and either continues,
//! returns the final response, or fails with a [`GatewayError`].
//!
//! ## Stage Order
//!
//! 1. **Precondition** - Provider key present
//! 2. **Parse** - Body decodable for the modality's content type
//! 3. **Validation** - Required fields present; build the upstream request
//! 4. **Invocation** - Exactly one provider call
//! 5. **Adaptation** - Shape provider output into the client envelope

mod adaptation;
mod invocation;
mod parse;
mod precondition;
mod validation;

pub(crate) use adaptation::AdaptationStage;
use async_trait::async_trait;
use axum::response::Response;
pub(crate) use invocation::InvocationStage;
pub(crate) use parse::ParseStage;
pub(crate) use precondition::PreconditionStage;
pub(crate) use validation::ValidationStage;

use super::{context::RequestContext, error::GatewayError};

/// Result type for pipeline stage execution
///
/// - `Ok(None)` - Stage completed, continue to next stage
/// - `Ok(Some(response))` - Terminal success response
/// - `Err(error)` - Terminal failure, rendered by the modality
pub(crate) type StageResult = Result<Option<Response>, GatewayError>;

#[async_trait]
pub(crate) trait PipelineStage: Send + Sync {
    async fn execute(&self, ctx: &mut RequestContext) -> StageResult;

    /// Stage name for logging
    fn name(&self) -> &'static str;
}

/// Stage ran out of order and found its input missing
pub(super) fn missing_state(stage: &'static str, what: &str) -> GatewayError {
    GatewayError::Config(format!("Internal error: {} stage ran without {}", stage, what))
}
