//! Request Handler: the shared five-stage pipeline, its modality strategies,
//! and the diagnostics handlers.

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod modalities;
pub mod pipeline;
mod stages;

pub use error::GatewayError;
pub use modalities::{
    ChatModality, ImageModality, KeyCheckModality, Modality, ProviderCheckModality,
    TranscriptionModality,
};
pub use pipeline::ModalityPipeline;
