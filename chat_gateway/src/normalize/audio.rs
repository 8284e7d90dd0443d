use tracing::debug;

use super::form::FormData;
use crate::{config::ProviderConfig, provider::TranscriptionRequest, routers::error::GatewayError};

pub const NO_AUDIO_ERROR: &str = "No audio file provided";

/// Filename sent upstream when the upload's filename is empty
pub const DEFAULT_AUDIO_FILE_NAME: &str = "audio.webm";

/// Take the `audio` upload and wrap it for the transcription endpoint.
pub fn normalize_audio(
    mut form: FormData,
    provider: &ProviderConfig,
) -> Result<TranscriptionRequest, GatewayError> {
    let audio = form
        .take_file("audio")
        .ok_or_else(|| GatewayError::MissingInput(NO_AUDIO_ERROR.to_string()))?;

    let file_name = audio
        .file_name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_AUDIO_FILE_NAME.to_string());

    debug!(
        audio_size = audio.data.len(),
        audio_type = audio.content_type.as_deref().unwrap_or("unknown"),
        "Normalized audio request"
    );

    Ok(TranscriptionRequest {
        audio: audio.data,
        file_name,
        model: provider.transcription_model.clone(),
    })
}
