//! Text extraction from materialized provider responses

use chat_protocol::{chat::ChatCompletionResponse, transcription::TranscriptionResponse};
use tracing::debug;

/// Substituted when a completion carries no message text
pub const NO_RESPONSE_FALLBACK: &str = "No response from AI";

/// `choices[0].message.content`, or `fallback` when absent or empty.
pub fn completion_text(response: &ChatCompletionResponse, fallback: &str) -> String {
    match response.first_content() {
        Some(text) => text.to_string(),
        None => {
            debug!(
                choices = response.choices.len(),
                "Completion carried no text, using fallback"
            );
            fallback.to_string()
        }
    }
}

/// Transcribed text; a response without `text` yields an empty string.
pub fn transcription_text(response: TranscriptionResponse) -> String {
    response.text.unwrap_or_default()
}
