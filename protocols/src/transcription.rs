use serde::{Deserialize, Serialize};

/// Response of the upstream `audio/transcriptions` endpoint (json format)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    #[serde(default)]
    pub text: Option<String>,
}
