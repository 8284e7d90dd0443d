//! Outward JSON envelopes returned to the browser client.
//!
//! These shapes are the only contract the client relies on; provider
//! response shapes never leak through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Success body of `/image-chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageChatResponse {
    pub response: String,
}

/// Success body of `/transcribe`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
}

/// Error body shared by every modality endpoint
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub details: Option<String>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub status: Option<u16>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            error_type: None,
            status: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_details_opt(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyStatus {
    Valid,
    Invalid,
}

/// Body of `/diagnostics/key`, for both outcomes
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCheckResponse {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    pub api_key_status: ApiKeyStatus,
    pub details: Option<String>,
}

impl KeyCheckResponse {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            api_key_status: ApiKeyStatus::Valid,
            details: None,
        }
    }

    pub fn invalid(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            api_key_status: ApiKeyStatus::Invalid,
            details,
        }
    }
}

/// Body of `/diagnostics/provider`
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCheckResponse {
    pub success: bool,
    pub message: Option<String>,
    pub model: Option<String>,
    pub error: Option<String>,
}

impl ProviderCheckResponse {
    pub fn ok(message: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            model: Some(model.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            model: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoStatus {
    Ok,
    Error,
}

/// Body of `/diagnostics/echo`
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoResponse {
    pub status: EchoStatus,
    pub message: String,
    pub received_content_type: Option<String>,
    pub received_body: Option<Value>,
    pub timestamp: String,
}

/// Metadata of an uploaded file, as reported by the diagnostics endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: usize,
}

/// Body of `/diagnostics/image`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfoResponse {
    pub success: bool,
    pub image_info: FileInfo,
    pub message: String,
}
