//! Closed error taxonomy of the request pipeline and its HTTP mapping.
//!
//! Every failure is converted to a JSON envelope exactly once, at the
//! pipeline boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_protocol::envelope::ErrorEnvelope;
use thiserror::Error;

use crate::provider::UpstreamError;

pub const MISSING_KEY_ERROR: &str = "OpenAI API key is missing";
pub const BODY_PARSE_ERROR: &str = "Failed to parse request body";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Provider credential absent (always 500)
    #[error("{0}")]
    Config(String),

    /// Body not decodable for its content type (400)
    #[error("{message}")]
    Parse {
        message: String,
        details: Option<String>,
    },

    /// Required field absent (400)
    #[error("{0}")]
    MissingInput(String),

    /// Provider call failed; status mirrors the provider when known
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    pub fn missing_key() -> Self {
        GatewayError::Config(MISSING_KEY_ERROR.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Parse { .. } | GatewayError::MissingInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(e) => upstream_status(e),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "config_error",
            GatewayError::Parse { .. } => "parse_error",
            GatewayError::MissingInput(_) => "missing_input",
            GatewayError::Upstream(_) => "upstream_error",
        }
    }

    /// Generic envelope; modalities with their own wording override this.
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            GatewayError::Config(message) | GatewayError::MissingInput(message) => {
                ErrorEnvelope::new(message.clone())
            }
            GatewayError::Parse { message, details } => {
                ErrorEnvelope::new(message.clone()).with_details_opt(details.clone())
            }
            GatewayError::Upstream(e) => ErrorEnvelope::new(e.message.clone()),
        }
    }
}

/// Provider status when it is an error status, else 500
pub fn upstream_status(err: &UpstreamError) -> StatusCode {
    err.status
        .filter(|s| (400..=599).contains(s))
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        envelope_response(self.status(), self.envelope())
    }
}

pub fn envelope_response(status: StatusCode, envelope: ErrorEnvelope) -> Response {
    (status, Json(envelope)).into_response()
}

/// 500 for faults inside the gateway itself (never a provider failure)
pub fn pipeline_fault(code: &str, message: impl Into<String>) -> Response {
    envelope_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorEnvelope::new(message).with_type(code),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::missing_key().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::MissingInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Parse {
                message: BODY_PARSE_ERROR.into(),
                details: None
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_upstream_status_mirrored() {
        let err: GatewayError = UpstreamError::new(Some(429), "Rate limit").into();
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

        let err: GatewayError = UpstreamError::new(Some(401), "bad key").into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_upstream_without_error_status_is_500() {
        for status in [None, Some(200), Some(302), Some(1000)] {
            let err: GatewayError = UpstreamError::new(status, "x").into();
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_parse_envelope_carries_details() {
        let err = GatewayError::Parse {
            message: "Failed to parse form data".into(),
            details: Some("missing boundary".into()),
        };
        let env = err.envelope();
        assert_eq!(env.error, "Failed to parse form data");
        assert_eq!(env.details.as_deref(), Some("missing boundary"));
        assert_eq!(env.status, None);
    }
}
