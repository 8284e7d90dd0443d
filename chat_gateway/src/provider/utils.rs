//! Response helpers shared by provider implementations

use chat_protocol::provider_error::ProviderErrorBody;
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::UpstreamError;

/// Maximum error response body size read from the provider (1 MB)
pub(super) const MAX_ERROR_RESPONSE_SIZE: usize = 1024 * 1024;

static ORG_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\borganization org-\S+").expect("organization pattern is valid")
});
static PROJ_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\bproject proj_\S+").expect("project pattern is valid"));

/// Strip account identifiers from a provider error message before it is
/// shown to clients.
pub fn sanitize_provider_message(message: &str) -> String {
    let stripped = ORG_ID_RE.replace_all(message, "");
    PROJ_ID_RE.replace_all(&stripped, "").into_owned()
}

pub(super) enum ReadBodyResult {
    Ok(String),
    TooLarge,
    Error(String),
}

/// Read a response body incrementally, giving up past `max_size`.
pub(super) async fn read_response_body_limited(
    response: reqwest::Response,
    max_size: usize,
) -> ReadBodyResult {
    let mut stream = response.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk_result) = stream.next().await {
        match chunk_result {
            Ok(chunk) => {
                if buf.len() + chunk.len() > max_size {
                    return ReadBodyResult::TooLarge;
                }
                buf.extend_from_slice(&chunk);
            }
            Err(e) => return ReadBodyResult::Error(e.to_string()),
        }
    }

    // Decode once so multibyte sequences split across chunks survive
    match String::from_utf8(buf) {
        Ok(body) => ReadBodyResult::Ok(body),
        Err(e) => ReadBodyResult::Error(format!("invalid UTF-8 in response body: {}", e)),
    }
}

/// Build an [`UpstreamError`] from a non-success provider response
pub(super) async fn error_from_response(response: reqwest::Response) -> UpstreamError {
    let status = response.status();
    let fallback = format!("Provider returned error: {}", status);

    let body = match read_response_body_limited(response, MAX_ERROR_RESPONSE_SIZE).await {
        ReadBodyResult::Ok(b) => b,
        ReadBodyResult::TooLarge => {
            warn!(
                status = %status,
                max_size = MAX_ERROR_RESPONSE_SIZE,
                "Provider error body too large"
            );
            String::new()
        }
        ReadBodyResult::Error(e) => {
            warn!(status = %status, error = %e, "Failed to read provider error body");
            String::new()
        }
    };

    error_from_body(status.as_u16(), &body, fallback)
}

pub(super) fn error_from_body(status: u16, body: &str, fallback: String) -> UpstreamError {
    let (message, provider_type) = match ProviderErrorBody::parse(body) {
        Some(parsed) => (
            parsed.error.message.unwrap_or(fallback),
            parsed.error.error_type,
        ),
        None if body.trim().is_empty() => (fallback, None),
        None => (body.trim().to_string(), None),
    };

    UpstreamError {
        status: Some(status),
        message: sanitize_provider_message(&message),
        provider_type,
    }
}

/// Classify a transport failure; no provider status is available
pub(super) fn error_from_transport(e: &reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::new(None, format!("Request timeout: {}", e)).with_type("timeout")
    } else if e.is_connect() {
        UpstreamError::new(None, format!("Connection failed: {}", e)).with_type("connection_error")
    } else {
        UpstreamError::new(None, format!("Request failed: {}", e)).with_type("request_error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_org_and_project_ids() {
        let msg = "You exceeded your current quota for organization org-abc123 on project proj_xyz789.";
        let sanitized = sanitize_provider_message(msg);
        assert!(!sanitized.contains("org-abc123"));
        assert!(!sanitized.contains("proj_xyz789"));
        assert!(sanitized.starts_with("You exceeded your current quota for"));
    }

    #[test]
    fn test_sanitize_leaves_plain_messages() {
        assert_eq!(
            sanitize_provider_message("Rate limit reached"),
            "Rate limit reached"
        );
    }

    #[test]
    fn test_error_from_openai_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let err = error_from_body(401, body, "fallback".to_string());
        assert_eq!(err.status, Some(401));
        assert_eq!(err.message, "Incorrect API key provided");
        assert_eq!(err.provider_type.as_deref(), Some("invalid_request_error"));
    }

    #[test]
    fn test_error_from_plain_body() {
        let err = error_from_body(502, "Bad Gateway\n", "fallback".to_string());
        assert_eq!(err.status, Some(502));
        assert_eq!(err.message, "Bad Gateway");
        assert_eq!(err.provider_type, None);
    }

    #[test]
    fn test_error_from_empty_body_uses_fallback() {
        let err = error_from_body(503, "", "Provider returned error: 503".to_string());
        assert_eq!(err.message, "Provider returned error: 503");
    }
}
