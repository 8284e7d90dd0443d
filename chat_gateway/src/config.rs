//! Gateway configuration.
//!
//! The provider API key is deliberately absent from [`GatewayConfig`]: only
//! the [`ApiKeySource`] is stored, and it is resolved on every request.

use std::{fmt, time::Duration};

use chat_protocol::stream::StreamFormat;
use thiserror::Error;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_PROBE_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_VISION_MAX_TOKENS: u32 = 500;
pub const DEFAULT_PROBE_MAX_TOKENS: u32 = 20;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid provider base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request_timeout_secs must be greater than 0")]
    InvalidTimeout,
    #[error("max_payload_size must be greater than 0")]
    InvalidPayloadSize,
    #[error("max_upload_bytes ({upload}) exceeds max_payload_size ({payload})")]
    UploadExceedsPayload { upload: usize, payload: usize },
    #[error("api key environment variable name cannot be empty")]
    EmptyApiKeyVar,
}

// ============================================================================
// API key
// ============================================================================

/// Provider credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for empty or whitespace-only values
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Where the provider key comes from
#[derive(Clone)]
pub enum ApiKeySource {
    /// Read from the named environment variable at call time
    Env(String),
    /// Fixed value, mainly for tests and embedding
    Fixed(Option<ApiKey>),
}

impl ApiKeySource {
    pub fn fixed(value: impl Into<String>) -> Self {
        ApiKeySource::Fixed(ApiKey::new(value))
    }

    pub fn missing() -> Self {
        ApiKeySource::Fixed(None)
    }

    /// Resolve the key now. Absent and empty values both yield `None`.
    pub fn resolve(&self) -> Option<ApiKey> {
        match self {
            ApiKeySource::Env(var) => std::env::var(var).ok().and_then(ApiKey::new),
            ApiKeySource::Fixed(key) => key.clone(),
        }
    }
}

impl Default for ApiKeySource {
    fn default() -> Self {
        ApiKeySource::Env(DEFAULT_API_KEY_ENV.to_string())
    }
}

impl fmt::Debug for ApiKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiKeySource::Env(var) => f.debug_tuple("Env").field(var).finish(),
            ApiKeySource::Fixed(key) => f
                .debug_tuple("Fixed")
                .field(&key.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Upstream provider settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: ApiKeySource,
    pub chat_model: String,
    pub vision_model: String,
    pub transcription_model: String,
    pub probe_model: String,
    pub vision_max_tokens: u32,
    pub probe_max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            api_key: ApiKeySource::default(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            probe_model: DEFAULT_PROBE_MODEL.to_string(),
            vision_max_tokens: DEFAULT_VISION_MAX_TOKENS,
            probe_max_tokens: DEFAULT_PROBE_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub provider: ProviderConfig,
    pub request_timeout_secs: u64,
    /// Transport-level cap on any request body
    pub max_payload_size: usize,
    /// Per-file cap on multipart uploads; `None` means unlimited
    pub max_upload_bytes: Option<usize>,
    pub stream_format: StreamFormat,
    /// Empty means permissive CORS
    pub cors_allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            provider: ProviderConfig::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            max_upload_bytes: None,
            stream_format: StreamFormat::default(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.provider.base_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            Ok(u) => {
                return Err(ConfigError::InvalidBaseUrl {
                    url: self.provider.base_url.clone(),
                    reason: format!("unsupported scheme '{}'", u.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::InvalidBaseUrl {
                    url: self.provider.base_url.clone(),
                    reason: e.to_string(),
                })
            }
        }

        if let ApiKeySource::Env(var) = &self.provider.api_key {
            if var.trim().is_empty() {
                return Err(ConfigError::EmptyApiKeyVar);
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        if self.max_payload_size == 0 {
            return Err(ConfigError::InvalidPayloadSize);
        }

        if let Some(upload) = self.max_upload_bytes {
            if upload > self.max_payload_size {
                return Err(ConfigError::UploadExceedsPayload {
                    upload,
                    payload: self.max_payload_size,
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn provider_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.provider.base_url = url.into();
        self
    }

    pub fn api_key_source(mut self, source: ApiKeySource) -> Self {
        self.config.provider.api_key = source;
        self
    }

    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.provider.chat_model = model.into();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.provider.vision_model = model.into();
        self
    }

    pub fn transcription_model(mut self, model: impl Into<String>) -> Self {
        self.config.provider.transcription_model = model.into();
        self
    }

    pub fn probe_model(mut self, model: impl Into<String>) -> Self {
        self.config.provider.probe_model = model.into();
        self
    }

    pub fn vision_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.provider.vision_max_tokens = max_tokens;
        self
    }

    pub fn probe_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.provider.probe_max_tokens = max_tokens;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn max_payload_size(mut self, bytes: usize) -> Self {
        self.config.max_payload_size = bytes;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: Option<usize>) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn stream_format(mut self, format: StreamFormat) -> Self {
        self.config.stream_format = format;
        self
    }

    pub fn cors_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors_allowed_origins = origins;
        self
    }

    pub fn build(self) -> Result<GatewayConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Skip validation (tests)
    pub fn build_unchecked(self) -> GatewayConfig {
        self.config
    }
}
