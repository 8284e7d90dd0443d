use anyhow::Context;
use chat_gateway::{
    config::{
        ApiKeySource, GatewayConfig, DEFAULT_API_KEY_ENV, DEFAULT_CHAT_MODEL,
        DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_PROBE_MAX_TOKENS, DEFAULT_PROBE_MODEL,
        DEFAULT_PROVIDER_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TRANSCRIPTION_MODEL,
        DEFAULT_VISION_MAX_TOKENS, DEFAULT_VISION_MODEL,
    },
    logging::{init_logging, LogFormat, LoggingConfig},
    protocols::stream::StreamFormat,
    server,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "chat-gateway")]
#[command(version, about = "Customer-service chat gateway for OpenAI-compatible providers")]
struct Cli {
    /// Host address to bind
    #[arg(long, env = "CHAT_GATEWAY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "CHAT_GATEWAY_PORT", default_value_t = 3000)]
    port: u16,

    /// Provider API base URL
    #[arg(long, env = "CHAT_GATEWAY_PROVIDER_URL", default_value = DEFAULT_PROVIDER_BASE_URL)]
    provider_url: String,

    /// Environment variable holding the provider API key (read per request)
    #[arg(long, env = "CHAT_GATEWAY_API_KEY_ENV", default_value = DEFAULT_API_KEY_ENV)]
    api_key_env: String,

    #[arg(long, env = "CHAT_GATEWAY_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    #[arg(long, env = "CHAT_GATEWAY_VISION_MODEL", default_value = DEFAULT_VISION_MODEL)]
    vision_model: String,

    #[arg(long, env = "CHAT_GATEWAY_TRANSCRIPTION_MODEL", default_value = DEFAULT_TRANSCRIPTION_MODEL)]
    transcription_model: String,

    /// Model used by the key diagnostic
    #[arg(long, env = "CHAT_GATEWAY_PROBE_MODEL", default_value = DEFAULT_PROBE_MODEL)]
    probe_model: String,

    #[arg(long, env = "CHAT_GATEWAY_VISION_MAX_TOKENS", default_value_t = DEFAULT_VISION_MAX_TOKENS)]
    vision_max_tokens: u32,

    #[arg(long, env = "CHAT_GATEWAY_PROBE_MAX_TOKENS", default_value_t = DEFAULT_PROBE_MAX_TOKENS)]
    probe_max_tokens: u32,

    /// Maximum request duration in seconds
    #[arg(long, env = "CHAT_GATEWAY_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[arg(long, env = "CHAT_GATEWAY_MAX_PAYLOAD_SIZE", default_value_t = DEFAULT_MAX_PAYLOAD_SIZE)]
    max_payload_size: usize,

    /// Per-file upload cap in bytes (unlimited when unset)
    #[arg(long, env = "CHAT_GATEWAY_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Outward chat stream format: data-stream or sse
    #[arg(long, env = "CHAT_GATEWAY_STREAM_FORMAT", default_value = "data-stream")]
    stream_format: StreamFormat,

    /// Allowed CORS origins (permissive when empty)
    #[arg(long, env = "CHAT_GATEWAY_CORS_ORIGINS", value_delimiter = ',')]
    cors_allowed_origins: Vec<String>,

    /// Log level directive; RUST_LOG takes precedence
    #[arg(long, env = "CHAT_GATEWAY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format: pretty, compact or json
    #[arg(long, env = "CHAT_GATEWAY_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format,
            ..Default::default()
        }
    }

    fn into_config(self) -> Result<GatewayConfig, chat_gateway::config::ConfigError> {
        GatewayConfig::builder()
            .host(self.host)
            .port(self.port)
            .provider_base_url(self.provider_url)
            .api_key_source(ApiKeySource::Env(self.api_key_env))
            .chat_model(self.chat_model)
            .vision_model(self.vision_model)
            .transcription_model(self.transcription_model)
            .probe_model(self.probe_model)
            .vision_max_tokens(self.vision_max_tokens)
            .probe_max_tokens(self.probe_max_tokens)
            .request_timeout_secs(self.request_timeout_secs)
            .max_payload_size(self.max_payload_size)
            .max_upload_bytes(self.max_upload_bytes)
            .stream_format(self.stream_format)
            .cors_allowed_origins(self.cors_allowed_origins)
            .build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.logging_config())
        .map_err(anyhow::Error::msg)
        .context("failed to initialize logging")?;

    let config = cli.into_config().context("invalid configuration")?;
    server::startup(config).await.context("chat gateway failed")?;
    Ok(())
}
