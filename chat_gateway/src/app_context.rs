//! Process-wide components, built once at startup and shared by every
//! request pipeline.

use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    config::GatewayConfig,
    provider::{OpenAiProvider, UpstreamProvider},
};

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

pub struct AppContext {
    pub config: GatewayConfig,
    pub provider: Arc<dyn UpstreamProvider>,
}

impl AppContext {
    /// Build the pooled HTTP client and the OpenAI-compatible provider.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .user_agent(concat!("chat-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let provider = OpenAiProvider::new(
            client,
            config.provider.base_url.clone(),
            config.request_timeout(),
        );
        info!(
            provider = provider.name(),
            base_url = %config.provider.base_url,
            "Initialized upstream provider"
        );

        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    pub fn with_provider(config: GatewayConfig, provider: Arc<dyn UpstreamProvider>) -> Self {
        Self { config, provider }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .finish()
    }
}
