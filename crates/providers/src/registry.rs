//! Provider client registry.
//!
//! Builds one HTTP client per provider family at startup and hands out
//! shared references by [`Provider`]. A family that fails to construct is
//! logged and skipped; requests routed to it later get a clean error
//! instead of a panic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::client::{
    default_base_url, AnthropicClient, GeminiClient, ImageClient, OpenAiStyleClient,
    ProviderClient,
};
use sw_domain::config::Config;
use sw_domain::provider::Provider;
use sw_domain::{Error, Result};

const ALL_PROVIDERS: &[Provider] = &[
    Provider::OpenAi,
    Provider::Anthropic,
    Provider::Gemini,
    Provider::DeepSeek,
    Provider::Grok,
    Provider::Qwen,
    Provider::OpenAiImage,
    Provider::GrokImage,
];

pub struct ProviderRegistry {
    clients: HashMap<Provider, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// Construct every provider family, honoring base URL overrides from
    /// config.
    pub fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.engine.request_timeout_secs);
        let mut clients: HashMap<Provider, Arc<dyn ProviderClient>> = HashMap::new();

        for &provider in ALL_PROVIDERS {
            let base_url = config
                .base_urls
                .get(&provider)
                .map(String::as_str)
                .unwrap_or_else(|| default_base_url(provider));

            let built: Result<Arc<dyn ProviderClient>> = match provider {
                Provider::Anthropic => {
                    AnthropicClient::new(base_url, timeout).map(|c| Arc::new(c) as _)
                }
                Provider::Gemini => GeminiClient::new(base_url, timeout).map(|c| Arc::new(c) as _),
                Provider::OpenAiImage | Provider::GrokImage => {
                    ImageClient::new(provider, base_url, timeout).map(|c| Arc::new(c) as _)
                }
                _ => OpenAiStyleClient::new(provider, base_url, timeout).map(|c| Arc::new(c) as _),
            };

            match built {
                Ok(client) => {
                    clients.insert(provider, client);
                }
                Err(e) => {
                    tracing::warn!(provider = %provider, error = %e, "skipping provider client");
                }
            }
        }

        tracing::debug!(count = clients.len(), "provider registry initialized");
        Self { clients }
    }

    pub fn client_for(&self, provider: Provider) -> Result<Arc<dyn ProviderClient>> {
        self.clients
            .get(&provider)
            .cloned()
            .ok_or_else(|| Error::UnsupportedModel(format!("no client for provider {provider}")))
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.clients.keys().copied()
    }
}
