//! Per-provider payload builders.
//!
//! Each builder turns a provider-neutral [`RequestContext`] into the JSON
//! body one dialect expects, resolving attachment tags along the way. The
//! registry replaces any switch-on-provider dispatch: callers look a builder
//! up by [`Provider`] and call through the trait.

mod anthropic;
mod gemini;
mod image;
mod openai;

pub use anthropic::AnthropicBuilder;
pub use gemini::GeminiBuilder;
pub use image::ImageBuilder;
pub use openai::OpenAiStyleBuilder;

use async_trait::async_trait;

use crate::payload::ProviderPayload;
use crate::resolver::{AttachmentStore, ContentResolver};
use sw_domain::provider::Provider;
use sw_domain::request::RequestContext;
use sw_domain::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Builder trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Builds the wire payload for one provider dialect.
#[async_trait]
pub trait PayloadBuilder: Send + Sync {
    async fn build(
        &self,
        ctx: &RequestContext,
        resolver: &ContentResolver,
        store: &dyn AttachmentStore,
    ) -> Result<ProviderPayload>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lookup table from provider to payload builder.
pub struct BuilderRegistry {
    openai_style: OpenAiStyleBuilder,
    anthropic: AnthropicBuilder,
    gemini: GeminiBuilder,
    image: ImageBuilder,
}

impl BuilderRegistry {
    pub fn new(thinking_budget_tokens: u32) -> Self {
        Self {
            openai_style: OpenAiStyleBuilder::new(),
            anthropic: AnthropicBuilder::new(thinking_budget_tokens),
            gemini: GeminiBuilder::new(thinking_budget_tokens),
            image: ImageBuilder::new(),
        }
    }

    pub fn for_provider(&self, provider: Provider) -> &dyn PayloadBuilder {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::Gemini => &self.gemini,
            Provider::OpenAiImage | Provider::GrokImage => &self.image,
            _ => &self.openai_style,
        }
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new(sw_domain::config::EngineConfig::default().thinking_budget_tokens)
    }
}
