//! Image generation builder (OpenAI and Grok image endpoints).
//!
//! Image requests are not conversational: the prompt is the most recent
//! non-empty user message, everything else in the history is ignored, and
//! the response comes back in one shot rather than as an SSE stream.

use async_trait::async_trait;
use serde_json::json;

use crate::payload::ProviderPayload;
use crate::resolver::{AttachmentStore, ContentResolver};
use sw_domain::request::RequestContext;
use sw_domain::{Error, Result};

const DEFAULT_SIZE: &str = "1024x1024";

pub struct ImageBuilder;

impl ImageBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl super::PayloadBuilder for ImageBuilder {
    async fn build(
        &self,
        ctx: &RequestContext,
        _resolver: &ContentResolver,
        _store: &dyn AttachmentStore,
    ) -> Result<ProviderPayload> {
        let prompt = ctx
            .history
            .iter()
            .rev()
            .find(|m| !m.from_assistant && m.tool_result.is_none() && !m.content.trim().is_empty())
            .map(|m| m.content.clone())
            .ok_or_else(|| {
                Error::Provider {
                    provider: ctx.model.provider.as_str().into(),
                    message: "no user prompt found for image generation".into(),
                }
            })?;

        let n = ctx.overrides.image_count.unwrap_or(1);
        let size = ctx
            .overrides
            .image_size
            .clone()
            .unwrap_or_else(|| DEFAULT_SIZE.to_string());

        let body = json!({
            "model": ctx.model.name,
            "prompt": prompt,
            "n": n,
            "size": size,
            "response_format": "b64_json",
        });

        Ok(ProviderPayload::new(
            ctx.model.provider,
            ctx.model.name.clone(),
            "/images/generations",
            body,
        )
        .non_streaming())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::super::PayloadBuilder;
    use super::*;
    use crate::resolver::Attachment;
    use sw_domain::message::MessageDto;
    use sw_domain::provider::{ModelRef, Provider};
    use uuid::Uuid;

    struct NoStore;

    #[async_trait]
    impl AttachmentStore for NoStore {
        async fn get(&self, _id: Uuid) -> Option<Attachment> {
            None
        }
        async fn cached_base64(&self, _cache_key: &str) -> Option<String> {
            None
        }
    }

    fn ctx(history: Vec<MessageDto>) -> RequestContext {
        RequestContext::new(
            Uuid::new_v4(),
            ModelRef::new(Provider::OpenAiImage, "gpt-image-1"),
            history,
        )
    }

    #[tokio::test]
    async fn prompt_is_last_non_empty_user_message() {
        let c = ctx(vec![
            MessageDto::user("a cat"),
            MessageDto::assistant("here you go"),
            MessageDto::user("   "),
            MessageDto::user("a dog in the rain"),
        ]);
        let payload = ImageBuilder::new()
            .build(&c, &ContentResolver::new(), &NoStore)
            .await
            .unwrap();
        assert_eq!(payload.body["prompt"], "a dog in the rain");
        assert_eq!(payload.body["n"], 1);
        assert_eq!(payload.body["size"], "1024x1024");
        assert!(!payload.streaming);
    }

    #[tokio::test]
    async fn overrides_change_size_and_count() {
        let mut c = ctx(vec![MessageDto::user("sunset")]);
        c.overrides.image_size = Some("512x512".into());
        c.overrides.image_count = Some(2);
        let payload = ImageBuilder::new()
            .build(&c, &ContentResolver::new(), &NoStore)
            .await
            .unwrap();
        assert_eq!(payload.body["size"], "512x512");
        assert_eq!(payload.body["n"], 2);
    }

    #[tokio::test]
    async fn no_user_message_is_an_error() {
        let c = ctx(vec![MessageDto::assistant("hello")]);
        let err = ImageBuilder::new()
            .build(&c, &ContentResolver::new(), &NoStore)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
