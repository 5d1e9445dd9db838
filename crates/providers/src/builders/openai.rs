//! OpenAI chat-completions dialect builder.
//!
//! Shared by OpenAI, DeepSeek, Grok and Qwen; they all speak the same
//! `/chat/completions` shape with minor flags layered on top.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::payload::{apply_sampling, ProviderPayload};
use crate::resolver::{AttachmentStore, ContentResolver};
use crate::tools::translate_tools;
use sw_domain::content::ContentPart;
use sw_domain::message::MessageDto;
use sw_domain::provider::Provider;
use sw_domain::request::{RequestContext, ToolChoice};
use sw_domain::Result;

pub struct OpenAiStyleBuilder;

impl OpenAiStyleBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OpenAiStyleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl super::PayloadBuilder for OpenAiStyleBuilder {
    async fn build(
        &self,
        ctx: &RequestContext,
        resolver: &ContentResolver,
        store: &dyn AttachmentStore,
    ) -> Result<ProviderPayload> {
        let provider = ctx.model.provider;
        let mut messages: Vec<Value> = Vec::new();

        if let Some(system) = &ctx.system_prompt {
            if !system.is_empty() {
                messages.push(json!({"role": "system", "content": system}));
            }
        }

        for msg in &ctx.history {
            messages.push(serialize_message(msg, resolver, store).await);
        }

        let mut body = json!({
            "model": ctx.model.name,
            "messages": messages,
            "stream": true,
            "stream_options": {"include_usage": true},
        });

        if let Some(specs) = &ctx.tools {
            if ctx.response_kind().allows_tools() {
                if let Some(tools) = translate_tools(provider, specs) {
                    body["tools"] = Value::Array(tools);
                    body["tool_choice"] = match &ctx.overrides.tool_choice {
                        Some(ToolChoice::None) => json!("none"),
                        Some(ToolChoice::Named(name)) => json!({
                            "type": "function",
                            "function": {"name": name},
                        }),
                        Some(ToolChoice::Auto) | None => json!("auto"),
                    };
                }
            }
        }

        // Qwen wants the flag spelled out; DeepSeek's reasoner model
        // produces its trace unconditionally.
        if ctx.thinking_enabled() && provider == Provider::Qwen {
            body["enable_thinking"] = json!(true);
        }

        apply_sampling(&mut body, &ctx.merged_params(), provider);

        Ok(ProviderPayload::new(
            provider,
            ctx.model.name.clone(),
            "/chat/completions",
            body,
        ))
    }
}

// ── Message serialization ──────────────────────────────────────────

async fn serialize_message(
    msg: &MessageDto,
    resolver: &ContentResolver,
    store: &dyn AttachmentStore,
) -> Value {
    if let Some(result) = &msg.tool_result {
        return json!({
            "role": "tool",
            "tool_call_id": result.call_id,
            "content": result.content,
        });
    }

    if msg.from_assistant {
        let mut m = json!({
            "role": "assistant",
            "content": msg.content,
        });
        if !msg.tool_calls.is_empty() {
            let calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.call_id,
                        "type": "function",
                        "function": {
                            "name": call.tool_name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            m["tool_calls"] = Value::Array(calls);
        }
        return m;
    }

    let parts = resolver.resolve(&msg.content, store).await;
    user_message(&parts)
}

/// Text-only user content collapses to a plain string; anything multimodal
/// becomes a content-part array with `image_url` data URLs. Non-image files
/// have no slot in this dialect and degrade to a text note.
fn user_message(parts: &[ContentPart]) -> Value {
    let multimodal = parts
        .iter()
        .any(|p| matches!(p, ContentPart::Image { .. }));
    if !multimodal {
        let text: String = parts
            .iter()
            .map(|p| match p {
                ContentPart::Text { text } => text.clone(),
                ContentPart::File {
                    file_name,
                    mime_type,
                    ..
                } => format!("[Attached file: {file_name} ({mime_type})]"),
                ContentPart::Image { .. } => String::new(),
            })
            .collect();
        return json!({"role": "user", "content": text});
    }

    let content: Vec<Value> = parts
        .iter()
        .map(|p| match p {
            ContentPart::Text { text } => json!({"type": "text", "text": text}),
            ContentPart::Image {
                mime_type, data, ..
            } => json!({
                "type": "image_url",
                "image_url": {"url": format!("data:{mime_type};base64,{data}")},
            }),
            ContentPart::File {
                file_name,
                mime_type,
                ..
            } => json!({
                "type": "text",
                "text": format!("[Attached file: {file_name} ({mime_type})]"),
            }),
        })
        .collect();
    json!({"role": "user", "content": content})
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::super::PayloadBuilder;
    use super::*;
    use crate::resolver::Attachment;
    use sw_domain::message::{ToolCall, ToolResult};
    use sw_domain::provider::ModelRef;
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
            ModelRef::new(Provider::Grok, "grok-3"),
            history,
        )
    }

    async fn built(ctx: &RequestContext) -> Value {
        OpenAiStyleBuilder::new()
            .build(ctx, &ContentResolver::new(), &NoStore)
            .await
            .unwrap()
            .body
    }

    #[tokio::test]
    async fn system_prompt_leads_the_messages() {
        let mut c = ctx(vec![MessageDto::user("hi")]);
        c.system_prompt = Some("be terse".into());
        let body = built(&c).await;
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[1]["role"], "user");
        assert_eq!(msgs[1]["content"], "hi");
    }

    #[tokio::test]
    async fn assistant_tool_calls_serialize_with_string_arguments() {
        let c = ctx(vec![
            MessageDto::user("weather?"),
            MessageDto::tool_request(
                "",
                vec![ToolCall {
                    call_id: "call_1".into(),
                    tool_name: "get_weather".into(),
                    arguments: json!({"city": "Oslo"}),
                }],
            ),
            MessageDto::tool_result(ToolResult {
                call_id: "call_1".into(),
                tool_name: "get_weather".into(),
                content: "4C, rain".into(),
            }),
        ]);
        let body = built(&c).await;
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs[1]["tool_calls"][0]["function"]["name"], "get_weather");
        assert!(msgs[1]["tool_calls"][0]["function"]["arguments"].is_string());
        assert_eq!(msgs[2]["role"], "tool");
        assert_eq!(msgs[2]["tool_call_id"], "call_1");
    }

    #[tokio::test]
    async fn embedded_image_becomes_data_url_part() {
        let c = ctx(vec![MessageDto::user(
            "see <image-base64:image/png;base64,QUJD>",
        )]);
        let body = built(&c).await;
        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "text");
        assert_eq!(
            content[1]["image_url"]["url"],
            "data:image/png;base64,QUJD"
        );
    }

    fn with_tools(mut c: RequestContext) -> RequestContext {
        c.tools = Some(vec![sw_domain::request::ToolSpec {
            name: "get_weather".into(),
            description: "d".into(),
            parameters: Some(json!({"type": "object", "properties": {}})),
        }]);
        c
    }

    #[tokio::test]
    async fn tools_present_defaults_to_auto_choice() {
        let c = with_tools(ctx(vec![MessageDto::user("hi")]));
        let body = built(&c).await;
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
    }

    #[tokio::test]
    async fn named_tool_choice_forces_the_function() {
        let mut c = with_tools(ctx(vec![MessageDto::user("hi")]));
        c.overrides.tool_choice = Some(ToolChoice::Named("get_weather".into()));
        let body = built(&c).await;
        assert_eq!(body["tool_choice"]["type"], "function");
        assert_eq!(body["tool_choice"]["function"]["name"], "get_weather");
        assert_eq!(body["tools"][0]["function"]["name"], "get_weather");
    }

    #[tokio::test]
    async fn none_tool_choice_keeps_tools_but_blocks_calls() {
        let mut c = with_tools(ctx(vec![MessageDto::user("hi")]));
        c.overrides.tool_choice = Some(ToolChoice::None);
        let body = built(&c).await;
        assert_eq!(body["tool_choice"], "none");
        assert!(body["tools"].is_array());
    }

    #[tokio::test]
    async fn qwen_thinking_flag() {
        let mut c = ctx(vec![MessageDto::user("hi")]);
        c.model = ModelRef::new(Provider::Qwen, "qwen3-thinking");
        c.overrides.thinking = Some(true);
        let body = built(&c).await;
        assert_eq!(body["enable_thinking"], json!(true));
    }
}
