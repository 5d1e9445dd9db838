//! Anthropic Messages API builder.
//!
//! The dialect differences that matter here: system text lives in a
//! top-level `system` field, tool results travel as user messages carrying
//! `tool_result` blocks, and the messages array must strictly alternate
//! user/assistant roles, so consecutive same-role messages are merged.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::payload::{apply_sampling, ProviderPayload};
use crate::resolver::{AttachmentStore, ContentResolver};
use crate::tools::translate_tools;
use sw_domain::content::ContentPart;
use sw_domain::message::MessageDto;
use sw_domain::provider::Provider;
use sw_domain::request::RequestContext;
use sw_domain::Result;

/// Image MIME types the Messages API accepts.
const SUPPORTED_IMAGE_MIME: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

pub struct AnthropicBuilder {
    thinking_budget_tokens: u32,
}

impl AnthropicBuilder {
    pub fn new(thinking_budget_tokens: u32) -> Self {
        Self {
            thinking_budget_tokens,
        }
    }
}

#[async_trait]
impl super::PayloadBuilder for AnthropicBuilder {
    async fn build(
        &self,
        ctx: &RequestContext,
        resolver: &ContentResolver,
        store: &dyn AttachmentStore,
    ) -> Result<ProviderPayload> {
        let mut messages: Vec<Value> = Vec::new();
        for msg in &ctx.history {
            if let Some(m) = serialize_message(msg, resolver, store).await {
                push_merging_roles(&mut messages, m);
            }
        }

        let mut body = json!({
            "model": ctx.model.name,
            "messages": messages,
            "stream": true,
        });

        if let Some(system) = &ctx.system_prompt {
            if !system.is_empty() {
                body["system"] = json!(system);
            }
        }

        if let Some(specs) = &ctx.tools {
            if ctx.response_kind().allows_tools() {
                if let Some(tools) = translate_tools(Provider::Anthropic, specs) {
                    body["tools"] = Value::Array(tools);
                }
            }
        }

        apply_sampling(&mut body, &ctx.merged_params(), Provider::Anthropic);

        if ctx.thinking_enabled() {
            // Extended thinking rejects top_k/top_p and any temperature
            // other than 1.0.
            body["thinking"] = json!({
                "type": "enabled",
                "budget_tokens": self.thinking_budget_tokens,
            });
            body["temperature"] = json!(1.0);
            if let Some(obj) = body.as_object_mut() {
                obj.remove("top_k");
                obj.remove("top_p");
            }
        }

        if body.get("max_tokens").is_none() {
            body["max_tokens"] = json!(4096);
        }

        Ok(ProviderPayload::new(
            Provider::Anthropic,
            ctx.model.name.clone(),
            "/v1/messages",
            body,
        ))
    }
}

// ── Message serialization ──────────────────────────────────────────

async fn serialize_message(
    msg: &MessageDto,
    resolver: &ContentResolver,
    store: &dyn AttachmentStore,
) -> Option<Value> {
    if let Some(result) = &msg.tool_result {
        return Some(json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": result.call_id,
                "content": result.content,
            }],
        }));
    }

    if msg.from_assistant {
        let mut content: Vec<Value> = Vec::new();
        if !msg.content.is_empty() {
            content.push(json!({"type": "text", "text": msg.content}));
        }
        for call in &msg.tool_calls {
            content.push(json!({
                "type": "tool_use",
                "id": call.call_id,
                "name": call.tool_name,
                "input": call.arguments,
            }));
        }
        if content.is_empty() {
            return None;
        }
        return Some(json!({"role": "assistant", "content": content}));
    }

    let parts = resolver.resolve(&msg.content, store).await;
    let content: Vec<Value> = parts.iter().map(part_to_block).collect();
    if content.is_empty() {
        return None;
    }
    Some(json!({"role": "user", "content": content}))
}

fn part_to_block(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"type": "text", "text": text}),
        ContentPart::Image {
            mime_type,
            data,
            file_name,
        } => {
            if SUPPORTED_IMAGE_MIME.contains(&mime_type.as_str()) {
                json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": mime_type,
                        "data": data,
                    }
                })
            } else {
                let name = file_name.as_deref().unwrap_or("image");
                tracing::debug!(mime = %mime_type, "replacing unsupported image type");
                json!({
                    "type": "text",
                    "text": format!("[Unsupported image type: {name} ({mime_type})]"),
                })
            }
        }
        ContentPart::File {
            mime_type,
            data,
            file_name,
        } => {
            if mime_type == "text/csv" {
                json!({
                    "type": "text",
                    "text": format!(
                        "[The user attached a CSV file '{file_name}'. \
                         Use the available CSV tools to read and analyze it.]"
                    ),
                })
            } else if mime_type == "application/pdf" {
                json!({
                    "type": "document",
                    "source": {
                        "type": "base64",
                        "media_type": mime_type,
                        "data": data,
                    }
                })
            } else {
                json!({
                    "type": "text",
                    "text": format!("[Attached file: {file_name} ({mime_type})]"),
                })
            }
        }
    }
}

/// Append a message, merging into the previous one when roles match so the
/// final array strictly alternates user/assistant.
fn push_merging_roles(messages: &mut Vec<Value>, msg: Value) {
    if let Some(prev) = messages.last_mut() {
        if prev["role"] == msg["role"] {
            if let (Some(prev_content), Some(new_content)) =
                (prev["content"].as_array_mut(), msg["content"].as_array())
            {
                prev_content.extend(new_content.iter().cloned());
                return;
            }
        }
    }
    messages.push(msg);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
