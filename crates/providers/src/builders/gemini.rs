//! Gemini generateContent dialect builder.
//!
//! Roles are `user`/`model`, multimodal payloads ride in `inlineData`
//! parts, tool calls and results are `functionCall`/`functionResponse`
//! parts, and all sampling knobs live under `generationConfig`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::payload::{apply_sampling, ProviderPayload};
use crate::resolver::{AttachmentStore, ContentResolver};
use crate::tools::translate_tools;
use sw_domain::content::ContentPart;
use sw_domain::message::MessageDto;
use sw_domain::provider::Provider;
use sw_domain::request::{RequestContext, SafetyLevel};
use sw_domain::Result;

pub struct GeminiBuilder {
    thinking_budget_tokens: u32,
}

impl GeminiBuilder {
    pub fn new(thinking_budget_tokens: u32) -> Self {
        Self {
            thinking_budget_tokens,
        }
    }
}

#[async_trait]
impl super::PayloadBuilder for GeminiBuilder {
    async fn build(
        &self,
        ctx: &RequestContext,
        resolver: &ContentResolver,
        store: &dyn AttachmentStore,
    ) -> Result<ProviderPayload> {
        let mut contents: Vec<Value> = Vec::new();
        for msg in &ctx.history {
            if let Some(m) = serialize_message(msg, resolver, store).await {
                contents.push(m);
            }
        }

        let mut body = json!({"contents": contents});

        if let Some(system) = &ctx.system_prompt {
            if !system.is_empty() {
                body["systemInstruction"] = json!({"parts": [{"text": system}]});
            }
        }

        if let Some(specs) = &ctx.tools {
            if ctx.response_kind().allows_tools() {
                if let Some(tools) = translate_tools(Provider::Gemini, specs) {
                    body["tools"] = Value::Array(tools);
                }
            }
        }

        let mut gen_cfg = json!({});
        apply_sampling(&mut gen_cfg, &ctx.merged_params(), Provider::Gemini);
        if let Some(max) = ctx.overrides.max_output_tokens {
            gen_cfg["maxOutputTokens"] = json!(max);
        }
        if ctx.thinking_enabled() {
            gen_cfg["thinkingConfig"] = json!({
                "thinkingBudget": self.thinking_budget_tokens,
                "includeThoughts": true,
            });
        }
        if gen_cfg.as_object().is_some_and(|o| !o.is_empty()) {
            body["generationConfig"] = gen_cfg;
        }

        if let Some(level) = ctx.overrides.safety {
            body["safetySettings"] = safety_settings(level);
        }

        let endpoint = format!("/v1beta/models/{}:streamGenerateContent?alt=sse", ctx.model.name);
        Ok(ProviderPayload::new(
            Provider::Gemini,
            ctx.model.name.clone(),
            endpoint,
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
            "parts": [{
                "functionResponse": {
                    "name": result.tool_name,
                    "response": {"content": result.content},
                }
            }],
        }));
    }

    if msg.from_assistant {
        let mut parts: Vec<Value> = Vec::new();
        if !msg.content.is_empty() {
            parts.push(json!({"text": msg.content}));
        }
        for call in &msg.tool_calls {
            parts.push(json!({
                "functionCall": {
                    "name": call.tool_name,
                    "args": call.arguments,
                }
            }));
        }
        if parts.is_empty() {
            return None;
        }
        return Some(json!({"role": "model", "parts": parts}));
    }

    let resolved = resolver.resolve(&msg.content, store).await;
    let parts: Vec<Value> = resolved
        .iter()
        .map(|p| match p {
            ContentPart::Text { text } => json!({"text": text}),
            ContentPart::Image {
                mime_type, data, ..
            }
            | ContentPart::File {
                mime_type, data, ..
            } => json!({
                "inlineData": {"mimeType": mime_type, "data": data}
            }),
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(json!({"role": "user", "parts": parts}))
}

fn safety_settings(level: SafetyLevel) -> Value {
    let threshold = match level {
        SafetyLevel::Strict => "BLOCK_LOW_AND_ABOVE",
        SafetyLevel::Standard => "BLOCK_MEDIUM_AND_ABOVE",
        SafetyLevel::Relaxed => "BLOCK_ONLY_HIGH",
    };
    let categories = [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ];
    Value::Array(
        categories
            .iter()
            .map(|c| json!({"category": c, "threshold": threshold}))
            .collect(),
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
