//! Provider payload assembly.
//!
//! A [`ProviderPayload`] is the final JSON body plus the endpoint metadata
//! the HTTP client needs. Sampling parameters arrive as an ordered
//! [`ParamSet`] already merged by precedence; this module filters them
//! against each provider dialect's allow-list before they reach the body.

use serde_json::Value;

use sw_domain::provider::Provider;
use sw_domain::request::ParamSet;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payload
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Finished request body for one provider call.
#[derive(Debug, Clone)]
pub struct ProviderPayload {
    pub provider: Provider,
    pub model: String,
    /// Path appended to the provider base URL, for example
    /// `/v1/messages` or `/v1/chat/completions`.
    pub endpoint: String,
    pub body: Value,
    pub streaming: bool,
}

impl ProviderPayload {
    pub fn new(
        provider: Provider,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        body: Value,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            endpoint: endpoint.into(),
            body,
            streaming: true,
        }
    }

    pub fn non_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sampling parameter allow-lists
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const OPENAI_DIALECT_PARAMS: &[&str] = &[
    "temperature",
    "top_p",
    "max_tokens",
    "max_completion_tokens",
    "frequency_penalty",
    "presence_penalty",
    "stop",
    "seed",
];

const ANTHROPIC_PARAMS: &[&str] = &[
    "temperature",
    "top_p",
    "top_k",
    "max_tokens",
    "stop_sequences",
];

const GEMINI_PARAMS: &[&str] = &[
    "temperature",
    "topP",
    "topK",
    "maxOutputTokens",
    "stopSequences",
    "candidateCount",
];

/// Allowed sampling parameter names for one provider dialect.
///
/// Image providers take no sampling parameters at all; their knobs
/// (size, count) travel through call overrides instead.
pub fn allowed_params(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Anthropic => ANTHROPIC_PARAMS,
        Provider::Gemini => GEMINI_PARAMS,
        Provider::OpenAi | Provider::DeepSeek | Provider::Grok | Provider::Qwen => {
            OPENAI_DIALECT_PARAMS
        }
        Provider::OpenAiImage | Provider::GrokImage => &[],
    }
}

/// Copy every allowed parameter from `params` into `body`, which must be
/// a JSON object. Disallowed parameters are dropped (and logged) rather
/// than rejected.
pub fn apply_sampling(body: &mut Value, params: &ParamSet, provider: Provider) {
    let mut filtered = params.clone();
    filtered.retain_allowed(allowed_params(provider), provider.as_str());
    if let Some(obj) = body.as_object_mut() {
        for (key, value) in filtered.iter() {
            obj.insert(key.clone(), value.clone());
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
