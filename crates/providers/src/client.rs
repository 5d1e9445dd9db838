//! Streaming HTTP clients, one per wire dialect.
//!
//! Each client posts a finished [`ProviderPayload`] and decodes the
//! provider's SSE grammar into provider-neutral [`StreamChunk`]s. The
//! OpenAI dialect covers OpenAI, DeepSeek, Grok and Qwen; Anthropic and
//! Gemini get their own decoders; the image endpoints are a single
//! non-streaming POST wrapped in a one-chunk stream.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::payload::ProviderPayload;
use crate::sse::sse_response_stream;
use crate::util::{classify_status, from_reqwest, parse_retry_after};
use sw_domain::provider::Provider;
use sw_domain::stream::{BoxStream, FinishReason, StreamChunk, ToolCallFragment};
use sw_domain::{Error, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Opens a decoded chunk stream for one provider family.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn open_stream(
        &self,
        payload: &ProviderPayload,
        api_key: &str,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>>;
}

/// Default API base per provider family, overridable via config.
pub fn default_base_url(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi | Provider::OpenAiImage => "https://api.openai.com/v1",
        Provider::Anthropic => "https://api.anthropic.com",
        Provider::Gemini => "https://generativelanguage.googleapis.com",
        Provider::DeepSeek => "https://api.deepseek.com/v1",
        Provider::Grok | Provider::GrokImage => "https://api.x.ai/v1",
        Provider::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(from_reqwest)
}

/// Surface non-2xx responses as domain errors before streaming starts.
async fn check_status(provider: Provider, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider = %provider, status = status.as_u16(), "provider request failed");
    Err(classify_status(provider.as_str(), status, retry_after, &body))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OpenAI dialect (OpenAI / DeepSeek / Grok / Qwen)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenAiStyleClient {
    provider: Provider,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiStyleClient {
    pub fn new(provider: Provider, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl ProviderClient for OpenAiStyleClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn open_stream(
        &self,
        payload: &ProviderPayload,
        api_key: &str,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let url = format!("{}{}", self.base_url, payload.endpoint);
        tracing::debug!(provider = %self.provider, model = %payload.model, "opening chat stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload.body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let response = check_status(self.provider, response).await?;

        Ok(sse_response_stream(response, parse_openai_data))
    }
}

/// Decode one OpenAI-dialect `data:` payload.
///
/// Malformed payloads are skipped with a warning rather than failing the
/// stream; the `[DONE]` sentinel carries no information beyond what the
/// preceding `finish_reason` already said.
fn parse_openai_data(data: &str) -> Vec<Result<StreamChunk>> {
    if data == "[DONE]" {
        return Vec::new();
    }

    let value: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed stream payload");
            return Vec::new();
        }
    };

    let mut chunks = Vec::new();

    if let Some(choice) = value["choices"].get(0) {
        let delta = &choice["delta"];

        if let Some(text) = delta["content"].as_str() {
            if !text.is_empty() {
                chunks.push(Ok(StreamChunk::text(text)));
            }
        }
        if let Some(thinking) = delta["reasoning_content"].as_str() {
            if !thinking.is_empty() {
                chunks.push(Ok(StreamChunk::thinking(thinking)));
            }
        }
        if let Some(calls) = delta["tool_calls"].as_array() {
            for call in calls {
                let fragment = ToolCallFragment {
                    index: call["index"].as_u64().unwrap_or(0) as u32,
                    id: call["id"].as_str().map(String::from),
                    name: call["function"]["name"].as_str().map(String::from),
                    argument_chunk: call["function"]["arguments"].as_str().map(String::from),
                };
                chunks.push(Ok(StreamChunk::tool_fragment(fragment)));
            }
        }
        if let Some(reason) = choice["finish_reason"].as_str() {
            chunks.push(Ok(StreamChunk::finish(FinishReason::parse(reason))));
        }
    }

    // The final usage frame arrives with an empty choices array.
    if let Some(usage) = value["usage"].as_object() {
        let chunk = StreamChunk {
            input_tokens: usage
                .get("prompt_tokens")
                .and_then(|t| t.as_u64())
                .map(|t| t as u32),
            output_tokens: usage
                .get("completion_tokens")
                .and_then(|t| t.as_u64())
                .map(|t| t as u32),
            ..StreamChunk::default()
        };
        if chunk.input_tokens.is_some() || chunk.output_tokens.is_some() {
            chunks.push(Ok(chunk));
        }
    }

    chunks
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Anthropic
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AnthropicClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn open_stream(
        &self,
        payload: &ProviderPayload,
        api_key: &str,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let url = format!("{}{}", self.base_url, payload.endpoint);
        tracing::debug!(model = %payload.model, "opening anthropic stream");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload.body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let response = check_status(Provider::Anthropic, response).await?;

        let mut state = AnthropicStreamState::default();
        Ok(sse_response_stream(response, move |data| {
            parse_anthropic_data(data, &mut state)
        }))
    }
}

/// Per-stream decode state: which content block index is a tool_use block.
#[derive(Default)]
struct AnthropicStreamState {
    tool_block_indexes: std::collections::HashSet<u32>,
}

fn parse_anthropic_data(data: &str, state: &mut AnthropicStreamState) -> Vec<Result<StreamChunk>> {
    let value: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed stream payload");
            return Vec::new();
        }
    };

    let mut chunks = Vec::new();
    match value["type"].as_str().unwrap_or("") {
        "message_start" => {
            if let Some(t) = value["message"]["usage"]["input_tokens"].as_u64() {
                chunks.push(Ok(StreamChunk {
                    input_tokens: Some(t as u32),
                    ..StreamChunk::default()
                }));
            }
        }
        "content_block_start" => {
            let index = value["index"].as_u64().unwrap_or(0) as u32;
            let block = &value["content_block"];
            if block["type"].as_str() == Some("tool_use") {
                state.tool_block_indexes.insert(index);
                chunks.push(Ok(StreamChunk::tool_fragment(ToolCallFragment {
                    index,
                    id: block["id"].as_str().map(String::from),
                    name: block["name"].as_str().map(String::from),
                    argument_chunk: None,
                })));
            }
        }
        "content_block_delta" => {
            let index = value["index"].as_u64().unwrap_or(0) as u32;
            let delta = &value["delta"];
            match delta["type"].as_str().unwrap_or("") {
                "text_delta" => {
                    if let Some(text) = delta["text"].as_str() {
                        chunks.push(Ok(StreamChunk::text(text)));
                    }
                }
                "thinking_delta" => {
                    if let Some(thinking) = delta["thinking"].as_str() {
                        chunks.push(Ok(StreamChunk::thinking(thinking)));
                    }
                }
                "input_json_delta" => {
                    if state.tool_block_indexes.contains(&index) {
                        if let Some(partial) = delta["partial_json"].as_str() {
                            chunks.push(Ok(StreamChunk::tool_fragment(ToolCallFragment {
                                index,
                                id: None,
                                name: None,
                                argument_chunk: Some(partial.to_string()),
                            })));
                        }
                    }
                }
                _ => {}
            }
        }
        "message_delta" => {
            if let Some(reason) = value["delta"]["stop_reason"].as_str() {
                chunks.push(Ok(StreamChunk::finish(FinishReason::parse(reason))));
            }
            if let Some(t) = value["usage"]["output_tokens"].as_u64() {
                chunks.push(Ok(StreamChunk {
                    output_tokens: Some(t as u32),
                    ..StreamChunk::default()
                }));
            }
        }
        "error" => {
            let message = value["error"]["message"]
                .as_str()
                .unwrap_or("unknown stream error")
                .to_string();
            chunks.push(Err(Error::Provider {
                provider: Provider::Anthropic.as_str().into(),
                message,
            }));
        }
        // message_stop, ping, content_block_stop carry nothing we need.
        _ => {}
    }

    chunks
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gemini
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct GeminiClient {
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

/// Strip the `key` query parameter before a URL reaches any log line.
fn redact_url_key(url: &str) -> String {
    match url.find("key=") {
        Some(pos) => format!("{}key=***", &url[..pos]),
        None => url.to_string(),
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn open_stream(
        &self,
        payload: &ProviderPayload,
        api_key: &str,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        // The endpoint already carries ?alt=sse; the key rides alongside.
        let url = format!("{}{}&key={}", self.base_url, payload.endpoint, api_key);
        tracing::debug!(model = %payload.model, url = %redact_url_key(&url), "opening gemini stream");

        let response = self
            .client
            .post(&url)
            .json(&payload.body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let response = check_status(Provider::Gemini, response).await?;

        let mut next_call_index = 0u32;
        Ok(sse_response_stream(response, move |data| {
            parse_gemini_data(data, &mut next_call_index)
        }))
    }
}

fn parse_gemini_data(data: &str, next_call_index: &mut u32) -> Vec<Result<StreamChunk>> {
    let value: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed stream payload");
            return Vec::new();
        }
    };

    let mut chunks = Vec::new();

    if let Some(candidate) = value["candidates"].get(0) {
        if let Some(parts) = candidate["content"]["parts"].as_array() {
            for part in parts {
                if let Some(text) = part["text"].as_str() {
                    if part["thought"].as_bool().unwrap_or(false) {
                        chunks.push(Ok(StreamChunk::thinking(text)));
                    } else {
                        chunks.push(Ok(StreamChunk::text(text)));
                    }
                }
                if let Some(call) = part["functionCall"].as_object() {
                    // Gemini delivers each call whole, never fragmented.
                    let args = call.get("args").cloned().unwrap_or(Value::Null);
                    chunks.push(Ok(StreamChunk::tool_fragment(ToolCallFragment {
                        index: *next_call_index,
                        id: None,
                        name: call.get("name").and_then(|n| n.as_str()).map(String::from),
                        argument_chunk: Some(args.to_string()),
                    })));
                    *next_call_index += 1;
                }
            }
        }
        if let Some(reason) = candidate["finishReason"].as_str() {
            chunks.push(Ok(StreamChunk::finish(FinishReason::parse(reason))));
        }
    }

    if let Some(usage) = value["usageMetadata"].as_object() {
        let chunk = StreamChunk {
            input_tokens: usage
                .get("promptTokenCount")
                .and_then(|t| t.as_u64())
                .map(|t| t as u32),
            output_tokens: usage
                .get("candidatesTokenCount")
                .and_then(|t| t.as_u64())
                .map(|t| t as u32),
            ..StreamChunk::default()
        };
        if chunk.input_tokens.is_some() || chunk.output_tokens.is_some() {
            chunks.push(Ok(chunk));
        }
    }

    chunks
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Image endpoints (non-streaming)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ImageClient {
    provider: Provider,
    base_url: String,
    client: reqwest::Client,
}

impl ImageClient {
    pub fn new(provider: Provider, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl ProviderClient for ImageClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    /// One POST, one chunk: the generated images come back as embedded
    /// base64 tags in the text, ready for the content resolver on replay.
    async fn open_stream(
        &self,
        payload: &ProviderPayload,
        api_key: &str,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let url = format!("{}{}", self.base_url, payload.endpoint);
        tracing::debug!(provider = %self.provider, model = %payload.model, "requesting image generation");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload.body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let response = check_status(self.provider, response).await?;
        let value: Value = response.json().await.map_err(from_reqwest)?;

        let text = image_response_text(self.provider, &value)?;
        let stream = async_stream::stream! {
            yield Ok(StreamChunk::text(text));
            yield Ok(StreamChunk::finish(FinishReason::Stop));
        };
        Ok(Box::pin(stream))
    }
}

fn image_response_text(provider: Provider, value: &Value) -> Result<String> {
    let images = value["data"].as_array().ok_or_else(|| Error::Provider {
        provider: provider.as_str().into(),
        message: "image response missing data array".into(),
    })?;

    let tags: Vec<String> = images
        .iter()
        .filter_map(|img| img["b64_json"].as_str())
        .map(|b64| format!("<image-base64:image/png;base64,{b64}>"))
        .collect();

    if tags.is_empty() {
        return Err(Error::Provider {
            provider: provider.as_str().into(),
            message: "image response contained no base64 payloads".into(),
        });
    }
    Ok(tags.join("\n"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    // ── OpenAI dialect ─────────────────────────────────────────────

    #[test]
    fn openai_text_delta() {
        let chunks =
            parse_openai_data(r#"{"choices":[{"delta":{"content":"Hello"},"index":0}]}"#);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().text.as_deref(), Some("Hello"));
    }

    #[test]
    fn openai_reasoning_content_maps_to_thinking() {
        let chunks =
            parse_openai_data(r#"{"choices":[{"delta":{"reasoning_content":"hmm"}}]}"#);
        assert_eq!(chunks[0].as_ref().unwrap().thinking.as_deref(), Some("hmm"));
    }

    #[test]
    fn openai_tool_call_fragments() {
        let chunks = parse_openai_data(
            r#"{"choices":[{"delta":{"tool_calls":[
                {"index":0,"id":"call_9","function":{"name":"get_weather","arguments":""}},
                {"index":1,"function":{"arguments":"{\"city\""}}
            ]}}]}"#,
        );
        assert_eq!(chunks.len(), 2);
        let first = chunks[0].as_ref().unwrap().tool_call.as_ref().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.id.as_deref(), Some("call_9"));
        assert_eq!(first.name.as_deref(), Some("get_weather"));
        let second = chunks[1].as_ref().unwrap().tool_call.as_ref().unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.argument_chunk.as_deref(), Some("{\"city\""));
    }

    #[test]
    fn openai_finish_and_usage() {
        let chunks = parse_openai_data(
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        );
        assert_eq!(
            chunks[0].as_ref().unwrap().finish,
            Some(FinishReason::ToolCalls)
        );

        let chunks = parse_openai_data(
            r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":34}}"#,
        );
        let chunk = chunks[0].as_ref().unwrap();
        assert_eq!(chunk.input_tokens, Some(12));
        assert_eq!(chunk.output_tokens, Some(34));
    }

    #[test]
    fn openai_done_and_garbage_are_skipped() {
        assert!(parse_openai_data("[DONE]").is_empty());
        assert!(parse_openai_data("not json at all").is_empty());
    }

    // ── Anthropic ──────────────────────────────────────────────────

    #[test]
    fn anthropic_event_sequence_decodes() {
        let mut state = AnthropicStreamState::default();

        let chunks = parse_anthropic_data(
            r#"{"type":"message_start","message":{"usage":{"input_tokens":7}}}"#,
            &mut state,
        );
        assert_eq!(chunks[0].as_ref().unwrap().input_tokens, Some(7));

        let chunks = parse_anthropic_data(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#,
            &mut state,
        );
        assert_eq!(chunks[0].as_ref().unwrap().text.as_deref(), Some("hi"));

        let chunks = parse_anthropic_data(
            r#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"tu_1","name":"search"}}"#,
            &mut state,
        );
        let frag = chunks[0].as_ref().unwrap().tool_call.as_ref().unwrap();
        assert_eq!(frag.index, 1);
        assert_eq!(frag.name.as_deref(), Some("search"));

        let chunks = parse_anthropic_data(
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"q\":"}}"#,
            &mut state,
        );
        let frag = chunks[0].as_ref().unwrap().tool_call.as_ref().unwrap();
        assert_eq!(frag.argument_chunk.as_deref(), Some("{\"q\":"));

        let chunks = parse_anthropic_data(
            r#"{"type":"message_delta","delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":55}}"#,
            &mut state,
        );
        assert_eq!(
            chunks[0].as_ref().unwrap().finish,
            Some(FinishReason::ToolCalls)
        );
        assert_eq!(chunks[1].as_ref().unwrap().output_tokens, Some(55));
    }

    #[test]
    fn anthropic_thinking_delta() {
        let mut state = AnthropicStreamState::default();
        let chunks = parse_anthropic_data(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"step 1"}}"#,
            &mut state,
        );
        assert_eq!(
            chunks[0].as_ref().unwrap().thinking.as_deref(),
            Some("step 1")
        );
    }

    #[test]
    fn anthropic_error_event_surfaces() {
        let mut state = AnthropicStreamState::default();
        let chunks = parse_anthropic_data(
            r#"{"type":"error","error":{"type":"overloaded_error","message":"overloaded"}}"#,
            &mut state,
        );
        assert!(matches!(
            chunks[0].as_ref().unwrap_err(),
            Error::Provider { .. }
        ));
    }

    // ── Gemini ─────────────────────────────────────────────────────

    #[test]
    fn gemini_text_finish_and_usage() {
        let mut idx = 0;
        let chunks = parse_gemini_data(
            r#"{"candidates":[{"content":{"parts":[{"text":"hola"}]},"finishReason":"STOP"}],
                "usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":9}}"#,
            &mut idx,
        );
        assert_eq!(chunks[0].as_ref().unwrap().text.as_deref(), Some("hola"));
        assert_eq!(chunks[1].as_ref().unwrap().finish, Some(FinishReason::Stop));
        assert_eq!(chunks[2].as_ref().unwrap().input_tokens, Some(3));
    }

    #[test]
    fn gemini_function_calls_get_increasing_indexes() {
        let mut idx = 0;
        let chunks = parse_gemini_data(
            r#"{"candidates":[{"content":{"parts":[
                {"functionCall":{"name":"a","args":{"x":1}}},
                {"functionCall":{"name":"b","args":{}}}
            ]}}]}"#,
            &mut idx,
        );
        let f0 = chunks[0].as_ref().unwrap().tool_call.as_ref().unwrap();
        let f1 = chunks[1].as_ref().unwrap().tool_call.as_ref().unwrap();
        assert_eq!((f0.index, f1.index), (0, 1));
        assert_eq!(f0.name.as_deref(), Some("a"));
        assert_eq!(f0.argument_chunk.as_deref(), Some(r#"{"x":1}"#));
    }

    #[test]
    fn gemini_thought_parts_map_to_thinking() {
        let mut idx = 0;
        let chunks = parse_gemini_data(
            r#"{"candidates":[{"content":{"parts":[{"text":"reasoning","thought":true}]}}]}"#,
            &mut idx,
        );
        assert_eq!(
            chunks[0].as_ref().unwrap().thinking.as_deref(),
            Some("reasoning")
        );
    }

    #[test]
    fn url_key_redaction() {
        assert_eq!(
            redact_url_key("https://x/y:streamGenerateContent?alt=sse&key=SECRET"),
            "https://x/y:streamGenerateContent?alt=sse&key=***"
        );
    }

    // ── Image ──────────────────────────────────────────────────────

    #[test]
    fn image_response_becomes_embedded_tags() {
        let value = serde_json::json!({"data": [{"b64_json": "AAA"}, {"b64_json": "BBB"}]});
        let text = image_response_text(Provider::OpenAiImage, &value).unwrap();
        assert_eq!(
            text,
            "<image-base64:image/png;base64,AAA>\n<image-base64:image/png;base64,BBB>"
        );
    }

    #[test]
    fn empty_image_response_is_an_error() {
        let value = serde_json::json!({"data": []});
        assert!(image_response_text(Provider::GrokImage, &value).is_err());
    }
}
