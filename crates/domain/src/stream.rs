use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for provider streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Why the provider stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    /// The tool/function-call sentinel: the model wants tools executed.
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Normalize a provider's finish-reason string.
    pub fn parse(s: &str) -> Self {
        match s {
            "stop" | "end_turn" | "STOP" => FinishReason::Stop,
            "tool_calls" | "tool_use" | "function_call" => FinishReason::ToolCalls,
            "length" | "max_tokens" | "MAX_TOKENS" => FinishReason::Length,
            "content_filter" | "SAFETY" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// A fragment of one tool call, delivered across multiple stream events.
///
/// Fields arrive incrementally; only the fields present in a fragment may
/// overwrite accumulated state. Fragments for the same call share an `index`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallFragment {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub argument_chunk: Option<String>,
}

/// One decoded unit from a provider stream (provider-agnostic).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub tool_call: Option<ToolCallFragment>,
    #[serde(default)]
    pub finish: Option<FinishReason>,
    #[serde(default)]
    pub input_tokens: Option<u32>,
    #[serde(default)]
    pub output_tokens: Option<u32>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        Self {
            thinking: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn tool_fragment(fragment: ToolCallFragment) -> Self {
        Self {
            tool_call: Some(fragment),
            ..Self::default()
        }
    }

    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish: Some(reason),
            ..Self::default()
        }
    }
}

/// Token usage accumulated across an entire multi-turn generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn add_chunk(&mut self, chunk: &StreamChunk) {
        if let Some(t) = chunk.input_tokens {
            self.input_tokens = self.input_tokens.max(t);
        }
        if let Some(t) = chunk.output_tokens {
            self.output_tokens = self.output_tokens.max(t);
        }
    }

    pub fn accumulate(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_normalization() {
        assert_eq!(FinishReason::parse("end_turn"), FinishReason::Stop);
        assert_eq!(FinishReason::parse("tool_use"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::parse("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::parse("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(
            FinishReason::parse("weird"),
            FinishReason::Other("weird".into())
        );
    }

    #[test]
    fn usage_takes_max_within_turn_and_sums_across_turns() {
        let mut turn = Usage::default();
        turn.add_chunk(&StreamChunk {
            input_tokens: Some(100),
            ..Default::default()
        });
        turn.add_chunk(&StreamChunk {
            input_tokens: Some(100),
            output_tokens: Some(42),
            ..Default::default()
        });
        assert_eq!(turn.input_tokens, 100);
        assert_eq!(turn.output_tokens, 42);

        let mut total = Usage::default();
        total.accumulate(turn);
        total.accumulate(turn);
        assert_eq!(total.total(), 284);
    }
}
