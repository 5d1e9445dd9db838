use serde::{Deserialize, Serialize};

/// A third-party model provider family.
///
/// The engine speaks each family's wire dialect through a dedicated payload
/// builder and stream decoder; everything upstream of those is keyed on this
/// enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    // Renames keep serde names identical to `as_str`, so config keys and
    // log fields agree.
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Gemini,
    #[serde(rename = "deepseek")]
    DeepSeek,
    Grok,
    Qwen,
    #[serde(rename = "openai_image")]
    OpenAiImage,
    GrokImage,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
            Provider::DeepSeek => "deepseek",
            Provider::Grok => "grok",
            Provider::Qwen => "qwen",
            Provider::OpenAiImage => "openai_image",
            Provider::GrokImage => "grok_image",
        }
    }

    /// Whether this provider generates images rather than chat completions.
    pub fn is_image(&self) -> bool {
        matches!(self, Provider::OpenAiImage | Provider::GrokImage)
    }

    /// Providers that follow the OpenAI chat-completions wire dialect.
    pub fn is_openai_dialect(&self) -> bool {
        matches!(
            self,
            Provider::OpenAi | Provider::DeepSeek | Provider::Grok | Provider::Qwen
        )
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of response a request expects.
///
/// `Text` and `ToolCall` both run the tool loop; `Image` disables tool
/// handling outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Text,
    ToolCall,
    Image,
}

impl ResponseKind {
    pub fn allows_tools(&self) -> bool {
        !matches!(self, ResponseKind::Image)
    }
}

/// A concrete {provider, model} pair targeted by one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: Provider,
    pub name: String,
}

impl ModelRef {
    pub fn new(provider: Provider, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }

    /// Whether this model exposes a separate "thinking" trace in its stream.
    pub fn supports_thinking(&self) -> bool {
        match self.provider {
            Provider::Anthropic => {
                self.name.contains("claude-3-7")
                    || self.name.contains("claude-sonnet-4")
                    || self.name.contains("claude-opus-4")
            }
            Provider::DeepSeek => self.name.contains("reasoner"),
            Provider::Gemini => self.name.contains("thinking") || self.name.contains("2.5"),
            Provider::Qwen => self.name.contains("thinking"),
            _ => false,
        }
    }

    /// The response kind this model produces by default.
    pub fn response_kind(&self) -> ResponseKind {
        if self.provider.is_image() {
            ResponseKind::Image
        } else {
            ResponseKind::Text
        }
    }
}
