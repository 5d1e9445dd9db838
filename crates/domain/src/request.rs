use crate::message::MessageDto;
use crate::provider::{ModelRef, ResponseKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An ordered key→value set of sampling parameters.
///
/// Layered merging keeps the priority order explicit (provider defaults,
/// then user settings, then agent parameters, then per-call overrides);
/// the per-provider allow-list is applied last so unsupported keys are
/// dropped with a diagnostic instead of being sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet(pub Vec<(String, Value)>);

impl ParamSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    /// Overlay `other` on top of this set: keys in `other` win.
    pub fn merge_over(&mut self, other: &ParamSet) {
        for (k, v) in &other.0 {
            self.set(k.clone(), v.clone());
        }
    }

    /// Drop every key not in `allowed`, logging what was discarded.
    pub fn retain_allowed(&mut self, allowed: &[&str], provider: &str) {
        self.0.retain(|(k, _)| {
            let keep = allowed.contains(&k.as_str());
            if !keep {
                tracing::debug!(provider, param = %k, "dropping unsupported sampling parameter");
            }
            keep
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How aggressively provider-side safety filtering is configured.
/// Only Gemini maps this onto wire settings; others ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Strict,
    Standard,
    Relaxed,
}

/// How the model may use the offered tool catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides whether and which tool to call.
    Auto,
    /// Tools stay declared but the model must answer in text.
    None,
    /// The model must call the named function.
    Named(String),
}

/// Per-call parameter overrides, highest priority in the merge order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallOverrides {
    #[serde(default)]
    pub thinking: Option<bool>,
    /// Constrains tool use for dialects that support it; absent means auto.
    #[serde(default)]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub image_size: Option<String>,
    #[serde(default)]
    pub image_count: Option<u8>,
    #[serde(default)]
    pub safety: Option<SafetyLevel>,
    /// Forces the response kind; defaults to the model's natural kind.
    #[serde(default)]
    pub response_kind: Option<ResponseKind>,
}

/// A tool catalog entry offered to the model.
///
/// `parameters: None` means the plugin never declared a schema; translators
/// must skip such entries rather than send them malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Option<Value>,
}

/// Per-attempt aggregate describing one generation request.
///
/// Immutable; the turn loop produces successor contexts via
/// [`RequestContext::with_history`]. The history never includes the
/// in-flight AI placeholder message being generated.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub model: ModelRef,
    pub history: Vec<MessageDto>,
    pub system_prompt: Option<String>,
    /// Agent-level custom sampling parameters.
    pub agent_params: Option<ParamSet>,
    /// User-level default sampling settings.
    pub user_params: Option<ParamSet>,
    pub overrides: CallOverrides,
    pub tools: Option<Vec<ToolSpec>>,
}

impl RequestContext {
    pub fn new(user_id: Uuid, model: ModelRef, history: Vec<MessageDto>) -> Self {
        Self {
            user_id,
            model,
            history,
            system_prompt: None,
            agent_params: None,
            user_params: None,
            overrides: CallOverrides::default(),
            tools: None,
        }
    }

    /// Structural copy with the history replaced (used at turn boundaries).
    pub fn with_history(&self, history: Vec<MessageDto>) -> Self {
        Self {
            history,
            ..self.clone()
        }
    }

    /// The effective response kind for this request.
    pub fn response_kind(&self) -> ResponseKind {
        self.overrides
            .response_kind
            .unwrap_or_else(|| self.model.response_kind())
    }

    /// Whether the thinking trace should be requested and surfaced.
    pub fn thinking_enabled(&self) -> bool {
        self.overrides.thinking.unwrap_or(false) && self.model.supports_thinking()
    }

    /// Merge sampling layers in priority order (lowest first):
    /// user defaults ← agent parameters ← per-call overrides.
    pub fn merged_params(&self) -> ParamSet {
        let mut merged = ParamSet::new();
        if let Some(user) = &self.user_params {
            merged.merge_over(user);
        }
        if let Some(agent) = &self.agent_params {
            merged.merge_over(agent);
        }
        if let Some(t) = self.overrides.temperature {
            merged.set("temperature", serde_json::json!(t));
        }
        if let Some(m) = self.overrides.max_output_tokens {
            merged.set("max_tokens", serde_json::json!(m));
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    fn ctx() -> RequestContext {
        RequestContext::new(
            Uuid::new_v4(),
            ModelRef::new(Provider::OpenAi, "gpt-4o"),
            vec![MessageDto::user("hi")],
        )
    }

    #[test]
    fn override_wins_over_agent_and_user_params() {
        let mut c = ctx();
        let mut user = ParamSet::new();
        user.set("temperature", serde_json::json!(0.1));
        user.set("top_p", serde_json::json!(0.9));
        let mut agent = ParamSet::new();
        agent.set("temperature", serde_json::json!(0.5));
        c.user_params = Some(user);
        c.agent_params = Some(agent);
        c.overrides.temperature = Some(0.9);

        let merged = c.merged_params();
        assert_eq!(merged.get("temperature"), Some(&serde_json::json!(0.9)));
        assert_eq!(merged.get("top_p"), Some(&serde_json::json!(0.9)));
    }

    #[test]
    fn retain_allowed_drops_unknown_keys() {
        let mut p = ParamSet::new();
        p.set("temperature", serde_json::json!(0.7));
        p.set("frobnicate", serde_json::json!(true));
        p.retain_allowed(&["temperature", "max_tokens"], "openai");
        assert!(p.get("temperature").is_some());
        assert!(p.get("frobnicate").is_none());
    }

    #[test]
    fn with_history_preserves_everything_else() {
        let mut c = ctx();
        c.overrides.thinking = Some(true);
        let replaced = c.with_history(vec![MessageDto::user("new")]);
        assert_eq!(replaced.history.len(), 1);
        assert_eq!(replaced.history[0].content, "new");
        assert_eq!(replaced.overrides.thinking, Some(true));
        assert_eq!(replaced.model, c.model);
    }

    #[test]
    fn thinking_requires_model_support_and_override() {
        let mut c = ctx();
        c.overrides.thinking = Some(true);
        // gpt-4o has no thinking trace.
        assert!(!c.thinking_enabled());

        c.model = ModelRef::new(Provider::DeepSeek, "deepseek-reasoner");
        assert!(c.thinking_enabled());

        c.overrides.thinking = None;
        assert!(!c.thinking_enabled());
    }

    #[test]
    fn param_set_is_ordered() {
        let mut p = ParamSet::new();
        p.set("b", serde_json::json!(2));
        p.set("a", serde_json::json!(1));
        let keys: Vec<&str> = p.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
