//! Tool definition translation.
//!
//! The tool catalog is provider-neutral ([`ToolSpec`]); each dialect wants
//! its own wire shape. Specs without a parameter schema are skipped with a
//! diagnostic, never sent malformed.

use serde_json::{json, Value};

use sw_domain::provider::Provider;
use sw_domain::request::ToolSpec;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Per-dialect translation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An empty-object schema for the rare tool that truly takes no input.
fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn usable<'a>(specs: &'a [ToolSpec]) -> impl Iterator<Item = &'a ToolSpec> {
    specs.iter().filter(|spec| {
        if spec.parameters.is_none() {
            tracing::warn!(tool = %spec.name, "tool has no parameter schema, skipping");
            return false;
        }
        true
    })
}

/// OpenAI chat-completions shape, also spoken by DeepSeek, Grok and Qwen:
/// `{"type": "function", "function": {...}}`.
pub fn to_openai_tools(specs: &[ToolSpec]) -> Vec<Value> {
    usable(specs)
        .map(|spec| {
            json!({
                "type": "function",
                "function": {
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.parameters.clone().unwrap_or_else(empty_schema),
                }
            })
        })
        .collect()
}

/// Anthropic messages shape: flat object with `input_schema`.
pub fn to_anthropic_tools(specs: &[ToolSpec]) -> Vec<Value> {
    usable(specs)
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "input_schema": spec.parameters.clone().unwrap_or_else(empty_schema),
            })
        })
        .collect()
}

/// Gemini shape: a single `tools` entry holding every declaration under
/// `functionDeclarations`.
pub fn to_gemini_tools(specs: &[ToolSpec]) -> Vec<Value> {
    let declarations: Vec<Value> = usable(specs)
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "parameters": spec.parameters.clone().unwrap_or_else(empty_schema),
            })
        })
        .collect();
    if declarations.is_empty() {
        return Vec::new();
    }
    vec![json!({"functionDeclarations": declarations})]
}

/// Translate for `provider`, returning `None` when nothing survives the
/// schema filter (callers then omit the tools field entirely).
pub fn translate_tools(provider: Provider, specs: &[ToolSpec]) -> Option<Vec<Value>> {
    let translated = match provider {
        Provider::Anthropic => to_anthropic_tools(specs),
        Provider::Gemini => to_gemini_tools(specs),
        p if p.is_openai_dialect() => to_openai_tools(specs),
        _ => Vec::new(),
    };
    (!translated.is_empty()).then_some(translated)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_weather".into(),
                description: "Current weather for a city".into(),
                parameters: Some(json!({
                    "type": "object",
                    "properties": {"city": {"type": "string"}},
                    "required": ["city"],
                })),
            },
            ToolSpec {
                name: "broken_tool".into(),
                description: "No schema declared".into(),
                parameters: None,
            },
        ]
    }

    #[test]
    fn openai_shape_is_nested_under_function() {
        let tools = to_openai_tools(&specs());
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "get_weather");
        assert!(tools[0]["function"]["parameters"].is_object());
    }

    #[test]
    fn anthropic_shape_uses_input_schema() {
        let tools = to_anthropic_tools(&specs());
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "get_weather");
        assert!(tools[0]["input_schema"]["properties"]["city"].is_object());
    }

    #[test]
    fn gemini_wraps_declarations() {
        let tools = to_gemini_tools(&specs());
        assert_eq!(tools.len(), 1);
        let decls = tools[0]["functionDeclarations"].as_array().unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0]["name"], "get_weather");
    }

    #[test]
    fn schemaless_only_catalog_translates_to_none() {
        let only_broken = vec![ToolSpec {
            name: "broken_tool".into(),
            description: "no schema".into(),
            parameters: None,
        }];
        assert!(translate_tools(Provider::Grok, &only_broken).is_none());
        assert!(translate_tools(Provider::Gemini, &only_broken).is_none());
    }

    #[test]
    fn image_providers_never_get_tools() {
        assert!(translate_tools(Provider::OpenAiImage, &specs()).is_none());
    }
}
