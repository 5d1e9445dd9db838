//! Tool-call fragment accumulator.
//!
//! Providers stream tool calls as fragments keyed by index: the id and
//! name usually arrive first, argument JSON trickles in afterwards, and
//! fragments for different calls may interleave. The accumulator is
//! insensitive to that interleaving; only per-index arrival order matters,
//! and argument chunks for one index always arrive in order.

use std::collections::BTreeMap;

use sw_domain::message::ToolCall;
use sw_domain::stream::ToolCallFragment;

#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Assembles [`ToolCall`]s from streamed fragments, one turn at a time.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    partial: BTreeMap<u32, PartialToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment in. Absent fields never erase accumulated state.
    pub fn apply(&mut self, fragment: &ToolCallFragment) {
        let entry = self.partial.entry(fragment.index).or_default();
        if let Some(id) = &fragment.id {
            entry.id = Some(id.clone());
        }
        if let Some(name) = &fragment.name {
            entry.name = Some(name.clone());
        }
        if let Some(chunk) = &fragment.argument_chunk {
            entry.arguments.push_str(chunk);
        }
    }

    /// Discard everything accumulated; called at each turn start.
    pub fn reset(&mut self) {
        self.partial.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.partial.is_empty()
    }

    /// Drain the completed calls in index order.
    ///
    /// A call is complete only when both a non-empty name and a non-empty
    /// argument buffer accumulated; anything else is a partial the stream
    /// never finished and is dropped with a warning. Argument buffers that
    /// fail to parse as JSON degrade to `{}` so the tool still runs.
    pub fn completed(&mut self) -> Vec<ToolCall> {
        let mut calls = Vec::new();
        for (index, partial) in std::mem::take(&mut self.partial) {
            let name = match &partial.name {
                Some(n) if !n.is_empty() => n.clone(),
                _ => {
                    tracing::warn!(index, "dropping tool call without a name");
                    continue;
                }
            };
            if partial.arguments.is_empty() {
                tracing::warn!(index, tool = %name, "dropping tool call without arguments");
                continue;
            }
            let arguments = match serde_json::from_str(&partial.arguments) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(index, tool = %name, error = %e, "tool arguments are not valid JSON");
                    serde_json::json!({})
                }
            };
            calls.push(ToolCall {
                call_id: partial
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("call_{index}")),
                tool_name: name,
                arguments,
            });
        }
        calls
    }
}
