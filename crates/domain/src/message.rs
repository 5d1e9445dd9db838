use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A structured tool invocation emitted by the model.
///
/// Every stream decoder converts its provider's tool-call dialect into this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// The result of executing one tool call locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub content: String,
}

/// Immutable per-turn snapshot of one conversation message.
///
/// Built fresh from persisted entities before each request; never mutated
/// after construction. Attachments are referenced by id and resolved lazily
/// by the content resolver while serializing history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    /// `true` when the message was authored by the model.
    pub from_assistant: bool,
    pub content: String,
    /// Ordered attachment references embedded via placeholder tags.
    #[serde(default)]
    pub attachment_ids: Vec<Uuid>,
    /// Provider-exposed reasoning trace attached to an assistant message.
    #[serde(default)]
    pub thinking: Option<String>,
    /// Tool calls this assistant message requested.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Present when this message carries the result of a tool call.
    #[serde(default)]
    pub tool_result: Option<ToolResult>,
}

impl MessageDto {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_assistant: false,
            content: content.into(),
            attachment_ids: Vec::new(),
            thinking: None,
            tool_calls: Vec::new(),
            tool_result: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            from_assistant: true,
            ..Self::user(content)
        }
    }

    /// A synthetic assistant message representing pending tool calls.
    pub fn tool_request(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::assistant(content)
        }
    }

    /// A message carrying one tool execution result.
    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            content: result.content.clone(),
            tool_result: Some(result),
            ..Self::user("")
        }
    }
}

/// Lifecycle state of the in-flight AI message being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    Streaming,
    Completed,
    Interrupted,
    Failed,
}

/// The mutable AI message the engine writes into as the stream progresses.
///
/// Content and state mutate once per turn boundary (and on terminal
/// transitions), not per chunk; incremental chunk delivery goes through the
/// notification sink instead.
#[derive(Debug, Clone)]
pub struct TargetMessage {
    pub id: Uuid,
    pub content: String,
    pub thinking: Option<String>,
    pub state: MessageState,
}

impl TargetMessage {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            content: String::new(),
            thinking: None,
            state: MessageState::Streaming,
        }
    }

    /// Replace the visible content with the accumulated text so far.
    pub fn set_content(&mut self, text: &str) {
        self.content = text.to_string();
    }

    pub fn complete(&mut self) {
        self.state = MessageState::Completed;
    }

    /// Preserve whatever was accumulated and mark the message interrupted.
    pub fn interrupt(&mut self) {
        self.state = MessageState::Interrupted;
    }

    /// Transition to failed, appending the error to the visible content so
    /// the partial conversation is not lost.
    pub fn fail(&mut self, error: &crate::Error) {
        if !self.content.is_empty() {
            self.content.push_str("\n\n");
        }
        self.content.push_str(&format!("[error: {error}]"));
        self.state = MessageState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_appends_error_to_partial_content() {
        let mut target = TargetMessage::new(Uuid::new_v4());
        target.set_content("partial answer");
        target.fail(&crate::Error::Http("boom".into()));
        assert_eq!(target.state, MessageState::Failed);
        assert!(target.content.starts_with("partial answer"));
        assert!(target.content.contains("boom"));
    }

    #[test]
    fn interrupt_preserves_content() {
        let mut target = TargetMessage::new(Uuid::new_v4());
        target.set_content("half a thought");
        target.interrupt();
        assert_eq!(target.state, MessageState::Interrupted);
        assert_eq!(target.content, "half a thought");
    }

    #[test]
    fn tool_request_constructor_sets_calls() {
        let msg = MessageDto::tool_request(
            "calling tools",
            vec![ToolCall {
                call_id: "c1".into(),
                tool_name: "search".into(),
                arguments: serde_json::json!({"q": "rust"}),
            }],
        );
        assert!(msg.from_assistant);
        assert_eq!(msg.tool_calls.len(), 1);
    }
}
