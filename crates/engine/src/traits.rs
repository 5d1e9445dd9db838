//! Collaborator contracts the engine depends on.
//!
//! Persistence, delivery, and tool execution live outside this crate;
//! the engine only sees these traits. [`crate::KeyPool`] and
//! [`crate::QuotaTracker`] provide the in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use sw_domain::message::{MessageDto, MessageState, ToolCall};
use sw_domain::provider::{ModelRef, Provider};
use sw_domain::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Keys
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One acquired API key. The id is stable across acquisitions so outcomes
/// can be reported back; the secret goes only into request headers.
#[derive(Clone)]
pub struct ApiKey {
    pub id: String,
    pub secret: String,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("secret", &"***")
            .finish()
    }
}

/// Hands out API keys per provider and takes outcome reports back.
pub trait KeyManager: Send + Sync {
    /// Acquire a key for the next attempt; `None` when the provider has no
    /// usable key configured.
    fn acquire(&self, provider: Provider) -> Option<ApiKey>;

    fn report_success(&self, provider: Provider, key_id: &str);

    /// The key hit a rate limit; keep it out of rotation for `retry_after`.
    fn report_rate_limited(&self, provider: Provider, key_id: &str, retry_after: Duration);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Quota
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pre-flight usage gate. A failed check means the request never starts.
#[async_trait]
pub trait QuotaService: Send + Sync {
    /// Err(`QuotaExceeded`) when the user is already over a daily limit,
    /// or the pending request's estimated size would push them over.
    async fn check(
        &self,
        user_id: Uuid,
        estimated_tokens: u64,
        estimated_cost_usd: f64,
    ) -> Result<()>;

    /// Record consumption after a completed request.
    async fn record(&self, user_id: Uuid, tokens: u64, cost_usd: f64);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool execution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Runs tool calls the model requested.
///
/// Execution failures must come back as error-content result messages,
/// never as `Err`; a broken tool ends its own call, not the whole turn.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> MessageDto;

    /// The assistant-side message recording the pending calls, appended to
    /// history before the results.
    fn format_tool_request(&self, model: &ModelRef, calls: &[ToolCall]) -> MessageDto {
        let _ = model;
        MessageDto::tool_request("", calls.to_vec())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Notifications
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Receives incremental deltas and state transitions for a streaming
/// message. Implementations must not block the turn loop; drop-and-log is
/// the expected failure mode.
pub trait NotificationSink: Send + Sync {
    fn text_delta(&self, message_id: Uuid, delta: &str);
    fn thinking_delta(&self, message_id: Uuid, delta: &str);
    fn state_changed(&self, message_id: Uuid, state: MessageState);
}

/// A sink that discards everything; useful for tests and batch callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn text_delta(&self, _message_id: Uuid, _delta: &str) {}
    fn thinking_delta(&self, _message_id: Uuid, _delta: &str) {}
    fn state_changed(&self, _message_id: Uuid, _state: MessageState) {}
}
