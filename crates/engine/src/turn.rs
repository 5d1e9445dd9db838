//! The streaming turn state machine.
//!
//! One call to [`TurnEngine::stream_turn`] runs up to `max_turns`
//! generation turns against a provider. A turn that finishes with tool
//! calls executes them sequentially, folds the results into the history,
//! and starts the next turn; a turn that finishes any other way completes
//! the message. The target message's visible content is only persisted at
//! turn boundaries and terminal transitions; per-chunk delivery goes
//! through the notification sink.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;

use crate::accum::ToolCallAccumulator;
use crate::ops::CancelToken;
use crate::traits::{NotificationSink, ToolExecutor};
use sw_domain::message::{MessageState, TargetMessage};
use sw_domain::request::RequestContext;
use sw_domain::stream::Usage;
use sw_domain::Result;
use sw_providers::client::ProviderClient;
use sw_providers::resolver::AttachmentStore;
use sw_providers::{BuilderRegistry, ContentResolver};

/// Outcome of one full multi-turn generation.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub usage: Usage,
    /// `false` when the generation was interrupted (cancel or turn cap).
    pub completed: bool,
    pub thinking: Option<String>,
}

pub struct TurnEngine {
    builders: BuilderRegistry,
    resolver: ContentResolver,
    store: Arc<dyn AttachmentStore>,
    executor: Arc<dyn ToolExecutor>,
    sink: Arc<dyn NotificationSink>,
    max_turns: usize,
}

impl TurnEngine {
    pub fn new(
        builders: BuilderRegistry,
        store: Arc<dyn AttachmentStore>,
        executor: Arc<dyn ToolExecutor>,
        sink: Arc<dyn NotificationSink>,
        max_turns: usize,
    ) -> Self {
        Self {
            builders,
            resolver: ContentResolver::new(),
            store,
            executor,
            sink,
            max_turns,
        }
    }

    /// Drive the stream for one request until completion, interruption, or
    /// error.
    ///
    /// On `Err` the accumulated text is already persisted on `target` so
    /// the caller can retry or fail without losing the partial; terminal
    /// state transitions are left to the caller in that case.
    pub async fn stream_turn(
        &self,
        ctx: &RequestContext,
        target: &mut TargetMessage,
        client: &dyn ProviderClient,
        api_key: &str,
        cancel: &CancelToken,
    ) -> Result<TurnOutcome> {
        let thinking_wanted = ctx.thinking_enabled();
        let allow_tools = ctx.response_kind().allows_tools();
        let started = Instant::now();

        let mut text = String::new();
        let mut thinking = String::new();
        let mut total_usage = Usage::default();
        let mut accum = ToolCallAccumulator::new();
        let mut ctx_current = ctx.clone();

        for turn in 1..=self.max_turns {
            tracing::debug!(message_id = %target.id, turn, "starting generation turn");
            accum.reset();
            let mut turn_usage = Usage::default();

            let builder = self.builders.for_provider(ctx_current.model.provider);
            let payload = builder
                .build(&ctx_current, &self.resolver, self.store.as_ref())
                .await?;
            let mut stream = client.open_stream(&payload, api_key).await?;

            while let Some(item) = stream.next().await {
                if cancel.is_cancelled() {
                    drop(stream);
                    return Ok(self.interrupt(target, text, thinking, total_usage, "cancelled"));
                }
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        self.persist(target, &text, &thinking);
                        return Err(e);
                    }
                };

                turn_usage.add_chunk(&chunk);
                if let Some(delta) = &chunk.text {
                    text.push_str(delta);
                    self.sink.text_delta(target.id, delta);
                }
                if let Some(delta) = &chunk.thinking {
                    if thinking_wanted {
                        thinking.push_str(delta);
                        self.sink.thinking_delta(target.id, delta);
                    }
                }
                if let Some(fragment) = &chunk.tool_call {
                    if allow_tools {
                        accum.apply(fragment);
                    }
                }
            }

            total_usage.accumulate(turn_usage);
            self.persist(target, &text, &thinking);

            // Complete tool calls run regardless of the reported finish
            // reason; Gemini says STOP even when the turn carried
            // function calls. Without `allow_tools` the accumulator
            // stayed empty.
            let calls = accum.completed();
            if calls.is_empty() {
                target.complete();
                self.sink.state_changed(target.id, MessageState::Completed);
                tracing::debug!(
                    message_id = %target.id,
                    turns = turn,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "generation complete"
                );
                return Ok(TurnOutcome {
                    usage: total_usage,
                    completed: true,
                    thinking: (!thinking.is_empty()).then(|| thinking.clone()),
                });
            }

            tracing::debug!(message_id = %target.id, count = calls.len(), "executing tool calls");
            let request_msg = self
                .executor
                .format_tool_request(&ctx_current.model, &calls);
            let mut history = ctx_current.history.clone();
            history.push(request_msg);
            for call in &calls {
                if cancel.is_cancelled() {
                    return Ok(self.interrupt(target, text, thinking, total_usage, "cancelled"));
                }
                history.push(self.executor.execute(call).await);
            }
            ctx_current = ctx_current.with_history(history);
        }

        tracing::warn!(message_id = %target.id, max_turns = self.max_turns, "turn cap reached");
        Ok(self.interrupt(target, text, thinking, total_usage, "turn cap"))
    }

    fn persist(&self, target: &mut TargetMessage, text: &str, thinking: &str) {
        target.set_content(text);
        if !thinking.is_empty() {
            target.thinking = Some(thinking.to_string());
        }
    }

    fn interrupt(
        &self,
        target: &mut TargetMessage,
        text: String,
        thinking: String,
        usage: Usage,
        cause: &str,
    ) -> TurnOutcome {
        tracing::debug!(message_id = %target.id, cause, "generation interrupted");
        self.persist(target, &text, &thinking);
        target.interrupt();
        self.sink.state_changed(target.id, MessageState::Interrupted);
        TurnOutcome {
            usage,
            completed: false,
            thinking: (!thinking.is_empty()).then_some(thinking),
        }
    }
}
