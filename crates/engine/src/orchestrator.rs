//! Request orchestration: quota gate, key acquisition, retries with
//! exponential backoff, and terminal state handling.

use std::sync::Arc;
use std::time::Duration;

use crate::metrics::MetricsAggregator;
use crate::ops::{CancelToken, OperationRegistry};
use crate::traits::{KeyManager, QuotaService};
use crate::turn::{TurnEngine, TurnOutcome};
use sw_domain::config::EngineConfig;
use sw_domain::message::TargetMessage;
use sw_domain::request::RequestContext;
use sw_domain::stream::Usage;
use sw_domain::provider::Provider;
use sw_domain::{Error, Result};
use sw_providers::client::ProviderClient;
use sw_providers::ProviderRegistry;

/// Client lookup seam; [`ProviderRegistry`] is the production
/// implementation.
pub trait ClientRegistry: Send + Sync {
    fn client_for(&self, provider: Provider) -> Result<Arc<dyn ProviderClient>>;
}

impl ClientRegistry for ProviderRegistry {
    fn client_for(&self, provider: Provider) -> Result<Arc<dyn ProviderClient>> {
        ProviderRegistry::client_for(self, provider)
    }
}

/// `base × factor^(attempt-1)`: attempts 1..3 with the defaults wait
/// 2s, 4s, 8s.
pub fn backoff_delay(attempt: u32, base_secs: u64, factor: f64) -> Duration {
    let scale = factor.powi(attempt.saturating_sub(1) as i32);
    Duration::from_secs_f64(base_secs as f64 * scale)
}

/// Crude size estimate for the quota pre-check: four characters per
/// token over the history and system prompt. Actual consumption is
/// recorded from provider-reported usage after the request completes.
pub fn estimate_request_tokens(ctx: &RequestContext) -> u64 {
    let mut chars: usize = ctx.history.iter().map(|m| m.content.len()).sum();
    if let Some(system) = &ctx.system_prompt {
        chars += system.len();
    }
    (chars / 4) as u64
}

/// Sleep that wakes early when the token is cancelled.
async fn cancellable_sleep(duration: Duration, cancel: &CancelToken) -> bool {
    const SLICE: Duration = Duration::from_millis(50);
    let mut remaining = duration;
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return false;
        }
        let step = remaining.min(SLICE);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
    }
    !cancel.is_cancelled()
}

pub struct Orchestrator {
    engine: TurnEngine,
    keys: Arc<dyn KeyManager>,
    quota: Arc<dyn QuotaService>,
    registry: Arc<dyn ClientRegistry>,
    ops: Arc<OperationRegistry>,
    metrics: Arc<MetricsAggregator>,
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(
        engine: TurnEngine,
        keys: Arc<dyn KeyManager>,
        quota: Arc<dyn QuotaService>,
        registry: Arc<dyn ClientRegistry>,
        ops: Arc<OperationRegistry>,
        metrics: Arc<MetricsAggregator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            engine,
            keys,
            quota,
            registry,
            ops,
            metrics,
            config,
        }
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.ops
    }

    /// Run one generation request end to end.
    ///
    /// Registers the operation for the target message (cancelling any
    /// stream already writing it), gates on quota, then attempts the turn
    /// machine up to `max_retries` times. Fatal errors and retry
    /// exhaustion mark the target failed; cancellation never does.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        target: &mut TargetMessage,
    ) -> Result<TurnOutcome> {
        let cancel = self.ops.register(target.id);
        let result = self.execute_inner(ctx, target, &cancel).await;
        self.ops.finish(target.id);
        result
    }

    async fn execute_inner(
        &self,
        ctx: &RequestContext,
        target: &mut TargetMessage,
        cancel: &CancelToken,
    ) -> Result<TurnOutcome> {
        let provider = ctx.model.provider;

        let estimated_tokens = estimate_request_tokens(ctx);
        if let Err(e) = self.quota.check(ctx.user_id, estimated_tokens, 0.0).await {
            return Err(self.fail(target, provider, e));
        }
        let client = match self.registry.client_for(provider) {
            Ok(c) => c,
            Err(e) => return Err(self.fail(target, provider, e)),
        };

        let started = std::time::Instant::now();
        let mut last_err: Option<Error> = None;

        for attempt in 1..=self.config.max_retries {
            if attempt > 1 {
                self.metrics.record_retry(provider);
            }

            let Some(key) = self.keys.acquire(provider) else {
                let e = Error::Auth(format!("no API key available for {provider}"));
                return Err(self.fail(target, provider, e));
            };

            match self
                .engine
                .stream_turn(ctx, target, client.as_ref(), &key.secret, cancel)
                .await
            {
                Ok(outcome) => {
                    self.keys.report_success(provider, &key.id);
                    self.metrics
                        .record_request(provider, outcome.usage, started.elapsed());
                    self.quota
                        .record(ctx.user_id, u64::from(outcome.usage.total()), 0.0)
                        .await;
                    return Ok(outcome);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %provider,
                        attempt,
                        error = %e,
                        "generation attempt failed"
                    );
                    if !e.is_retryable() {
                        return Err(self.fail(target, provider, e));
                    }

                    let backoff =
                        backoff_delay(attempt, self.config.backoff_base_secs, self.config.backoff_factor);
                    if let Error::RateLimited { retry_after, .. } = &e {
                        self.metrics.record_rate_limit(provider);
                        self.keys
                            .report_rate_limited(provider, &key.id, retry_after.unwrap_or(backoff));
                    }

                    if attempt == self.config.max_retries {
                        last_err = Some(e);
                        break;
                    }

                    // The provider's own retry-after always wins over the
                    // computed backoff.
                    let wait = e.retry_after().unwrap_or(backoff);
                    last_err = Some(e);
                    if !cancellable_sleep(wait, cancel).await {
                        target.interrupt();
                        return Ok(TurnOutcome {
                            usage: Usage::default(),
                            completed: false,
                            thinking: None,
                        });
                    }
                }
            }
        }

        let e = last_err.unwrap_or_else(|| Error::Other("retries exhausted".into()));
        Err(self.fail(target, provider, e))
    }

    fn fail(
        &self,
        target: &mut TargetMessage,
        provider: Provider,
        e: Error,
    ) -> Error {
        tracing::warn!(provider = %provider, error = %e, message_id = %target.id, "request failed");
        self.metrics.record_failure(provider);
        target.fail(&e);
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_domain::message::MessageDto;
    use sw_domain::provider::ModelRef;
    use uuid::Uuid;

    #[test]
    fn token_estimate_covers_history_and_system_prompt() {
        let mut ctx = RequestContext::new(
            Uuid::new_v4(),
            ModelRef::new(Provider::Grok, "grok-3"),
            vec![MessageDto::user("x".repeat(40))],
        );
        assert_eq!(estimate_request_tokens(&ctx), 10);

        ctx.system_prompt = Some("y".repeat(20));
        assert_eq!(estimate_request_tokens(&ctx), 15);
    }

    #[test]
    fn backoff_doubles_from_two_seconds() {
        assert_eq!(backoff_delay(1, 2, 2.0), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, 2, 2.0), Duration::from_secs(4));
        assert_eq!(backoff_delay(3, 2, 2.0), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn cancellable_sleep_wakes_on_cancel() {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let start = std::time::Instant::now();
        let finished = cancellable_sleep(Duration::from_secs(30), &cancel).await;
        assert!(!finished);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellable_sleep_runs_to_completion() {
        let cancel = CancelToken::new();
        assert!(cancellable_sleep(Duration::from_millis(10), &cancel).await);
    }
}
