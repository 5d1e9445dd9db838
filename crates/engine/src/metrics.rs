//! Per-provider stream metrics and the background sweeper.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sw_domain::provider::Provider;
use sw_domain::stream::Usage;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Aggregator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProviderMetrics {
    pub requests: u64,
    pub retries: u64,
    pub rate_limits: u64,
    pub failures: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub stream_duration: Duration,
}

#[derive(Debug, Default)]
struct ProviderSlot {
    totals: ProviderMetrics,
    /// Completion timestamps of recent requests, trimmed by the sweeper.
    samples: Vec<Instant>,
}

/// Counters per provider behind one lock; cheap to clone via `Arc`.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    slots: RwLock<HashMap<Provider, ProviderSlot>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, provider: Provider, usage: Usage, duration: Duration) {
        let mut slots = self.slots.write();
        let slot = slots.entry(provider).or_default();
        slot.totals.requests += 1;
        slot.totals.input_tokens += u64::from(usage.input_tokens);
        slot.totals.output_tokens += u64::from(usage.output_tokens);
        slot.totals.stream_duration += duration;
        slot.samples.push(Instant::now());
    }

    pub fn record_retry(&self, provider: Provider) {
        self.slots.write().entry(provider).or_default().totals.retries += 1;
    }

    pub fn record_rate_limit(&self, provider: Provider) {
        self.slots
            .write()
            .entry(provider)
            .or_default()
            .totals
            .rate_limits += 1;
    }

    pub fn record_failure(&self, provider: Provider) {
        self.slots.write().entry(provider).or_default().totals.failures += 1;
    }

    pub fn snapshot(&self) -> HashMap<Provider, ProviderMetrics> {
        self.slots
            .read()
            .iter()
            .map(|(p, slot)| (*p, slot.totals))
            .collect()
    }

    /// Requests completed within the retention window.
    pub fn recent_request_count(&self, provider: Provider) -> usize {
        self.slots
            .read()
            .get(&provider)
            .map(|s| s.samples.len())
            .unwrap_or(0)
    }

    /// Drop samples older than `retention`. Totals are never trimmed.
    fn sweep(&self, retention: Duration) {
        let cutoff = Instant::now() - retention;
        let mut slots = self.slots.write();
        for slot in slots.values_mut() {
            slot.samples.retain(|t| *t > cutoff);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sweeper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Guard owning the background sweep task; the task stops when the guard
/// drops, so the sweeper's lifetime is tied to whoever spawned it.
pub struct MetricsSweeper {
    handle: tokio::task::JoinHandle<()>,
}

impl MetricsSweeper {
    pub fn spawn(aggregator: Arc<MetricsAggregator>, interval: Duration, retention: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                aggregator.sweep(retention);
                tracing::debug!("metrics sweep complete");
            }
        });
        Self { handle }
    }
}

impl Drop for MetricsSweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
