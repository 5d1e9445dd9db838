use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub keys: KeyPoolConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Base URL overrides per provider (defaults baked into the clients).
    #[serde(default)]
    pub base_urls: HashMap<Provider, String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine (turn loop + retry policy)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard cap on tool-calling turns per message (safety valve).
    #[serde(default = "d_5")]
    pub max_turns: usize,
    /// Attempts per request before surfacing the last error.
    #[serde(default = "d_3")]
    pub max_retries: u32,
    /// Base delay for exponential backoff (seconds).
    #[serde(default = "d_2")]
    pub backoff_base_secs: u64,
    /// Backoff growth factor per attempt.
    #[serde(default = "d_2f")]
    pub backoff_factor: f64,
    /// Fixed thinking token budget for providers that require one.
    #[serde(default = "d_2048")]
    pub thinking_budget_tokens: u32,
    /// Per-request HTTP timeout (seconds).
    #[serde(default = "d_120")]
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: 5,
            max_retries: 3,
            backoff_base_secs: 2,
            backoff_factor: 2.0,
            thinking_budget_tokens: 2048,
            request_timeout_secs: 120,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// API key pool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One configured API key: either a direct value or an env var name.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeyConfig {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeyPoolConfig {
    /// Keys per provider; multiple keys rotate round-robin.
    #[serde(default)]
    pub providers: HashMap<Provider, Vec<KeyConfig>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Quota
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserQuota {
    #[serde(default)]
    pub daily_tokens: Option<u64>,
    #[serde(default)]
    pub daily_cost_usd: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuotaConfig {
    #[serde(default)]
    pub default_daily_tokens: Option<u64>,
    #[serde(default)]
    pub default_daily_cost_usd: Option<f64>,
    /// Per-user overrides keyed by user id string.
    #[serde(default)]
    pub per_user: HashMap<String, UserQuota>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Metrics
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// How often the sweeper trims stale per-provider samples (seconds).
    #[serde(default = "d_60")]
    pub sweep_interval_secs: u64,
    /// Samples older than this are dropped by the sweeper (seconds).
    #[serde(default = "d_3600")]
    pub retention_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            retention_secs: 3600,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Default value helpers (serde)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_5() -> usize {
    5
}
fn d_3() -> u32 {
    3
}
fn d_2() -> u64 {
    2
}
fn d_2f() -> f64 {
    2.0
}
fn d_2048() -> u32 {
    2048
}
fn d_120() -> u64 {
    120
}
fn d_60() -> u64 {
    60
}
fn d_3600() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_turns, 5);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.backoff_base_secs, 2);
        assert_eq!(cfg.backoff_factor, 2.0);
    }

    #[test]
    fn config_deserializes_from_empty_toml() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.engine.max_turns, 5);
        assert!(cfg.keys.providers.is_empty());
    }

    #[test]
    fn key_pool_from_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [keys]
            [[keys.providers.anthropic]]
            env = "ANTHROPIC_API_KEY"
            [[keys.providers.anthropic]]
            key = "sk-direct"
            [[keys.providers.openai]]
            env = "OPENAI_API_KEY"
            "#,
        )
        .unwrap();
        let keys = cfg.keys.providers.get(&Provider::Anthropic).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].env.as_deref(), Some("ANTHROPIC_API_KEY"));
        assert_eq!(keys[1].key.as_deref(), Some("sk-direct"));
        assert!(cfg.keys.providers.contains_key(&Provider::OpenAi));
    }
}
