//! Per-user daily usage quotas.
//!
//! Counters reset at UTC midnight via lazy date comparison: the first
//! touch on a new day clears the bucket, no background job involved.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::traits::QuotaService;
use sw_domain::config::QuotaConfig;
use sw_domain::{Error, Result};

#[derive(Debug, Clone, Copy)]
struct DayUsage {
    date: NaiveDate,
    tokens: u64,
    cost_usd: f64,
}

/// In-memory [`QuotaService`] over config-declared limits.
///
/// A user with no limits configured (neither per-user nor default) is
/// never throttled.
pub struct QuotaTracker {
    config: QuotaConfig,
    usage: RwLock<HashMap<Uuid, DayUsage>>,
}

impl QuotaTracker {
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config,
            usage: RwLock::new(HashMap::new()),
        }
    }

    fn limits_for(&self, user_id: Uuid) -> (Option<u64>, Option<f64>) {
        let per_user = self.config.per_user.get(&user_id.to_string());
        let tokens = per_user
            .and_then(|q| q.daily_tokens)
            .or(self.config.default_daily_tokens);
        let cost = per_user
            .and_then(|q| q.daily_cost_usd)
            .or(self.config.default_daily_cost_usd);
        (tokens, cost)
    }

    fn today_usage(&self, user_id: Uuid) -> DayUsage {
        let today = Utc::now().date_naive();
        let usage = self.usage.read();
        match usage.get(&user_id) {
            Some(day) if day.date == today => *day,
            _ => DayUsage {
                date: today,
                tokens: 0,
                cost_usd: 0.0,
            },
        }
    }

    /// Today's consumed token count for a user (metrics, tests).
    pub fn tokens_today(&self, user_id: Uuid) -> u64 {
        self.today_usage(user_id).tokens
    }
}

#[async_trait]
impl QuotaService for QuotaTracker {
    async fn check(
        &self,
        user_id: Uuid,
        estimated_tokens: u64,
        estimated_cost_usd: f64,
    ) -> Result<()> {
        let (token_limit, cost_limit) = self.limits_for(user_id);
        let usage = self.today_usage(user_id);

        if let Some(limit) = token_limit {
            let projected = usage.tokens.saturating_add(estimated_tokens);
            if usage.tokens >= limit || projected > limit {
                tracing::warn!(%user_id, used = usage.tokens, projected, limit, "daily token quota exhausted");
                return Err(Error::QuotaExceeded {
                    reason: format!("daily token limit reached ({projected} of {limit})"),
                });
            }
        }
        if let Some(limit) = cost_limit {
            let projected = usage.cost_usd + estimated_cost_usd;
            if usage.cost_usd >= limit || projected > limit {
                tracing::warn!(%user_id, used = usage.cost_usd, projected, limit, "daily cost quota exhausted");
                return Err(Error::QuotaExceeded {
                    reason: format!("daily cost limit reached (${projected:.2} of ${limit:.2})"),
                });
            }
        }
        Ok(())
    }

    async fn record(&self, user_id: Uuid, tokens: u64, cost_usd: f64) {
        let today = Utc::now().date_naive();
        let mut usage = self.usage.write();
        let entry = usage.entry(user_id).or_insert(DayUsage {
            date: today,
            tokens: 0,
            cost_usd: 0.0,
        });
        if entry.date != today {
            entry.date = today;
            entry.tokens = 0;
            entry.cost_usd = 0.0;
        }
        entry.tokens += tokens;
        entry.cost_usd += cost_usd;
    }
}
