//! In-memory API key pool with round-robin rotation and rate-limit
//! cooldown.
//!
//! Each provider gets its own rotor over its configured keys. A key
//! reported rate-limited leaves rotation until its cooldown deadline; if
//! every key for a provider is cooling down, the one whose deadline
//! expires soonest is handed out anyway so requests keep flowing.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::traits::{ApiKey, KeyManager};
use sw_domain::config::KeyPoolConfig;
use sw_domain::provider::Provider;

struct KeySlot {
    id: String,
    secret: String,
    /// Cooldown deadline; the slot is healthy once this passes.
    cooling_until: Option<Instant>,
    uses: u64,
}

struct ProviderRotor {
    slots: Mutex<Vec<KeySlot>>,
    index: AtomicUsize,
}

impl ProviderRotor {
    fn new(provider: Provider, secrets: Vec<String>) -> Self {
        let slots = secrets
            .into_iter()
            .enumerate()
            .map(|(i, secret)| KeySlot {
                id: format!("{provider}-{i}"),
                secret,
                cooling_until: None,
                uses: 0,
            })
            .collect();
        Self {
            slots: Mutex::new(slots),
            index: AtomicUsize::new(0),
        }
    }

    fn acquire(&self) -> Option<ApiKey> {
        let mut slots = self.slots.lock();
        let len = slots.len();
        if len == 0 {
            return None;
        }
        let now = Instant::now();
        let start = self.index.fetch_add(1, Ordering::Relaxed) % len;

        for offset in 0..len {
            let idx = (start + offset) % len;
            let healthy = match slots[idx].cooling_until {
                Some(until) => until <= now,
                None => true,
            };
            if healthy {
                let slot = &mut slots[idx];
                slot.cooling_until = None;
                slot.uses += 1;
                return Some(ApiKey {
                    id: slot.id.clone(),
                    secret: slot.secret.clone(),
                });
            }
        }

        // Everything is cooling down; take the slot that recovers soonest.
        let idx = slots
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.cooling_until.unwrap_or(now))
            .map(|(i, _)| i)?;
        let slot = &mut slots[idx];
        slot.uses += 1;
        Some(ApiKey {
            id: slot.id.clone(),
            secret: slot.secret.clone(),
        })
    }

    fn set_cooldown(&self, key_id: &str, until: Instant) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|s| s.id == key_id) {
            slot.cooling_until = Some(until);
        }
    }

    fn clear_cooldown(&self, key_id: &str) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|s| s.id == key_id) {
            slot.cooling_until = None;
        }
    }

    fn use_counts(&self) -> Vec<u64> {
        self.slots.lock().iter().map(|s| s.uses).collect()
    }
}

/// The engine's [`KeyManager`] implementation over config-declared keys.
pub struct KeyPool {
    rotors: HashMap<Provider, ProviderRotor>,
}

impl KeyPool {
    /// Resolve configured keys (direct values or env var names). Entries
    /// that resolve to nothing are skipped with a warning.
    pub fn from_config(config: &KeyPoolConfig) -> Self {
        let mut rotors = HashMap::new();
        for (&provider, entries) in &config.providers {
            let mut secrets = Vec::new();
            for entry in entries {
                let resolved = match (&entry.key, &entry.env) {
                    (Some(key), _) if !key.is_empty() => Some(key.clone()),
                    (_, Some(env)) => match std::env::var(env) {
                        Ok(v) if !v.is_empty() => Some(v),
                        _ => {
                            tracing::warn!(provider = %provider, env, "key env var not set, skipping");
                            None
                        }
                    },
                    _ => None,
                };
                if let Some(secret) = resolved {
                    secrets.push(secret);
                }
            }
            if secrets.is_empty() {
                tracing::warn!(provider = %provider, "no usable keys configured");
                continue;
            }
            rotors.insert(provider, ProviderRotor::new(provider, secrets));
        }
        Self { rotors }
    }

    /// Build a pool directly from resolved secrets (tests, embedding).
    pub fn from_secrets(providers: HashMap<Provider, Vec<String>>) -> Self {
        let rotors = providers
            .into_iter()
            .map(|(p, secrets)| (p, ProviderRotor::new(p, secrets)))
            .collect();
        Self { rotors }
    }

    /// Per-key acquisition counts, for metrics and tests.
    pub fn use_counts(&self, provider: Provider) -> Vec<u64> {
        self.rotors
            .get(&provider)
            .map(|r| r.use_counts())
            .unwrap_or_default()
    }
}

impl KeyManager for KeyPool {
    fn acquire(&self, provider: Provider) -> Option<ApiKey> {
        self.rotors.get(&provider)?.acquire()
    }

    fn report_success(&self, provider: Provider, key_id: &str) {
        if let Some(rotor) = self.rotors.get(&provider) {
            rotor.clear_cooldown(key_id);
        }
    }

    fn report_rate_limited(&self, provider: Provider, key_id: &str, retry_after: Duration) {
        tracing::warn!(
            provider = %provider,
            key_id,
            cooldown_secs = retry_after.as_secs(),
            "key rate limited, entering cooldown"
        );
        if let Some(rotor) = self.rotors.get(&provider) {
            rotor.set_cooldown(key_id, Instant::now() + retry_after);
        }
    }
}

impl std::fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .rotors
            .iter()
            .map(|(p, r)| (p.as_str(), r.slots.lock().len()))
            .collect();
        f.debug_struct("KeyPool").field("keys", &counts).finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
