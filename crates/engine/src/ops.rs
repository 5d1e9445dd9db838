//! Cancellation tokens and the streaming-operation registry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CancelToken
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A shared cancellation flag checked between stream chunks.
///
/// Clones share the same flag; once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OperationRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tracks the live streaming operation per target message.
///
/// At most one live operation exists per message id: registering over an
/// existing entry cancels the old token before replacing it, so a rapid
/// regenerate request cannot leave two streams writing the same message.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    active: Mutex<HashMap<Uuid, CancelToken>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new operation for `message_id`, returning its token.
    pub fn register(&self, message_id: Uuid) -> CancelToken {
        let token = CancelToken::new();
        let mut active = self.active.lock();
        if let Some(previous) = active.insert(message_id, token.clone()) {
            tracing::debug!(%message_id, "cancelling superseded stream operation");
            previous.cancel();
        }
        token
    }

    /// Cancel the live operation for `message_id`, if any.
    pub fn cancel(&self, message_id: Uuid) -> bool {
        match self.active.lock().get(&message_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the entry once the operation has fully wound down.
    pub fn finish(&self, message_id: Uuid) {
        self.active.lock().remove(&message_id);
    }

    pub fn is_active(&self, message_id: Uuid) -> bool {
        self.active.lock().contains_key(&message_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn register_replaces_and_cancels_previous() {
        let registry = OperationRegistry::new();
        let id = Uuid::new_v4();

        let first = registry.register(id);
        assert!(registry.is_active(id));
        let second = registry.register(id);

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn cancel_reports_whether_anything_was_live() {
        let registry = OperationRegistry::new();
        let id = Uuid::new_v4();
        assert!(!registry.cancel(id));

        let token = registry.register(id);
        assert!(registry.cancel(id));
        assert!(token.is_cancelled());
    }

    #[test]
    fn finish_removes_the_entry() {
        let registry = OperationRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id);
        registry.finish(id);
        assert!(!registry.is_active(id));
        assert!(!registry.cancel(id));
    }
}
