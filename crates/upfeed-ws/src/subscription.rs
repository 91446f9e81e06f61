//! Subscription registry.
//!
//! The deduplicated key set plus the active feed mode. This registry is the
//! single source of truth used to rebuild subscriptions after every
//! reconnect, so mutations happen synchronously with the outbound control
//! frames rather than waiting for any server acknowledgment (the protocol
//! has none).

use parking_lot::RwLock;
use std::collections::HashSet;
use upfeed_core::{FeedMode, InstrumentKey};

/// Point-in-time copy of the registry, taken at resubscription time.
#[derive(Debug, Clone)]
pub struct SubscriptionSnapshot {
    pub keys: Vec<InstrumentKey>,
    pub mode: FeedMode,
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    keys: RwLock<HashSet<InstrumentKey>>,
    mode: RwLock<FeedMode>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add keys and set the active mode. Re-adding an existing key leaves
    /// the set unchanged.
    pub fn add(&self, keys: &[InstrumentKey], mode: FeedMode) {
        let mut set = self.keys.write();
        for key in keys {
            set.insert(key.clone());
        }
        *self.mode.write() = mode;
    }

    /// Remove keys, ignoring any not present.
    pub fn remove(&self, keys: &[InstrumentKey]) {
        let mut set = self.keys.write();
        for key in keys {
            set.remove(key);
        }
    }

    pub fn set_mode(&self, mode: FeedMode) {
        *self.mode.write() = mode;
    }

    pub fn mode(&self) -> FeedMode {
        *self.mode.read()
    }

    pub fn contains(&self, key: &InstrumentKey) -> bool {
        self.keys.read().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    pub fn clear(&self) {
        self.keys.write().clear();
    }

    pub fn snapshot(&self) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            keys: self.keys.read().iter().cloned().collect(),
            mode: self.mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &[&str]) -> Vec<InstrumentKey> {
        raw.iter().map(|k| InstrumentKey::from(*k)).collect()
    }

    #[test]
    fn test_add_deduplicates() {
        let registry = SubscriptionRegistry::new();
        registry.add(&keys(&["A", "B"]), FeedMode::Ltpc);
        registry.add(&keys(&["B", "C"]), FeedMode::Ltpc);

        assert_eq!(registry.len(), 3);
        assert!(registry.contains(&InstrumentKey::from("B")));
    }

    #[test]
    fn test_remove_ignores_missing_keys() {
        let registry = SubscriptionRegistry::new();
        registry.add(&keys(&["A", "B"]), FeedMode::Ltpc);
        registry.remove(&keys(&["B", "Z"]));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&InstrumentKey::from("A")));
        assert!(!registry.contains(&InstrumentKey::from("B")));
    }

    #[test]
    fn test_set_algebra_is_order_independent() {
        // Commutative operations must converge to the same final set.
        let left = SubscriptionRegistry::new();
        left.add(&keys(&["A"]), FeedMode::Ltpc);
        left.add(&keys(&["B"]), FeedMode::Ltpc);
        left.remove(&keys(&["C"]));

        let right = SubscriptionRegistry::new();
        right.remove(&keys(&["C"]));
        right.add(&keys(&["B"]), FeedMode::Ltpc);
        right.add(&keys(&["A"]), FeedMode::Ltpc);

        let mut l = left.snapshot().keys;
        let mut r = right.snapshot().keys;
        l.sort();
        r.sort();
        assert_eq!(l, r);
    }

    #[test]
    fn test_mode_upgrade_on_resubscribe() {
        let registry = SubscriptionRegistry::new();
        registry.add(&keys(&["A"]), FeedMode::Ltpc);
        registry.add(&keys(&["A"]), FeedMode::Full);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.mode(), FeedMode::Full);
    }

    #[test]
    fn test_clear() {
        let registry = SubscriptionRegistry::new();
        registry.add(&keys(&["A", "B"]), FeedMode::Ltpc);
        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.snapshot().keys.is_empty());
    }
}
