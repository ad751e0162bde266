//! Event router: maps server events to the cache keys they make stale.

use std::sync::Arc;

use crate::cache::{keys, CacheStore, KeySet};
use crate::realtime::{EventKind, ServerEvent};

/// Cache keys invalidated by an event type. Empty for unrecognized types.
pub fn invalidation_keys(kind: &EventKind) -> KeySet {
    match kind {
        kind if kind.is_trade_lifecycle() => keys::trade_change(),
        EventKind::PricesRefreshed => keys::prices_refreshed(),
        EventKind::SignalGenerated => keys::signal_generated(),
        _ => KeySet::new(),
    }
}

/// Applies server events to a cache.
#[derive(Clone)]
pub struct EventRouter {
    cache: Arc<dyn CacheStore>,
}

impl EventRouter {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Invalidate the keys for `event`. Returns the keys that were invalidated.
    pub fn route(&self, event: &ServerEvent) -> KeySet {
        let keys = invalidation_keys(&event.kind);
        if keys.is_empty() {
            tracing::debug!("Ignoring realtime event of unknown type {}", event.kind);
            return keys;
        }
        self.cache.invalidate(&keys);
        keys
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter").finish_non_exhaustive()
    }
}
