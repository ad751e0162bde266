//! Client read-model cache: keys, the invalidation capability, and an
//! in-memory read-through implementation.
//!
//! Writes and realtime events never touch cached values directly; they mark
//! keys stale through [`CacheStore::invalidate`] and the next read refetches.

pub mod keys;
pub mod query;

use std::collections::{BTreeMap, BTreeSet};

pub use query::{Freshness, Invalidation, QueryCache};

/// A set of cache keys. Ordered so logs and tests are deterministic.
pub type KeySet = BTreeSet<CacheKey>;

// ─── CacheKey ────────────────────────────────────────────────────────────────

/// Logical identifier for a unit of cached server state: a resource name plus
/// optional parameters, e.g. `trades{status=ACTIVE}`.
///
/// Parameter insertion order is irrelevant to equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    resource: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Add a parameter only when present.
    pub fn with_opt<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Whether this key, used as an invalidation pattern, covers `other`.
    ///
    /// A pattern covers every key of the same resource whose parameters include
    /// all of the pattern's parameters, so `trades` covers `trades{status=ACTIVE}`.
    pub fn matches(&self, other: &CacheKey) -> bool {
        self.resource == other.resource
            && self
                .params
                .iter()
                .all(|(k, v)| other.params.get(k) == Some(v))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.resource)?;
        if !self.params.is_empty() {
            f.write_str("{")?;
            for (i, (k, v)) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

impl From<&str> for CacheKey {
    fn from(resource: &str) -> Self {
        Self::new(resource)
    }
}

// ─── CacheStore ──────────────────────────────────────────────────────────────

/// The one capability the sync layer needs from a cache.
///
/// `invalidate` marks every entry covered by any of `keys` stale and notifies
/// whoever displays them, so the next read refetches. It must be idempotent:
/// invalidating a key twice leaves the same state as invalidating it once.
pub trait CacheStore: Send + Sync {
    fn invalidate(&self, keys: &KeySet);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_order_irrelevant() {
        let a = CacheKey::new("trades").with("status", "ACTIVE").with("page", 2);
        let b = CacheKey::new("trades").with("page", 2).with("status", "ACTIVE");
        assert_eq!(a, b);
    }

    #[test]
    fn test_bare_key_matches_parameterized() {
        let pattern = CacheKey::new("trades");
        let key = CacheKey::new("trades").with("status", "ACTIVE");
        assert!(pattern.matches(&key));
        assert!(!key.matches(&pattern));
        assert!(!pattern.matches(&CacheKey::new("holdings")));
    }

    #[test]
    fn test_partial_params_match() {
        let pattern = CacheKey::new("signals").with("ticker", "AAPL");
        let hit = CacheKey::new("signals").with("ticker", "AAPL").with("page", 1);
        let miss = CacheKey::new("signals").with("ticker", "MSFT").with("page", 1);
        assert!(pattern.matches(&hit));
        assert!(!pattern.matches(&miss));
    }

    #[test]
    fn test_display() {
        let key = CacheKey::new("trades").with("status", "ALL").with("page", 1);
        assert_eq!(key.to_string(), "trades{page=1,status=ALL}");
        assert_eq!(CacheKey::new("metrics").to_string(), "metrics");
    }

    #[test]
    fn test_with_opt_skips_none() {
        let key = CacheKey::new("signals").with_opt("ticker", None::<&str>);
        assert!(key.params().is_empty());
    }
}
