//! Resource names and the invalidation groups shared by writes and events.
//!
//! A local trade write and the broadcast `trade_*` event describing it must
//! invalidate the same keys, so both paths read the groups from here.

use super::{CacheKey, KeySet};

pub const TRADES: &str = "trades";
pub const HOLDINGS: &str = "holdings";
pub const METRICS: &str = "metrics";
pub const ANALYTICS: &str = "analytics";
pub const TRADE_ANALYTICS: &str = "trade-analytics";
pub const PORTFOLIO_PERFORMANCE: &str = "portfolio-performance";
pub const PRICE_REFRESH_STATUS: &str = "price-refresh-status";
pub const SIGNALS: &str = "signals";

fn set_of(resources: &[&str]) -> KeySet {
    resources.iter().map(|r| CacheKey::new(*r)).collect()
}

/// Keys affected by any trade lifecycle change.
pub fn trade_change() -> KeySet {
    set_of(&[TRADES, HOLDINGS, METRICS, ANALYTICS, PORTFOLIO_PERFORMANCE])
}

/// Keys affected by a completed price refresh.
pub fn prices_refreshed() -> KeySet {
    set_of(&[
        HOLDINGS,
        METRICS,
        ANALYTICS,
        PORTFOLIO_PERFORMANCE,
        PRICE_REFRESH_STATUS,
    ])
}

/// Keys affected by a newly generated signal.
pub fn signal_generated() -> KeySet {
    set_of(&[SIGNALS])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_change_group() {
        let keys: Vec<String> = trade_change().iter().map(|k| k.to_string()).collect();
        assert_eq!(
            keys,
            vec!["analytics", "holdings", "metrics", "portfolio-performance", "trades"]
        );
    }

    #[test]
    fn test_prices_refreshed_excludes_trades() {
        let keys = prices_refreshed();
        assert_eq!(keys.len(), 5);
        assert!(!keys.contains(&CacheKey::new(TRADES)));
        assert!(keys.contains(&CacheKey::new(PRICE_REFRESH_STATUS)));
    }
}
