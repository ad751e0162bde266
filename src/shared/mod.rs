//! Shared newtypes and envelopes used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize identically
//! to the raw format the backend sends, so they can be used directly in wire types
//! without conversion overhead.

pub mod serde_util;

use serde::{Deserialize, Serialize};

// ─── TradeId ─────────────────────────────────────────────────────────────────

/// Newtype for trade identifiers (backend integer primary keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub i64);

impl TradeId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TradeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ─── Side ────────────────────────────────────────────────────────────────────

/// Trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// Paginated envelope returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// A list endpoint response: either a paginated envelope or a bare array.
///
/// Older routes return bare arrays; versioned routes wrap them in [`Page`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Page(Page<T>),
    Items(Vec<T>),
}

impl<T> Listing<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Listing::Page(page) => &page.items,
            Listing::Items(items) => items,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Page(page) => page.items,
            Listing::Items(items) => items,
        }
    }

    /// Total matching rows on the server (the array length for bare arrays).
    pub fn total(&self) -> u64 {
        match self {
            Listing::Page(page) => page.total,
            Listing::Items(items) => items.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_accepts_page_envelope() {
        let json = r#"{"items":[1,2],"total":7,"page":1,"page_size":2,"total_pages":4}"#;
        let listing: Listing<u32> = serde_json::from_str(json).unwrap();
        assert!(matches!(listing, Listing::Page(ref p) if p.has_next()));
        assert_eq!(listing.total(), 7);
        assert_eq!(listing.into_items(), vec![1, 2]);
    }

    #[test]
    fn test_listing_accepts_bare_array() {
        let listing: Listing<u32> = serde_json::from_str("[3,4,5]").unwrap();
        assert_eq!(listing.items(), &[3, 4, 5]);
        assert_eq!(listing.total(), 3);
    }

    #[test]
    fn test_side_wire_format() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        let side: Side = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(side, Side::Sell);
    }
}
