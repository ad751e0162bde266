//! Analytics domain: portfolio analytics, trade statistics, performance.
//!
//! The analytics payloads carry many reference-data columns that the sync
//! layer passes through untouched; only the fields the dashboard keys on are
//! typed, the rest are kept in `extra`.

pub mod client;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One position row of `GET /api/analytics`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsPosition {
    pub ticker: String,
    pub net_quantity: Decimal,
    pub market_value: Decimal,
    pub pnl: Decimal,
    #[serde(default)]
    pub pnl_pct: Option<Decimal>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analytics {
    pub positions: Vec<AnalyticsPosition>,
    /// Portfolio-level summary (beta, concentration, sector allocation).
    pub portfolio: Value,
}

/// `GET /api/trade-analytics`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeAnalytics {
    pub total_trades: u64,
    pub buy_trades: u64,
    pub sell_trades: u64,
    #[serde(default)]
    pub win_rate_pct: Option<Decimal>,
    #[serde(default)]
    pub most_traded_ticker: Option<String>,
    #[serde(default)]
    pub trades_by_ticker: BTreeMap<String, u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionPerformance {
    pub ticker: String,
    pub net_quantity: Decimal,
    pub avg_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub pnl: Decimal,
    #[serde(default)]
    pub pnl_pct: Option<Decimal>,
}

/// `GET /api/portfolio/performance`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioPerformance {
    pub total_market_value: Decimal,
    pub total_cost_basis: Decimal,
    pub total_pnl: Decimal,
    /// `None` when the cost basis is zero.
    #[serde(default)]
    pub total_pnl_pct: Option<Decimal>,
    #[serde(default)]
    pub breakdown: Vec<PositionPerformance>,
}
