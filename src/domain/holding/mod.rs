//! Holdings domain: net positions and the summary metrics strip.

pub mod client;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Net position in one ticker, derived from active trades.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub net_quantity: Decimal,
    pub avg_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
}

impl Holding {
    pub fn is_short(&self) -> bool {
        self.net_quantity < Decimal::ZERO
    }
}

/// Dashboard summary metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    pub total_market_value: Decimal,
    pub total_unrealized_pnl: Decimal,
    pub number_of_positions: u32,
    #[serde(default)]
    pub trades_active_count: u64,
    #[serde(default)]
    pub trades_rejected_count: u64,
    #[serde(default)]
    pub trades_total_count: u64,
    #[serde(default)]
    pub top_holdings: Vec<Holding>,
    /// Sector → market value.
    #[serde(default)]
    pub sector_breakdown: BTreeMap<String, Decimal>,
}
