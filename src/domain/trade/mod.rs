//! Trade domain: blotter trade records and their lifecycle.

pub mod client;
pub mod wire;

use crate::shared::serde_util::{timestamp, timestamp_opt};
use crate::shared::{Side, TradeId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Active,
    Rejected,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Active => "ACTIVE",
            TradeStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booked trade as the blotter shows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub id: TradeId,
    pub ticker: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub trader_name: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: TradeStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default, deserialize_with = "timestamp_opt::deserialize")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    pub fn is_active(&self) -> bool {
        self.status == TradeStatus::Active
    }

    /// Gross notional (`quantity × price`).
    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}

/// Filters for the trade list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeQuery {
    /// `None` lists every status.
    pub status: Option<TradeStatus>,
    pub ticker: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl TradeQuery {
    pub fn status(status: TradeStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Value of the `status` query parameter.
    pub fn status_param(&self) -> &'static str {
        self.status.map(|s| s.as_str()).unwrap_or("ALL")
    }
}

/// Client-side checks run before a trade write is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeValidationError {
    MissingTicker,
    MissingTraderName,
    NonPositiveQuantity,
    NonPositivePrice,
    MissingRejectionReason,
}

impl fmt::Display for TradeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeValidationError::MissingTicker => write!(f, "Ticker is required"),
            TradeValidationError::MissingTraderName => write!(f, "Trader name is required"),
            TradeValidationError::NonPositiveQuantity => {
                write!(f, "Quantity must be greater than zero")
            }
            TradeValidationError::NonPositivePrice => write!(f, "Price must be greater than zero"),
            TradeValidationError::MissingRejectionReason => {
                write!(f, "A rejection reason is required")
            }
        }
    }
}

impl std::error::Error for TradeValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const ROW: &str = r#"{
        "id": 42,
        "ticker": "AAPL",
        "side": "BUY",
        "quantity": 100.0,
        "price": 187.25,
        "trader_name": "jdoe",
        "strategy": null,
        "notes": "opening",
        "status": "ACTIVE",
        "rejection_reason": null,
        "rejected_at": null,
        "created_at": "2024-05-01T14:03:22.120000",
        "updated_at": "2024-05-01T14:03:22.120000Z"
    }"#;

    #[test]
    fn test_trade_from_backend_row() {
        let trade: Trade = serde_json::from_str(ROW).unwrap();
        assert_eq!(trade.id, TradeId(42));
        assert_eq!(trade.side, Side::Buy);
        assert_eq!(trade.price, Decimal::from_str("187.25").unwrap());
        assert!(trade.is_active());
        assert!(trade.rejected_at.is_none());
        assert_eq!(trade.created_at, trade.updated_at);
        assert_eq!(trade.notional(), Decimal::from_str("18725").unwrap());
    }

    #[test]
    fn test_trade_survives_cache_round_trip() {
        let trade: Trade = serde_json::from_str(ROW).unwrap();
        let cached = serde_json::to_value(&trade).unwrap();
        let back: Trade = serde_json::from_value(cached).unwrap();
        assert_eq!(back, trade);
    }

    #[test]
    fn test_rejected_trade() {
        let row = ROW
            .replace(r#""status": "ACTIVE""#, r#""status": "REJECTED""#)
            .replace(
                r#""rejected_at": null"#,
                r#""rejected_at": "2024-05-02T09:00:00""#,
            );
        let trade: Trade = serde_json::from_str(&row).unwrap();
        assert_eq!(trade.status, TradeStatus::Rejected);
        assert!(trade.rejected_at.is_some());
    }

    #[test]
    fn test_status_param() {
        assert_eq!(TradeQuery::default().status_param(), "ALL");
        assert_eq!(TradeQuery::status(TradeStatus::Rejected).status_param(), "REJECTED");
    }
}
