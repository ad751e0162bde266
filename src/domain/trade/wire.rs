//! Request and acknowledgement bodies for trade writes.

use super::{Trade, TradeStatus, TradeValidationError};
use crate::shared::{Side, TradeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/trades`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeCreate {
    pub ticker: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub trader_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TradeCreate {
    pub fn validate(&self) -> Result<(), TradeValidationError> {
        if self.ticker.trim().is_empty() {
            return Err(TradeValidationError::MissingTicker);
        }
        if self.trader_name.trim().is_empty() {
            return Err(TradeValidationError::MissingTraderName);
        }
        if self.quantity <= Decimal::ZERO {
            return Err(TradeValidationError::NonPositiveQuantity);
        }
        if self.price <= Decimal::ZERO {
            return Err(TradeValidationError::NonPositivePrice);
        }
        Ok(())
    }
}

/// Body of `PUT /api/trades/{id}`. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TradeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trader_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TradeUpdate {
    pub fn validate(&self) -> Result<(), TradeValidationError> {
        if matches!(&self.ticker, Some(t) if t.trim().is_empty()) {
            return Err(TradeValidationError::MissingTicker);
        }
        if matches!(&self.trader_name, Some(t) if t.trim().is_empty()) {
            return Err(TradeValidationError::MissingTraderName);
        }
        if matches!(self.quantity, Some(q) if q <= Decimal::ZERO) {
            return Err(TradeValidationError::NonPositiveQuantity);
        }
        if matches!(self.price, Some(p) if p <= Decimal::ZERO) {
            return Err(TradeValidationError::NonPositivePrice);
        }
        Ok(())
    }
}

/// Body of `POST /api/trades/{id}/reject`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectRequest {
    pub rejection_reason: String,
}

/// A compliance warning attached to a newly booked trade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskWarning {
    pub message: String,
}

/// Response of `POST /api/trades`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedTrade {
    #[serde(flatten)]
    pub trade: Trade,
    #[serde(default)]
    pub risk_warnings: Option<Vec<RiskWarning>>,
}

impl CreatedTrade {
    pub fn warnings(&self) -> &[RiskWarning] {
        self.risk_warnings.as_deref().unwrap_or_default()
    }
}

/// Response of delete, reject and reinstate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeAck {
    pub detail: String,
    #[serde(default)]
    pub id: Option<TradeId>,
    #[serde(default)]
    pub status: Option<TradeStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create() -> TradeCreate {
        TradeCreate {
            ticker: "MSFT".into(),
            side: Side::Sell,
            quantity: dec("10"),
            price: dec("410.5"),
            trader_name: "jdoe".into(),
            strategy: None,
            notes: None,
        }
    }

    #[test]
    fn test_create_omits_unset_optionals() {
        let json = serde_json::to_value(create()).unwrap();
        assert_eq!(json["side"], "SELL");
        assert!(json.get("strategy").is_none());
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn test_create_validation() {
        assert!(create().validate().is_ok());
        let mut bad = create();
        bad.ticker = "  ".into();
        assert_eq!(bad.validate(), Err(TradeValidationError::MissingTicker));
        let mut bad = create();
        bad.quantity = Decimal::ZERO;
        assert_eq!(bad.validate(), Err(TradeValidationError::NonPositiveQuantity));
        let mut bad = create();
        bad.price = dec("-1");
        assert_eq!(bad.validate(), Err(TradeValidationError::NonPositivePrice));
    }

    #[test]
    fn test_update_serializes_only_changes() {
        let update = TradeUpdate {
            notes: Some("amended".into()),
            ..TradeUpdate::default()
        };
        assert!(update.validate().is_ok());
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"notes":"amended"}"#
        );
    }

    #[test]
    fn test_created_trade_with_warnings() {
        let json = r#"{
            "id": 7, "ticker": "TSLA", "side": "BUY", "quantity": 5, "price": 200,
            "trader_name": "amy", "status": "ACTIVE",
            "created_at": "2024-05-01T10:00:00", "updated_at": "2024-05-01T10:00:00",
            "risk_warnings": [{"message": "Position exceeds 10% of portfolio"}]
        }"#;
        let created: CreatedTrade = serde_json::from_str(json).unwrap();
        assert_eq!(created.trade.id, TradeId(7));
        assert_eq!(created.warnings().len(), 1);
    }

    #[test]
    fn test_ack_shapes() {
        let deleted: TradeAck = serde_json::from_str(r#"{"detail":"Trade deleted"}"#).unwrap();
        assert!(deleted.id.is_none());
        let rejected: TradeAck =
            serde_json::from_str(r#"{"detail":"Trade rejected","id":3,"status":"REJECTED"}"#)
                .unwrap();
        assert_eq!(rejected.status, Some(TradeStatus::Rejected));
    }
}
