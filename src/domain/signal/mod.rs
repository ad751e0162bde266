//! Signals domain: strategy signals emitted by the signal engine.

pub mod client;

use crate::shared::serde_util::timestamp;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub id: i64,
    pub strategy_id: i64,
    pub ticker: String,
    /// `BUY`, `SELL` or `HOLD`; kept open for new strategies.
    pub signal_type: String,
    pub signal_strength: f64,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub metadata_json: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// `metadata_json` decoded, when present and valid.
    pub fn metadata(&self) -> Option<serde_json::Value> {
        serde_json::from_str(self.metadata_json.as_deref()?).ok()
    }
}

/// Filters for the signal list. Dates are inclusive calendar days.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalQuery {
    pub ticker: Option<String>,
    pub strategy_id: Option<i64>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}
