//! Realtime layer: server events, event → cache routing, the connection
//! lifecycle state machine, and the native transport.
//!
//! The transport is compile-time gated:
//! - `ws-native` feature → `tokio-tungstenite` (native.rs)
//!
//! Everything else here is transport-independent and always available.

pub mod machine;
pub mod router;

#[cfg(feature = "ws-native")]
pub mod native;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RealtimeError;
use crate::shared::TradeId;

pub use machine::{Action, BackoffPolicy, ConnectionState, Lifecycle, StopReason, Transition};
pub use router::EventRouter;

// ─── Inbound events ──────────────────────────────────────────────────────────

/// A server-push notification: `{ "type": string, "data": any }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub data: Value,
}

impl ServerEvent {
    /// Decode a text frame. Anything that is not a `{type, data}` object is a
    /// [`RealtimeError::Decode`].
    pub fn parse(text: &str) -> Result<Self, RealtimeError> {
        serde_json::from_str(text).map_err(|e| RealtimeError::Decode(e.to_string()))
    }

    /// Decode the payload as a typed struct.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Event type tag. Unrecognized tags are preserved in [`EventKind::Unknown`]
/// so that protocol additions never fail decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    TradeCreated,
    TradeUpdated,
    TradeDeleted,
    TradeRejected,
    TradeReinstated,
    PricesRefreshed,
    SignalGenerated,
    Unknown(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::TradeCreated => "trade_created",
            EventKind::TradeUpdated => "trade_updated",
            EventKind::TradeDeleted => "trade_deleted",
            EventKind::TradeRejected => "trade_rejected",
            EventKind::TradeReinstated => "trade_reinstated",
            EventKind::PricesRefreshed => "prices_refreshed",
            EventKind::SignalGenerated => "signal_generated",
            EventKind::Unknown(s) => s,
        }
    }

    pub fn is_trade_lifecycle(&self) -> bool {
        matches!(
            self,
            EventKind::TradeCreated
                | EventKind::TradeUpdated
                | EventKind::TradeDeleted
                | EventKind::TradeRejected
                | EventKind::TradeReinstated
        )
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "trade_created" => EventKind::TradeCreated,
            "trade_updated" => EventKind::TradeUpdated,
            "trade_deleted" => EventKind::TradeDeleted,
            "trade_rejected" => EventKind::TradeRejected,
            "trade_reinstated" => EventKind::TradeReinstated,
            "prices_refreshed" => EventKind::PricesRefreshed,
            "signal_generated" => EventKind::SignalGenerated,
            _ => EventKind::Unknown(s),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Typed payloads ──────────────────────────────────────────────────────────

/// Payload of `trade_*` events. Only `id` is always present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeChanged {
    pub id: TradeId,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub side: Option<crate::shared::Side>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Payload of `prices_refreshed`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PricesRefreshed {
    pub updated_count: u32,
    pub failed_count: u32,
    #[serde(default)]
    pub updated_tickers: Vec<String>,
}

/// Payload of `signal_generated`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignalGenerated {
    pub ticker: String,
    pub signal_type: String,
    pub strategy_id: i64,
    pub signal_strength: f64,
}

// ─── Consumer-facing events ──────────────────────────────────────────────────

/// Events emitted by the realtime manager to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// Handshake completed.
    Connected,
    /// A connection attempt failed ([`RealtimeError::ConnectionFailed`]) or
    /// the live connection was lost ([`RealtimeError::Closed`]).
    Disconnected(RealtimeError),
    /// A decoded server event, already routed to the cache.
    Server(ServerEvent),
    /// A reconnect is scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnect attempts are exhausted; live updates are unavailable until
    /// the manager is started again.
    GaveUp { attempts: u32 },
}

/// Configuration for the realtime manager.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Realtime endpoint without the token, e.g. `wss://host/ws`.
    pub url: String,
    pub backoff: BackoffPolicy,
    pub connect_timeout: Duration,
    /// Capacity of the consumer event channel. Events beyond it are dropped.
    pub event_channel_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: crate::network::derive_ws_url(crate::network::DEFAULT_API_URL),
            backoff: BackoffPolicy::default(),
            connect_timeout: Duration::from_secs(30),
            event_channel_capacity: 256,
        }
    }
}
