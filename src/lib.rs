//! # Blotter Sync
//!
//! Realtime synchronization layer for the trade blotter back office: an
//! authenticated request client, a reconnecting live event channel, and the
//! routing of server events to cache invalidations.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: Shared newtypes, error taxonomy, URL helpers
//! 2. **Session**: Persisted credential and profile, session events
//! 3. **HTTP API**: `RequestClient` with per-call retry policies
//! 4. **Cache**: `CacheStore` capability, `QueryCache` read-through cache
//! 5. **Realtime**: Event routing, pure connection state machine, `tokio-tungstenite` transport
//! 6. **High-Level Client**: `BlotterClient` with nested sub-clients
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blotter_sync::prelude::*;
//!
//! let client = BlotterClient::builder()
//!     .base_url("https://blotter.example.com")
//!     .storage_path("session.json")
//!     .build()?;
//!
//! client.auth().login("jdoe", "secret").await?;
//! let mut live = client.realtime();
//! live.start();
//!
//! let active = client.trades().list(&TradeQuery::status(TradeStatus::Active)).await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes and envelopes used across all domains.
pub mod shared;

/// Unified error types.
pub mod error;

/// Network URL constants and realtime endpoint construction.
pub mod network;

// ── Layer 2: Session ─────────────────────────────────────────────────────────

/// User profile and auth wire types; the auth sub-client.
pub mod auth;

/// Persisted credential and profile.
pub mod session;

// ── Layer 3: HTTP API ────────────────────────────────────────────────────────

/// HTTP client with retry policies.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 4: Cache ───────────────────────────────────────────────────────────

/// Cache keys, the invalidation capability, and the in-memory query cache.
pub mod cache;

// ── Layer 5: Realtime ────────────────────────────────────────────────────────

/// Realtime channel: server events, routing, connection lifecycle.
pub mod realtime;

// ── Layer 6: High-Level Client ───────────────────────────────────────────────

/// Resource modules: typed payloads and sub-clients.
#[cfg(feature = "http")]
pub mod domain;

/// `BlotterClient`: the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{Listing, Page, Side, TradeId};

    // Errors
    pub use crate::error::{HttpError, RealtimeError, StorageError, SyncError};

    // Network
    pub use crate::network::{derive_ws_url, DEFAULT_API_URL};

    // Auth + session
    pub use crate::auth::{RegisterRequest, Role, User};
    pub use crate::session::storage::{FileStorage, MemoryStorage, Storage};
    pub use crate::session::{Session, SessionEvent};

    // Cache
    pub use crate::cache::query::{Freshness, Invalidation, QueryCache};
    pub use crate::cache::{keys, CacheKey, CacheStore, KeySet};

    // Realtime
    pub use crate::realtime::machine::{BackoffPolicy, ConnectionState};
    pub use crate::realtime::router::EventRouter;
    pub use crate::realtime::{
        EventKind, PricesRefreshed, RealtimeConfig, RealtimeEvent, ServerEvent, SignalGenerated,
        TradeChanged,
    };
    #[cfg(feature = "ws-native")]
    pub use crate::realtime::native::RealtimeManager;

    // Domain types
    #[cfg(feature = "http")]
    pub use crate::domain::{
        analytics::{Analytics, PortfolioPerformance, PositionPerformance, TradeAnalytics},
        holding::{Holding, Metrics},
        price::{RefreshStart, RefreshStatus},
        signal::{Signal, SignalQuery},
        trade::wire::{CreatedTrade, TradeAck, TradeCreate, TradeUpdate},
        trade::{Trade, TradeQuery, TradeStatus},
    };

    // HTTP client + sub-clients
    #[cfg(feature = "http")]
    pub use crate::client::{
        AnalyticsClient, AuthClient, BlotterClient, BlotterClientBuilder, HoldingsClient,
        PricesClient, SignalsClient, TradesClient,
    };
    #[cfg(feature = "http")]
    pub use crate::http::{RequestClient, RequestOptions, RetryConfig, RetryPolicy};
}
