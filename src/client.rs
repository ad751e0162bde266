//! High-level client: `BlotterClient` with nested sub-client accessors.
//!
//! Each resource has its own sub-client in `domain/<name>/client.rs`.
//! This module keeps the builder, the shared session and cache, and the
//! accessor methods.

use crate::auth::client::Auth;
use crate::cache::query::QueryCache;
use crate::domain::analytics::client::AnalyticsClient as Analytics;
use crate::domain::holding::client::Holdings;
use crate::domain::price::client::Prices;
use crate::domain::signal::client::Signals;
use crate::domain::trade::client::Trades;
use crate::error::SyncError;
use crate::http::RequestClient;
use crate::realtime::RealtimeConfig;
use crate::session::storage::{FileStorage, Storage};
use crate::session::Session;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// Re-export sub-client types for convenience.
pub use crate::auth::client::Auth as AuthClient;
pub use crate::domain::analytics::client::AnalyticsClient;
pub use crate::domain::holding::client::Holdings as HoldingsClient;
pub use crate::domain::price::client::Prices as PricesClient;
pub use crate::domain::signal::client::Signals as SignalsClient;
pub use crate::domain::trade::client::Trades as TradesClient;

/// The primary entry point for the blotter sync layer.
///
/// Provides nested sub-client accessors for each resource:
/// `client.trades()`, `client.holdings()`, etc. Clones share the session
/// and cache.
#[derive(Clone)]
pub struct BlotterClient {
    pub(crate) http: RequestClient,
    pub(crate) session: Session,
    pub(crate) cache: Arc<QueryCache>,
    pub(crate) realtime_config: RealtimeConfig,
}

impl BlotterClient {
    pub fn builder() -> BlotterClientBuilder {
        BlotterClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn trades(&self) -> Trades<'_> {
        Trades { client: self }
    }

    pub fn holdings(&self) -> Holdings<'_> {
        Holdings { client: self }
    }

    pub fn analytics(&self) -> Analytics<'_> {
        Analytics { client: self }
    }

    pub fn prices(&self) -> Prices<'_> {
        Prices { client: self }
    }

    pub fn signals(&self) -> Signals<'_> {
        Signals { client: self }
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }

    // ── Shared state ─────────────────────────────────────────────────────

    pub fn http(&self) -> &RequestClient {
        &self.http
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn realtime_config(&self) -> &RealtimeConfig {
        &self.realtime_config
    }

    /// Create a realtime manager bound to this client's session and cache.
    ///
    /// The manager is not embedded in `BlotterClient` because its lifetime
    /// follows the authenticated session, not the client.
    #[cfg(feature = "ws-native")]
    pub fn realtime(&self) -> crate::realtime::native::RealtimeManager {
        crate::realtime::native::RealtimeManager::new(
            self.realtime_config.clone(),
            self.session.clone(),
            self.cache.clone(),
        )
    }
}

impl std::fmt::Debug for BlotterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlotterClient")
            .field("base_url", &self.http.base_url())
            .field("ws_url", &self.realtime_config.url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct BlotterClientBuilder {
    base_url: String,
    ws_url: Option<String>,
    storage: Option<Arc<dyn Storage>>,
    storage_path: Option<PathBuf>,
    session: Option<Session>,
    cache: Option<Arc<QueryCache>>,
    cache_max_age: Option<Duration>,
    realtime: RealtimeConfig,
}

impl Default for BlotterClientBuilder {
    fn default() -> Self {
        Self {
            base_url: crate::network::DEFAULT_API_URL.to_string(),
            ws_url: None,
            storage: None,
            storage_path: None,
            session: None,
            cache: None,
            cache_max_age: None,
            realtime: RealtimeConfig::default(),
        }
    }
}

impl BlotterClientBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Realtime endpoint. Derived from the base URL when unset.
    pub fn ws_url(mut self, url: &str) -> Self {
        self.ws_url = Some(url.to_string());
        self
    }

    /// Persist the session through `storage`.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Persist the session in a JSON file at `path`.
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Share an existing session (takes precedence over storage settings).
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Share an existing cache.
    pub fn cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Let cached values go stale after `max_age` even without invalidation.
    pub fn cache_max_age(mut self, max_age: Duration) -> Self {
        self.cache_max_age = Some(max_age);
        self
    }

    /// Realtime settings. `url` is overwritten by [`ws_url`](Self::ws_url)
    /// or the derived endpoint.
    pub fn realtime(mut self, config: RealtimeConfig) -> Self {
        self.realtime = config;
        self
    }

    pub fn build(self) -> Result<BlotterClient, SyncError> {
        let session = match (self.session, self.storage, self.storage_path) {
            (Some(session), _, _) => session,
            (None, Some(storage), _) => Session::new(storage),
            (None, None, Some(path)) => Session::new(Arc::new(FileStorage::open(path)?)),
            (None, None, None) => Session::in_memory(),
        };

        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(match self.cache_max_age {
                Some(max_age) => QueryCache::with_max_age(max_age),
                None => QueryCache::new(),
            })
        });

        let ws_url = self
            .ws_url
            .unwrap_or_else(|| crate::network::derive_ws_url(&self.base_url));

        Ok(BlotterClient {
            http: RequestClient::new(&self.base_url, session.clone())?,
            session,
            cache,
            realtime_config: RealtimeConfig {
                url: ws_url,
                ..self.realtime
            },
        })
    }
}
