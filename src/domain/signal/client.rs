//! Signals sub-client.

use crate::cache::{keys, CacheKey};
use crate::client::BlotterClient;
use crate::domain::signal::{Signal, SignalQuery};
use crate::error::SyncError;
use crate::http::client::with_query;
use crate::shared::Page;

pub struct Signals<'a> {
    pub(crate) client: &'a BlotterClient,
}

impl<'a> Signals<'a> {
    pub fn cache_key(query: &SignalQuery) -> CacheKey {
        CacheKey::new(keys::SIGNALS)
            .with_opt("ticker", query.ticker.as_deref())
            .with_opt("strategy_id", query.strategy_id)
            .with_opt("start", query.start)
            .with_opt("end", query.end)
            .with_opt("page", query.page)
            .with_opt("page_size", query.page_size)
    }

    /// One page of signals, newest first.
    pub async fn list(&self, query: &SignalQuery) -> Result<Page<Signal>, SyncError> {
        let path = with_query(
            "/api/v1/signals",
            &[
                ("ticker", query.ticker.clone()),
                ("strategy_id", query.strategy_id.map(|id| id.to_string())),
                ("start", query.start.map(|d| d.format("%Y-%m-%d").to_string())),
                ("end", query.end.map(|d| d.format("%Y-%m-%d").to_string())),
                ("page", query.page.map(|p| p.to_string())),
                ("page_size", query.page_size.map(|p| p.to_string())),
            ],
        );
        let http = &self.client.http;
        self.client
            .cache
            .fetch(&Self::cache_key(query), || async move {
                Ok::<_, SyncError>(http.get(&path).await?)
            })
            .await
    }
}
