//! Prices sub-client: start and follow the background price refresh.

use std::time::Duration;

use crate::cache::{keys, CacheKey, CacheStore};
use crate::client::BlotterClient;
use crate::domain::price::{RefreshStart, RefreshStatus};
use crate::error::{HttpError, SyncError};

pub struct Prices<'a> {
    pub(crate) client: &'a BlotterClient,
}

impl<'a> Prices<'a> {
    /// Ask the server to refresh all prices. Admin only.
    ///
    /// A refresh that is already running is not an error.
    pub async fn start_refresh(&self) -> Result<RefreshStart, SyncError> {
        let result: Result<serde_json::Value, HttpError> =
            self.client.http.post_empty("/api/prices/refresh").await;

        let start = match result {
            Ok(_) => RefreshStart::Started,
            Err(HttpError::Application { status: 409, detail }) => {
                tracing::debug!("Price refresh not started: {}", detail);
                RefreshStart::AlreadyRunning
            }
            Err(e) => return Err(e.into()),
        };

        self.client
            .cache
            .invalidate(&[CacheKey::new(keys::PRICE_REFRESH_STATUS)].into());
        Ok(start)
    }

    pub async fn refresh_status(&self) -> Result<RefreshStatus, SyncError> {
        let http = &self.client.http;
        self.client
            .cache
            .fetch(&CacheKey::new(keys::PRICE_REFRESH_STATUS), || async move {
                Ok::<_, SyncError>(http.get("/api/prices/refresh/status").await?)
            })
            .await
    }

    /// Poll the refresh status every `interval` until the job stops running.
    ///
    /// Invalidates the price-dependent keys once it has, for sessions that are
    /// not receiving the `prices_refreshed` broadcast. The set is the one a
    /// `prices_refreshed` event invalidates, not the whole cache: trades and
    /// signals do not depend on prices.
    pub async fn wait_for_refresh(&self, interval: Duration) -> Result<RefreshStatus, SyncError> {
        loop {
            let status: RefreshStatus = self
                .client
                .http
                .get("/api/prices/refresh/status")
                .await?;
            self.client
                .cache
                .set(CacheKey::new(keys::PRICE_REFRESH_STATUS), &status)?;

            if !status.running {
                self.client.cache.invalidate(&keys::prices_refreshed());
                return Ok(status);
            }
            futures_timer::Delay::new(interval).await;
        }
    }
}
