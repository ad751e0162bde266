//! Analytics sub-client.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{keys, CacheKey};
use crate::client::BlotterClient;
use crate::domain::analytics::{Analytics, PortfolioPerformance, TradeAnalytics};
use crate::error::SyncError;

pub struct AnalyticsClient<'a> {
    pub(crate) client: &'a BlotterClient,
}

impl<'a> AnalyticsClient<'a> {
    pub async fn analytics(&self) -> Result<Analytics, SyncError> {
        self.cached(keys::ANALYTICS, "/api/analytics").await
    }

    pub async fn trade_analytics(&self) -> Result<TradeAnalytics, SyncError> {
        self.cached(keys::TRADE_ANALYTICS, "/api/trade-analytics")
            .await
    }

    pub async fn portfolio_performance(&self) -> Result<PortfolioPerformance, SyncError> {
        self.cached(keys::PORTFOLIO_PERFORMANCE, "/api/portfolio/performance")
            .await
    }

    async fn cached<T>(&self, resource: &str, path: &str) -> Result<T, SyncError>
    where
        T: Serialize + DeserializeOwned,
    {
        let http = &self.client.http;
        self.client
            .cache
            .fetch(&CacheKey::new(resource), || async move {
                Ok::<_, SyncError>(http.get(path).await?)
            })
            .await
    }
}
