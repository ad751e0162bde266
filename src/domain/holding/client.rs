//! Holdings sub-client.

use crate::cache::{keys, CacheKey};
use crate::client::BlotterClient;
use crate::domain::holding::{Holding, Metrics};
use crate::error::SyncError;

pub struct Holdings<'a> {
    pub(crate) client: &'a BlotterClient,
}

impl<'a> Holdings<'a> {
    pub async fn list(&self) -> Result<Vec<Holding>, SyncError> {
        let http = &self.client.http;
        self.client
            .cache
            .fetch(&CacheKey::new(keys::HOLDINGS), || async move {
                Ok::<_, SyncError>(http.get("/api/holdings").await?)
            })
            .await
    }

    pub async fn metrics(&self) -> Result<Metrics, SyncError> {
        let http = &self.client.http;
        self.client
            .cache
            .fetch(&CacheKey::new(keys::METRICS), || async move {
                Ok::<_, SyncError>(http.get("/api/metrics").await?)
            })
            .await
    }
}
