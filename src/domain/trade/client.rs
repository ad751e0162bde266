//! Trades sub-client: blotter listing and trade lifecycle writes.
//!
//! Every successful write invalidates [`keys::trade_change`] before
//! returning, the same group a broadcast `trade_*` event invalidates.

use crate::cache::{keys, CacheKey, CacheStore};
use crate::client::BlotterClient;
use crate::domain::trade::wire::{CreatedTrade, RejectRequest, TradeAck, TradeCreate, TradeUpdate};
use crate::domain::trade::{Trade, TradeQuery, TradeValidationError};
use crate::error::SyncError;
use crate::http::client::with_query;
use crate::shared::{Listing, TradeId};

pub struct Trades<'a> {
    pub(crate) client: &'a BlotterClient,
}

impl<'a> Trades<'a> {
    /// Cache key a listing with `query` is stored under.
    pub fn cache_key(query: &TradeQuery) -> CacheKey {
        CacheKey::new(keys::TRADES)
            .with("status", query.status_param())
            .with_opt("ticker", query.ticker.as_deref())
            .with_opt("page", query.page)
            .with_opt("page_size", query.page_size)
    }

    /// List trades matching `query`, served from cache while fresh.
    pub async fn list(&self, query: &TradeQuery) -> Result<Listing<Trade>, SyncError> {
        let path = with_query(
            "/api/trades",
            &[
                ("status", Some(query.status_param().to_string())),
                ("ticker", query.ticker.clone()),
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

    pub async fn create(&self, trade: &TradeCreate) -> Result<CreatedTrade, SyncError> {
        trade.validate().map_err(validation)?;
        let created: CreatedTrade = self.client.http.post("/api/trades", trade).await?;
        if !created.warnings().is_empty() {
            tracing::info!(
                id = %created.trade.id,
                warnings = created.warnings().len(),
                "Trade booked with risk warnings"
            );
        }
        self.invalidate();
        Ok(created)
    }

    pub async fn update(&self, id: TradeId, update: &TradeUpdate) -> Result<Trade, SyncError> {
        update.validate().map_err(validation)?;
        let trade = self
            .client
            .http
            .put(&format!("/api/trades/{}", id), update)
            .await?;
        self.invalidate();
        Ok(trade)
    }

    pub async fn delete(&self, id: TradeId) -> Result<TradeAck, SyncError> {
        let ack = self
            .client
            .http
            .delete(&format!("/api/trades/{}", id))
            .await?;
        self.invalidate();
        Ok(ack)
    }

    /// Reject an active trade. `reason` must not be blank.
    pub async fn reject(&self, id: TradeId, reason: &str) -> Result<TradeAck, SyncError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(validation(TradeValidationError::MissingRejectionReason));
        }
        let body = RejectRequest {
            rejection_reason: reason.to_string(),
        };
        let ack = self
            .client
            .http
            .post(&format!("/api/trades/{}/reject", id), &body)
            .await?;
        self.invalidate();
        Ok(ack)
    }

    pub async fn reinstate(&self, id: TradeId) -> Result<TradeAck, SyncError> {
        let ack = self
            .client
            .http
            .post_empty(&format!("/api/trades/{}/reinstate", id))
            .await?;
        self.invalidate();
        Ok(ack)
    }

    fn invalidate(&self) {
        self.client.cache.invalidate(&keys::trade_change());
    }
}

fn validation(e: TradeValidationError) -> SyncError {
    SyncError::Validation(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::TradeStatus;

    #[test]
    fn test_cache_key_shape() {
        let key = Trades::cache_key(&TradeQuery::default());
        assert_eq!(key.to_string(), "trades{status=ALL}");

        let key = Trades::cache_key(&TradeQuery {
            status: Some(TradeStatus::Active),
            page: Some(2),
            ..TradeQuery::default()
        });
        assert_eq!(key.to_string(), "trades{page=2,status=ACTIVE}");
    }

    #[test]
    fn test_trade_change_covers_every_listing() {
        let key = Trades::cache_key(&TradeQuery::status(TradeStatus::Rejected));
        assert!(keys::trade_change().iter().any(|p| p.matches(&key)));
    }
}
