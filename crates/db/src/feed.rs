//! HTTP client for upstream module transaction feeds.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tally_core::sync::{FeedError, FeedFilter, SourceFeed, SourceRecord};
use tally_shared::config::FeedConfig;

/// Reads completed transactions from one module's service.
///
/// Calls `GET {base_url}/transactions?status=completed&since=..&until=..` and
/// accepts either a bare JSON array or an object wrapping it under
/// `transactions` or `data`.
#[derive(Debug, Clone)]
pub struct HttpSourceFeed {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedResponse {
    List(Vec<SourceRecord>),
    Wrapped {
        #[serde(alias = "data")]
        transactions: Vec<SourceRecord>,
    },
}

impl FeedResponse {
    fn into_records(self) -> Vec<SourceRecord> {
        match self {
            Self::List(records) | Self::Wrapped { transactions: records } => records,
        }
    }
}

impl HttpSourceFeed {
    /// Builds a client for the feed described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| FeedError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[inline]
    fn url(&self) -> String {
        format!("{}/transactions", self.base_url)
    }

    fn query(filter: &FeedFilter) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        params.push(("status", FeedFilter::STATUS.to_string()));
        if let Some(since) = filter.since {
            params.push(("since", since.to_string()));
        }
        if let Some(until) = filter.until {
            params.push(("until", until.to_string()));
        }
        params
    }
}

#[async_trait]
impl SourceFeed for HttpSourceFeed {
    async fn completed_transactions(
        &self,
        filter: &FeedFilter,
    ) -> Result<Vec<SourceRecord>, FeedError> {
        let url = self.url();
        let resp = self
            .client
            .get(&url)
            .query(&Self::query(filter))
            .send()
            .await
            .map_err(|e| FeedError::Transport(format!("GET {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FeedError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FeedError::Transport(format!("GET {url} body failed: {e}")))?;
        let records = serde_json::from_slice::<FeedResponse>(&body)
            .map_err(|e| FeedError::Decode(e.to_string()))?
            .into_records();

        tracing::debug!(url = %url, records = records.len(), "Fetched feed");
        Ok(records)
    }
}
