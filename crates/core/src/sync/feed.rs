//! Upstream feed seam.

use async_trait::async_trait;
use tally_shared::AppError;
use thiserror::Error;

use super::types::{FeedFilter, SourceRecord};

/// Failure to read from an upstream module. Always aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Request could not be sent or timed out.
    #[error("Feed transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status.
    #[error("Feed returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Response body was not the expected shape.
    #[error("Feed response could not be decoded: {0}")]
    Decode(String),
}

impl FeedError {
    /// Machine-readable code for sync log details.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "FEED_TRANSPORT_ERROR",
            Self::Status { .. } => "FEED_STATUS_ERROR",
            Self::Decode(_) => "FEED_DECODE_ERROR",
        }
    }
}

impl From<FeedError> for AppError {
    fn from(err: FeedError) -> Self {
        Self::ExternalService(err.to_string())
    }
}

/// Read-only source of completed upstream transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceFeed: Send + Sync {
    /// Completed records inside the filter window, in upstream order.
    async fn completed_transactions(
        &self,
        filter: &FeedFilter,
    ) -> Result<Vec<SourceRecord>, FeedError>;
}

/// A feed over a fixed record set, for replays and backfills from exports.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    records: Vec<SourceRecord>,
}

impl StaticFeed {
    /// Wraps a record set.
    #[must_use]
    pub const fn new(records: Vec<SourceRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl SourceFeed for StaticFeed {
    async fn completed_transactions(
        &self,
        filter: &FeedFilter,
    ) -> Result<Vec<SourceRecord>, FeedError> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.since.is_none_or(|since| r.date >= since))
            .filter(|r| filter.until.is_none_or(|until| r.date <= until))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_errors_surface_as_upstream_failures() {
        let app: AppError = FeedError::Status {
            status: 503,
            message: "maintenance".to_string(),
        }
        .into();
        assert_eq!(app.status_code(), 502);
        assert_eq!(app.error_code(), "UPSTREAM_FEED_ERROR");
        assert!(app.to_string().contains("HTTP 503"));

        let app: AppError = FeedError::Decode("expected array".to_string()).into();
        assert!(matches!(app, AppError::ExternalService(_)));
    }
}
