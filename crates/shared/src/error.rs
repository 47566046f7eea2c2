//! Application-wide error types.
//!
//! Collaborators (dashboards, report pages) receive ledger, feed and
//! configuration failures as `AppError` and map them onto their own transport.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Failure categories exposed outside the ledger.
#[derive(Debug, Error)]
pub enum AppError {
    /// Transaction or account does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input: bad entries, unknown account type, unmapped source type.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the current transaction status.
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Source transaction already recorded.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Ledger storage failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An upstream module feed failed or returned garbage.
    #[error("Upstream feed error: {0}")]
    ExternalService(String),

    /// Settings could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// HTTP status collaborators should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::BusinessRule(_) => 422,
            Self::Conflict(_) => 409,
            Self::ExternalService(_) => 502,
            Self::Database(_) | Self::Config(_) => 500,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::ExternalService(_) => "UPSTREAM_FEED_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
