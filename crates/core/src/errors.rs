//! Core error types.
//!
//! Storage-specific errors from the embedding application's stores arrive
//! in string form so this crate stays persistence-agnostic.

use thiserror::Error;

use marketwatch_market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the monitoring core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    /// A full-market refresh pull failed; the previous snapshot was kept.
    #[error("Market snapshot refresh failed")]
    RefreshFailed,

    /// An external rule/event/target store failed.
    #[error("Store operation failed: {0}")]
    Store(String),

    /// An outbound notification call failed or timed out.
    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
