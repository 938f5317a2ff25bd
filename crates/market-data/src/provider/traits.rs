//! Market data provider trait definition.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::MarketDataError;
use crate::models::Quote;

use super::capabilities::{ProviderCapabilities, RateLimit};

/// Trait for market data providers.
///
/// Implement this trait to add support for a new quote vendor. Each
/// adapter owns its vendor's field-name mapping, scaling and numeric
/// sanitization, and returns the canonical [`Quote`] shape; callers never
/// see provider-specific payloads. The registry uses the declared
/// priority, capabilities and rate limit to decide when to call it.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// A constant string like "EASTMONEY" or "SINA", used for logging,
    /// rate limit tracking and the `source` field on returned quotes.
    fn id(&self) -> &'static str;

    /// Provider priority for ordering. Lower values = higher priority.
    fn priority(&self) -> u8 {
        10
    }

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Rate limiting configuration applied by the registry.
    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    /// Fetch the latest quote for a single symbol.
    ///
    /// Every field the vendor omitted or mangled arrives as zero in the
    /// returned quote; only a payload with no data at all is an error.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch the whole market in one call, keyed by symbol.
    ///
    /// Default implementation returns `NotSupported`; only full-market
    /// vendors override it.
    async fn get_market_snapshot(&self) -> Result<HashMap<String, Quote>, MarketDataError> {
        Err(MarketDataError::NotSupported {
            operation: "market_snapshot".to_string(),
            provider: self.id().to_string(),
        })
    }
}
