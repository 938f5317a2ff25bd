//! Provider registry orchestrating ordered fallback across adapters.
//!
//! The registry owns the adapter list and walks it in priority order. A
//! failed call (error or empty payload) is logged and swallowed; the next
//! adapter is tried. Only exhausting every adapter surfaces an error to
//! the caller.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};

use super::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::MarketDataProvider;

/// Registry of quote providers with ordered fallback.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    rate_limiter: RateLimiter,
}

impl ProviderRegistry {
    /// Create a registry from a set of adapters.
    ///
    /// Adapters are ordered by their declared priority (lower first) and
    /// the rate limiter is seeded from each adapter's declared limits.
    pub fn new(mut providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        providers.sort_by_key(|p| p.priority());

        let rate_limiter = RateLimiter::new();
        for provider in &providers {
            let limit = provider.rate_limit();
            rate_limiter.configure(
                provider.id(),
                RateLimitConfig {
                    requests_per_minute: limit.requests_per_minute,
                    burst_capacity: limit.burst_capacity,
                },
            );
        }

        Self {
            providers,
            rate_limiter,
        }
    }

    /// The registered providers, in fallback order.
    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    /// Fetch the latest quote for a symbol, falling through providers in
    /// priority order.
    ///
    /// Each attempt acquires a rate-limit token first so a hammering
    /// caller cannot push a vendor over its budget. Per-provider failures
    /// are never surfaced; exhaustion yields `AllProvidersFailed`.
    pub async fn latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        if self.providers.is_empty() {
            return Err(MarketDataError::NoProvidersAvailable);
        }

        for provider in &self.providers {
            if !provider.capabilities().supports_quote {
                continue;
            }

            self.rate_limiter.acquire(provider.id()).await;

            match provider.get_quote(symbol).await {
                Ok(quote) => {
                    debug!(
                        "Provider '{}' returned quote for '{}'",
                        provider.id(),
                        symbol
                    );
                    return Ok(quote);
                }
                Err(e) => {
                    warn!(
                        "Provider '{}' failed to get quote for '{}': {}. Trying next.",
                        provider.id(),
                        symbol,
                        e
                    );
                }
            }
        }

        Err(MarketDataError::AllProvidersFailed)
    }

    /// Fetch the full market from the first snapshot-capable provider.
    ///
    /// Snapshot-capable adapters are tried in priority order; a provider
    /// that fails or returns an empty table falls through to the next.
    pub async fn market_snapshot(&self) -> Result<HashMap<String, Quote>, MarketDataError> {
        let mut attempted = false;

        for provider in &self.providers {
            if !provider.capabilities().supports_snapshot {
                continue;
            }
            attempted = true;

            self.rate_limiter.acquire(provider.id()).await;

            match provider.get_market_snapshot().await {
                Ok(snapshot) if !snapshot.is_empty() => {
                    info!(
                        "Provider '{}' returned market snapshot with {} symbols",
                        provider.id(),
                        snapshot.len()
                    );
                    return Ok(snapshot);
                }
                Ok(_) => {
                    warn!(
                        "Provider '{}' returned an empty market snapshot. Trying next.",
                        provider.id()
                    );
                }
                Err(e) => {
                    warn!(
                        "Provider '{}' failed to get market snapshot: {}. Trying next.",
                        provider.id(),
                        e
                    );
                }
            }
        }

        if attempted {
            Err(MarketDataError::AllProvidersFailed)
        } else {
            Err(MarketDataError::NoProvidersAvailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderCapabilities, RateLimit};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        id: &'static str,
        priority: u8,
        call_count: AtomicUsize,
        should_fail: bool,
        supports_snapshot: bool,
    }

    impl MockProvider {
        fn new(id: &'static str, priority: u8, should_fail: bool) -> Self {
            Self {
                id,
                priority,
                call_count: AtomicUsize::new(0),
                should_fail,
                supports_snapshot: false,
            }
        }

        fn snapshot_capable(id: &'static str, priority: u8, should_fail: bool) -> Self {
            Self {
                supports_snapshot: true,
                ..Self::new(id, priority, should_fail)
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                supports_quote: true,
                supports_snapshot: self.supports_snapshot,
            }
        }

        fn rate_limit(&self) -> RateLimit {
            RateLimit {
                requests_per_minute: 60_000,
                burst_capacity: 1_000.0,
            }
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if self.should_fail {
                Err(MarketDataError::ProviderError {
                    provider: self.id.to_string(),
                    message: "mock failure".to_string(),
                })
            } else {
                Ok(Quote::new(symbol, "Mock Co", dec!(10.20), self.id))
            }
        }

        async fn get_market_snapshot(
            &self,
        ) -> Result<HashMap<String, Quote>, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if self.should_fail {
                Err(MarketDataError::ProviderError {
                    provider: self.id.to_string(),
                    message: "mock failure".to_string(),
                })
            } else {
                let mut map = HashMap::new();
                map.insert(
                    "600000".to_string(),
                    Quote::new("600000", "Mock Co", dec!(10.20), self.id),
                );
                Ok(map)
            }
        }
    }

    #[tokio::test]
    async fn test_latest_quote_uses_priority_order() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::new("SECONDARY", 2, false)),
            Arc::new(MockProvider::new("PRIMARY", 1, false)),
        ]);

        let quote = registry.latest_quote("600000").await.unwrap();
        assert_eq!(quote.source, "PRIMARY");
    }

    #[tokio::test]
    async fn test_latest_quote_falls_through_on_failure() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1, true));
        let secondary = Arc::new(MockProvider::new("SECONDARY", 2, false));
        let registry =
            ProviderRegistry::new(vec![primary.clone() as Arc<dyn MarketDataProvider>, secondary.clone()]);

        let quote = registry.latest_quote("600000").await.unwrap();
        assert_eq!(quote.source, "SECONDARY");
        assert_eq!(primary.call_count.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_latest_quote_exhaustion() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::new("A", 1, true)) as Arc<dyn MarketDataProvider>,
            Arc::new(MockProvider::new("B", 2, true)),
        ]);

        let err = registry.latest_quote("600000").await.unwrap_err();
        assert!(matches!(err, MarketDataError::AllProvidersFailed));
    }

    #[tokio::test]
    async fn test_latest_quote_no_providers() {
        let registry = ProviderRegistry::new(vec![]);
        let err = registry.latest_quote("600000").await.unwrap_err();
        assert!(matches!(err, MarketDataError::NoProvidersAvailable));
    }

    #[tokio::test]
    async fn test_market_snapshot_skips_quote_only_providers() {
        let quote_only = Arc::new(MockProvider::new("QUOTE_ONLY", 1, false));
        let spot = Arc::new(MockProvider::snapshot_capable("SPOT", 2, false));
        let registry = ProviderRegistry::new(vec![
            quote_only.clone() as Arc<dyn MarketDataProvider>,
            spot.clone(),
        ]);

        let snapshot = registry.market_snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(quote_only.call_count.load(Ordering::SeqCst), 0);
        assert_eq!(spot.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_market_snapshot_no_capable_provider() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::new("QUOTE_ONLY", 1, false)) as Arc<dyn MarketDataProvider>,
        ]);

        let err = registry.market_snapshot().await.unwrap_err();
        assert!(matches!(err, MarketDataError::NoProvidersAvailable));
    }
}
