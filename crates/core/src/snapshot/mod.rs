//! Full-market snapshot cache and its refresher.
//!
//! One pull populates a symbol-keyed map of the whole market; the map and
//! its timestamp are swapped in atomically, so readers never observe a
//! mix of two refresh generations. A failed pull keeps the previous
//! snapshot (stale-but-available beats empty). Refreshes coalesce: a
//! request arriving while one is in flight waits for it and adopts its
//! outcome instead of issuing a second pull.

use chrono::NaiveDateTime;
use log::{info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use marketwatch_market_data::{ProviderRegistry, Quote};

use crate::clock::Clock;
use crate::market_hours::MarketHours;
use crate::settings::Settings;

/// One refresh generation of the whole market.
///
/// Immutable once constructed; every entry shares the snapshot timestamp.
#[derive(Clone, Debug)]
pub struct MarketSnapshot {
    pub quotes: HashMap<String, Quote>,
    pub fetched_at: NaiveDateTime,
}

/// Ops-facing view of the snapshot cache state.
#[derive(Clone, Debug, Serialize)]
pub struct CacheInfo {
    pub cache_time: Option<NaiveDateTime>,
    pub entry_count: usize,
    pub is_valid: bool,
    pub is_trading_session: bool,
    pub ttl_secs: u64,
    pub age_secs: u64,
    pub remaining_secs: u64,
}

/// Trading-hours-aware snapshot cache of the whole market.
pub struct SnapshotService {
    registry: Arc<ProviderRegistry>,
    clock: Arc<dyn Clock>,
    hours: MarketHours,
    ttl_trading: Duration,
    ttl_off_session: Duration,

    current: RwLock<Option<Arc<MarketSnapshot>>>,

    // Refresh coalescing: the mutex serializes pulls, the generation
    // counter lets a waiter detect that the pull it queued behind already
    // completed, and last_outcome carries that pull's status to it.
    refresh_lock: tokio::sync::Mutex<()>,
    generation: AtomicU64,
    last_outcome: AtomicBool,
}

impl SnapshotService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        clock: Arc<dyn Clock>,
        hours: MarketHours,
        settings: &Settings,
    ) -> Self {
        Self {
            registry,
            clock,
            hours,
            ttl_trading: settings.snapshot_ttl_trading,
            ttl_off_session: settings.snapshot_ttl_off_session,
            current: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            last_outcome: AtomicBool::new(false),
        }
    }

    fn read_current(&self) -> RwLockReadGuard<'_, Option<Arc<MarketSnapshot>>> {
        self.current.read().unwrap_or_else(|poisoned| {
            warn!("Snapshot lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_current(&self) -> RwLockWriteGuard<'_, Option<Arc<MarketSnapshot>>> {
        self.current.write().unwrap_or_else(|poisoned| {
            warn!("Snapshot lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Refresh the full market, coalescing concurrent requests.
    ///
    /// Returns whether the (possibly adopted) pull succeeded. On failure
    /// the previous snapshot and timestamp are left untouched.
    pub async fn refresh(&self) -> bool {
        let observed = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            // A refresh completed while we waited for the lock; its
            // outcome is ours.
            return self.last_outcome.load(Ordering::Acquire);
        }

        let outcome = self.pull_and_swap().await;
        self.last_outcome.store(outcome, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Pull the market, cleanse it, and swap it in if non-empty.
    async fn pull_and_swap(&self) -> bool {
        let started = std::time::Instant::now();

        let mut quotes = match self.registry.market_snapshot().await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Full-market refresh failed, keeping previous snapshot: {}", e);
                return false;
            }
        };

        for quote in quotes.values_mut() {
            cleanse_quote(quote);
        }

        let fetched_at = self.clock.now();
        let count = quotes.len();
        let snapshot = Arc::new(MarketSnapshot { quotes, fetched_at });

        *self.write_current() = Some(snapshot);

        info!(
            "Market snapshot refreshed: {} symbols in {:.2}s",
            count,
            started.elapsed().as_secs_f64()
        );
        true
    }

    fn ttl(&self, in_session: bool) -> Duration {
        if in_session {
            self.ttl_trading
        } else {
            self.ttl_off_session
        }
    }

    /// Whether the current snapshot is fresh enough to serve from.
    ///
    /// TTL depends on whether a session is open now, not on when the
    /// snapshot was taken. An age exactly at the TTL is invalid.
    pub fn is_valid(&self) -> bool {
        let guard = self.read_current();
        let Some(snapshot) = guard.as_ref() else {
            return false;
        };
        let now = self.clock.now();
        let ttl_ms = self.ttl(self.hours.is_open(now)).as_millis() as i64;
        (now - snapshot.fetched_at).num_milliseconds() < ttl_ms
    }

    /// Get a symbol's quote from the snapshot if it is valid.
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        if !self.is_valid() {
            return None;
        }
        self.read_current()
            .as_ref()
            .and_then(|snapshot| snapshot.quotes.get(symbol).cloned())
    }

    /// The current snapshot generation, valid or not.
    pub fn current(&self) -> Option<Arc<MarketSnapshot>> {
        self.read_current().clone()
    }

    /// Ops view: validity, age, remaining TTL, entry count, session flag.
    pub fn cache_info(&self) -> CacheInfo {
        let now = self.clock.now();
        let in_session = self.hours.is_open(now);
        let ttl = self.ttl(in_session);

        let guard = self.read_current();
        let (cache_time, entry_count, age_secs) = match guard.as_ref() {
            Some(snapshot) => (
                Some(snapshot.fetched_at),
                snapshot.quotes.len(),
                (now - snapshot.fetched_at).num_seconds().max(0) as u64,
            ),
            None => (None, 0, 0),
        };
        drop(guard);

        CacheInfo {
            cache_time,
            entry_count,
            is_valid: self.is_valid(),
            is_trading_session: in_session,
            ttl_secs: ttl.as_secs(),
            age_secs,
            remaining_secs: ttl.as_secs().saturating_sub(age_secs),
        }
    }
}

/// Coerce a snapshot row into a servable quote.
///
/// Vendors report a zero last price outside trading hours for instruments
/// that did not trade; the previous close stands in for it, with the
/// change fields zeroed to match.
fn cleanse_quote(quote: &mut Quote) {
    if quote.price.is_zero() && quote.prev_close > Decimal::ZERO {
        quote.price = quote.prev_close;
        quote.change = Decimal::ZERO;
        quote.change_percent = Decimal::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use marketwatch_market_data::{
        MarketDataError, MarketDataProvider, ProviderCapabilities, RateLimit,
    };
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;

    fn monday(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 20)
            .and_then(|d| d.and_hms_opt(hour, min, 0))
            .expect("valid test datetime")
    }

    struct SnapshotStub {
        quotes: Vec<(&'static str, Decimal, Decimal)>,
        fail: AtomicBool,
        pulls: AtomicUsize,
    }

    impl SnapshotStub {
        fn new(quotes: Vec<(&'static str, Decimal, Decimal)>) -> Self {
            Self {
                quotes,
                fail: AtomicBool::new(false),
                pulls: AtomicUsize::new(0),
            }
        }

        fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MarketDataProvider for SnapshotStub {
        fn id(&self) -> &'static str {
            "STUB"
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                supports_quote: false,
                supports_snapshot: true,
            }
        }

        fn rate_limit(&self) -> RateLimit {
            RateLimit {
                requests_per_minute: 60_000,
                burst_capacity: 1_000.0,
            }
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
            Err(MarketDataError::SymbolNotFound(symbol.to_string()))
        }

        async fn get_market_snapshot(
            &self,
        ) -> Result<HashMap<String, Quote>, MarketDataError> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(MarketDataError::EmptyPayload {
                    provider: "STUB".to_string(),
                });
            }
            Ok(self
                .quotes
                .iter()
                .map(|(symbol, price, prev_close)| {
                    let mut quote = Quote::new(*symbol, "Stub Co", *price, "STUB");
                    quote.prev_close = *prev_close;
                    quote.change = *price - *prev_close;
                    quote.change_percent = Quote::percent_change(*price, *prev_close);
                    (symbol.to_string(), quote)
                })
                .collect())
        }
    }

    fn service_with(
        stub: Arc<SnapshotStub>,
        at: NaiveDateTime,
    ) -> (Arc<FixedClock>, SnapshotService) {
        let clock = Arc::new(FixedClock::new(at));
        let registry = Arc::new(ProviderRegistry::new(vec![stub]));
        let service = SnapshotService::new(
            registry,
            clock.clone(),
            MarketHours::default(),
            &Settings::default(),
        );
        (clock, service)
    }

    #[tokio::test]
    async fn test_refresh_populates_snapshot() {
        let stub = Arc::new(SnapshotStub::new(vec![
            ("600000", dec!(10.20), dec!(10.00)),
            ("000001", dec!(12.50), dec!(12.40)),
        ]));
        let (_clock, service) = service_with(stub, monday(9, 0));

        assert!(service.refresh().await);

        let info = service.cache_info();
        assert!(info.is_valid);
        assert!(info.is_trading_session);
        assert_eq!(info.entry_count, 2);
        assert_eq!(info.ttl_secs, 300);

        let quote = service.get("600000").expect("snapshot quote");
        assert_eq!(quote.price, dec!(10.20));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_snapshot() {
        let stub = Arc::new(SnapshotStub::new(vec![("600000", dec!(10.20), dec!(10.00))]));
        let (clock, service) = service_with(stub.clone(), monday(9, 0));
        assert!(service.refresh().await);
        let first = service.current().expect("snapshot").fetched_at;

        clock.advance(ChronoDuration::minutes(1));
        stub.set_fail(true);
        assert!(!service.refresh().await);

        // Previous generation and timestamp untouched.
        let current = service.current().expect("snapshot");
        assert_eq!(current.fetched_at, first);
        assert_eq!(current.quotes.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_refresh_leaves_cache_empty() {
        let stub = Arc::new(SnapshotStub::new(vec![]));
        stub.set_fail(true);
        let (_clock, service) = service_with(stub, monday(9, 0));

        assert!(!service.refresh().await);
        assert!(service.current().is_none());
        assert!(!service.cache_info().is_valid);
    }

    #[tokio::test]
    async fn test_snapshot_expires_with_trading_ttl() {
        let stub = Arc::new(SnapshotStub::new(vec![("600000", dec!(10.20), dec!(10.00))]));
        let (clock, service) = service_with(stub, monday(9, 0));
        assert!(service.refresh().await);
        assert!(service.is_valid());

        // 6 minutes later, past the 5-minute trading TTL.
        clock.advance(ChronoDuration::minutes(6));
        assert!(!service.is_valid());
        assert!(service.get("600000").is_none());
    }

    #[tokio::test]
    async fn test_off_session_substitution() {
        // Saturday: provider reports zero price with a positive close.
        let stub = Arc::new(SnapshotStub::new(vec![("600000", dec!(0), dec!(12.34))]));
        let saturday = NaiveDate::from_ymd_opt(2024, 5, 25)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .expect("valid test datetime");
        let (_clock, service) = service_with(stub, saturday);

        assert!(service.refresh().await);
        let quote = service.get("600000").expect("snapshot quote");
        assert_eq!(quote.price, dec!(12.34));
        assert_eq!(quote.change, Decimal::ZERO);
        assert_eq!(quote.change_percent, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_coalesce() {
        let stub = Arc::new(SnapshotStub::new(vec![("600000", dec!(10.20), dec!(10.00))]));
        let (_clock, service) = service_with(stub.clone(), monday(9, 0));
        let service = Arc::new(service);

        // Hold the refresh lock so every caller queues behind one pull.
        let gate = service.refresh_lock.lock().await;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.refresh().await }));
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(gate);

        for handle in handles {
            assert!(handle.await.expect("refresh task"));
        }

        // One caller pulled; the other three adopted its outcome.
        assert_eq!(stub.pulls.load(Ordering::SeqCst), 1);
    }
}
