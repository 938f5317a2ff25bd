//! Namespaced expiring cache.
//!
//! A generic key/value store where validity is a function of entry age,
//! namespace and whether a trading session is open right now. Expired
//! entries are logically evicted: a `get` past the TTL is a miss whether
//! or not the entry still occupies memory. The periodic [`sweep`]
//! reclaims long-idle entries; correctness never depends on it running.
//!
//! [`sweep`]: ExpiringCache::sweep

use chrono::NaiveDateTime;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::market_hours::MarketHours;
use crate::settings::Settings;

/// Cache namespaces, one per freshness class.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CacheNamespace {
    /// Ad hoc request-path quotes; looser freshness.
    Interactive,
    /// Alert-evaluation quotes; tight freshness on a small working set.
    Monitor,
}

/// Session-dependent TTL pair for one namespace.
#[derive(Clone, Copy, Debug)]
pub struct TtlPolicy {
    pub trading: Duration,
    pub off_session: Duration,
}

impl TtlPolicy {
    fn ttl(&self, in_session: bool) -> Duration {
        if in_session {
            self.trading
        } else {
            self.off_session
        }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    created_at: NaiveDateTime,
}

/// Concurrent expiring cache with per-namespace TTL policies.
///
/// Backed by a sharded map: concurrent readers and writers on disjoint
/// keys do not contend, and a write replaces an entry whole, so readers
/// never observe a partially written value.
pub struct ExpiringCache<V> {
    entries: DashMap<(CacheNamespace, String), CacheEntry<V>>,
    policies: HashMap<CacheNamespace, TtlPolicy>,
    clock: Arc<dyn Clock>,
    hours: MarketHours,
    sweep_idle_ceiling: Duration,
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new(
        clock: Arc<dyn Clock>,
        hours: MarketHours,
        policies: HashMap<CacheNamespace, TtlPolicy>,
        sweep_idle_ceiling: Duration,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            policies,
            clock,
            hours,
            sweep_idle_ceiling,
        }
    }

    /// Build the quote cache with the namespaces the resolver uses.
    pub fn from_settings(clock: Arc<dyn Clock>, hours: MarketHours, settings: &Settings) -> Self {
        let mut policies = HashMap::new();
        policies.insert(
            CacheNamespace::Interactive,
            TtlPolicy {
                trading: settings.interactive_ttl_trading,
                off_session: settings.interactive_ttl_off_session,
            },
        );
        policies.insert(
            CacheNamespace::Monitor,
            TtlPolicy {
                trading: settings.monitor_ttl_trading,
                off_session: settings.monitor_ttl_off_session,
            },
        );
        Self::new(clock, hours, policies, settings.sweep_idle_ceiling)
    }

    fn ttl_for(&self, namespace: CacheNamespace, in_session: bool) -> Duration {
        self.policies
            .get(&namespace)
            .map(|policy| policy.ttl(in_session))
            .unwrap_or(Duration::ZERO)
    }

    /// Entry age is strictly less than the TTL, or the entry is invalid
    /// (an entry exactly at its TTL is expired).
    fn entry_valid(&self, namespace: CacheNamespace, created_at: NaiveDateTime) -> bool {
        let now = self.clock.now();
        let in_session = self.hours.is_open(now);
        let ttl_ms = self.ttl_for(namespace, in_session).as_millis() as i64;
        let age_ms = (now - created_at).num_milliseconds();
        age_ms < ttl_ms
    }

    /// Get a value if a valid entry exists.
    pub fn get(&self, namespace: CacheNamespace, key: &str) -> Option<V> {
        let entry = self.entries.get(&(namespace, key.to_string()))?;
        if self.entry_valid(namespace, entry.created_at) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Insert or replace a value, stamped with the current time.
    pub fn set(&self, namespace: CacheNamespace, key: &str, value: V) {
        self.entries.insert(
            (namespace, key.to_string()),
            CacheEntry {
                value,
                created_at: self.clock.now(),
            },
        );
    }

    /// Whether a valid entry exists for the key.
    pub fn is_valid(&self, namespace: CacheNamespace, key: &str) -> bool {
        self.entries
            .get(&(namespace, key.to_string()))
            .map(|entry| self.entry_valid(namespace, entry.created_at))
            .unwrap_or(false)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Memory-hygiene pass: drop entries idle beyond the sweep ceiling.
    ///
    /// The ceiling is at least as long as every configured TTL, so a
    /// swept entry was already a logical miss.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let ceiling_ms = self.sweep_idle_ceiling.as_millis() as i64;
        self.entries
            .retain(|_, entry| (now - entry.created_at).num_milliseconds() < ceiling_ms);
    }
}
