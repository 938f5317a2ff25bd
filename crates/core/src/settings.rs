//! Core configuration.
//!
//! Constructed by the embedding application and injected; defaults mirror
//! the production deployment values. There is no environment parsing or
//! global state here.

use chrono::NaiveTime;
use std::time::Duration;

/// Tunable knobs for caching, scheduling and fan-out.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Full-market snapshot TTL while a session is open.
    pub snapshot_ttl_trading: Duration,
    /// Full-market snapshot TTL outside sessions.
    pub snapshot_ttl_off_session: Duration,

    /// Per-symbol monitor-mode cache TTL while a session is open.
    pub monitor_ttl_trading: Duration,
    /// Per-symbol monitor-mode cache TTL outside sessions.
    pub monitor_ttl_off_session: Duration,

    /// Per-symbol interactive-mode cache TTL while a session is open.
    pub interactive_ttl_trading: Duration,
    /// Per-symbol interactive-mode cache TTL outside sessions.
    pub interactive_ttl_off_session: Duration,

    /// Idle age beyond which the memory-hygiene sweep reclaims entries.
    pub sweep_idle_ceiling: Duration,

    /// Interval between in-day full-market refreshes.
    pub refresh_interval: Duration,
    /// Interval between alert evaluation passes.
    pub alert_check_interval: Duration,

    /// Session-open refresh time (weekdays).
    pub open_refresh_at: NaiveTime,
    /// Post-close refresh time (weekdays).
    pub close_refresh_at: NaiveTime,

    /// Maximum simultaneous in-flight per-symbol resolutions.
    pub batch_concurrency: usize,

    /// Outbound webhook timeout.
    pub dispatch_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snapshot_ttl_trading: Duration::from_secs(300),
            snapshot_ttl_off_session: Duration::from_secs(7200),
            monitor_ttl_trading: Duration::from_secs(10),
            monitor_ttl_off_session: Duration::from_secs(300),
            interactive_ttl_trading: Duration::from_secs(60),
            interactive_ttl_off_session: Duration::from_secs(300),
            sweep_idle_ceiling: Duration::from_secs(3600),
            refresh_interval: Duration::from_secs(600),
            alert_check_interval: Duration::from_secs(120),
            open_refresh_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close_refresh_at: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
            batch_concurrency: 10,
            dispatch_timeout: Duration::from_secs(10),
        }
    }
}
