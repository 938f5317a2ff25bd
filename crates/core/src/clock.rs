//! Time source abstraction.
//!
//! Session classification and cache validity both depend on "now" in
//! exchange-local time. Injecting the clock keeps those components
//! testable with frozen time and keeps host timezone configuration out of
//! the picture.

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Asia::Shanghai;
use std::sync::Mutex;

/// Source of the current exchange-local wall clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Real clock pinned to the exchange timezone (Asia/Shanghai).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&Shanghai).naive_local()
    }
}

/// Manually advanced clock for deterministic tests.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to a new instant.
    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, delta: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += delta;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}
