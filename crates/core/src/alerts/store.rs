//! Store traits for externally-owned alert data.
//!
//! Rules and events live in the embedding application's persistent store;
//! the core reaches them through these traits only.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::errors::Result;

use super::model::{AlertEvent, AlertRule};

/// Read access to the externally-owned alert rules.
#[async_trait]
pub trait AlertRuleStore: Send + Sync {
    /// All rules with the active flag set.
    async fn list_active_rules(&self) -> Result<Vec<AlertRule>>;
}

/// Persistence for alert events and their delivery state.
#[async_trait]
pub trait AlertEventStore: Send + Sync {
    /// Record a freshly created event, returning its store-assigned id.
    async fn record(&self, event: AlertEvent) -> Result<i64>;

    /// Mark a recorded event as delivered at the given time.
    async fn mark_sent(&self, event_id: i64, sent_at: NaiveDateTime) -> Result<()>;
}
