//! Outbound notification dispatch.
//!
//! Each user may configure one webhook target; a triggered alert becomes
//! a single outbound call with the event message as payload. Delivery is
//! at-most-once: a failed or timed-out call is logged and the event stays
//! pending with no automatic retry. Without a configured (and enabled)
//! target, dispatch is a no-op and the recorded event preserves in-app
//! history.

use log::{debug, warn};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::alerts::{AlertEvent, AlertEventStore};
use crate::clock::Clock;
use crate::errors::Result;
use crate::settings::Settings;

/// A user's webhook configuration.
///
/// Owned by the external config store; read-only here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub user_id: i64,
    pub url: String,
    /// HTTP method name; anything unrecognized falls back to POST.
    pub method: String,
    pub headers: HashMap<String, String>,
    pub enabled: bool,
}

/// Read access to per-user notification targets.
#[async_trait]
pub trait NotificationTargetStore: Send + Sync {
    async fn get_target(&self, user_id: i64) -> Result<Option<NotificationTarget>>;
}

/// Delivers alert events to configured webhooks.
pub struct NotificationDispatcher {
    targets: Arc<dyn NotificationTargetStore>,
    events: Arc<dyn AlertEventStore>,
    clock: Arc<dyn Clock>,
    client: Client,
}

impl NotificationDispatcher {
    pub fn new(
        targets: Arc<dyn NotificationTargetStore>,
        events: Arc<dyn AlertEventStore>,
        clock: Arc<dyn Clock>,
        settings: &Settings,
    ) -> Self {
        let client = Client::builder()
            .timeout(settings.dispatch_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            targets,
            events,
            clock,
            client,
        }
    }

    /// Deliver one event to its user's webhook.
    ///
    /// Returns whether delivery succeeded. On success the event is marked
    /// sent; on any failure (no target, disabled target, HTTP error,
    /// timeout) it stays pending and the failure is logged.
    pub async fn dispatch(&self, event_id: i64, event: &AlertEvent) -> bool {
        let target = match self.targets.get_target(event.user_id).await {
            Ok(Some(target)) if target.enabled => target,
            Ok(_) => {
                debug!(
                    "No enabled notification target for user {}, event {} stays in-app only",
                    event.user_id, event_id
                );
                return false;
            }
            Err(e) => {
                warn!(
                    "Failed to load notification target for user {}: {}",
                    event.user_id, e
                );
                return false;
            }
        };

        let method = Method::from_bytes(target.method.to_uppercase().as_bytes())
            .unwrap_or(Method::POST);

        let mut request = self
            .client
            .request(method, &target.url)
            .json(&serde_json::json!({ "content": event.message }));
        for (name, value) in &target.headers {
            request = request.header(name, value);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                if let Err(e) = self.events.mark_sent(event_id, self.clock.now()).await {
                    warn!("Delivered event {} but failed to mark it sent: {}", event_id, e);
                }
                true
            }
            Ok(response) => {
                warn!(
                    "Webhook for user {} answered {}, event {} stays pending",
                    event.user_id,
                    response.status(),
                    event_id
                );
                false
            }
            Err(e) => {
                warn!(
                    "Webhook call for user {} failed: {}, event {} stays pending",
                    event.user_id, e, event_id
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertKind, DeliveryState};
    use crate::clock::FixedClock;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    fn monday_0930() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 20)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("valid test datetime")
    }

    fn sample_event() -> AlertEvent {
        AlertEvent {
            rule_id: 1,
            user_id: 7,
            symbol: "600000".to_string(),
            kind: AlertKind::PriceFloor,
            value: dec!(9.8),
            message: "Stock alert".to_string(),
            created_at: monday_0930(),
            delivery: DeliveryState::Pending,
        }
    }

    struct FixedTarget(Option<NotificationTarget>);

    #[async_trait]
    impl NotificationTargetStore for FixedTarget {
        async fn get_target(&self, _user_id: i64) -> Result<Option<NotificationTarget>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct MemoryEvents {
        sent: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl AlertEventStore for MemoryEvents {
        async fn record(&self, _event: AlertEvent) -> Result<i64> {
            Ok(1)
        }

        async fn mark_sent(&self, event_id: i64, _sent_at: NaiveDateTime) -> Result<()> {
            self.sent.lock().expect("sent lock").push(event_id);
            Ok(())
        }
    }

    fn dispatcher_with(target: Option<NotificationTarget>) -> (Arc<MemoryEvents>, NotificationDispatcher) {
        let events = Arc::new(MemoryEvents::default());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(FixedTarget(target)),
            events.clone(),
            Arc::new(FixedClock::new(monday_0930())),
            &Settings::default(),
        );
        (events, dispatcher)
    }

    #[tokio::test]
    async fn test_dispatch_without_target_is_noop() {
        let (events, dispatcher) = dispatcher_with(None);

        assert!(!dispatcher.dispatch(1, &sample_event()).await);
        assert!(events.sent.lock().expect("sent lock").is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_disabled_target_is_noop() {
        let target = NotificationTarget {
            user_id: 7,
            url: "http://127.0.0.1:9/hook".to_string(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            enabled: false,
        };
        let (events, dispatcher) = dispatcher_with(Some(target));

        assert!(!dispatcher.dispatch(1, &sample_event()).await);
        assert!(events.sent.lock().expect("sent lock").is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_connection_failure_leaves_pending() {
        // Port 9 (discard) refuses connections; the call fails fast and
        // the event must stay pending.
        let target = NotificationTarget {
            user_id: 7,
            url: "http://127.0.0.1:9/hook".to_string(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            enabled: true,
        };
        let (events, dispatcher) = dispatcher_with(Some(target));

        assert!(!dispatcher.dispatch(1, &sample_event()).await);
        assert!(events.sent.lock().expect("sent lock").is_empty());
    }
}
