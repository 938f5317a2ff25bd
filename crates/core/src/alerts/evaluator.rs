//! Periodic alert evaluation.
//!
//! One pass: fetch active rules, batch-resolve their symbols in monitor
//! mode, evaluate each rule against its quote, record an event per breach
//! and hand it to the dispatcher. A rule whose symbol resolved nothing
//! this pass is skipped silently and retried next pass. There is no
//! suppression of repeat firing across passes: an unchanged breach fires
//! every pass it is evaluated.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::alerts::model::AlertEvent;
use crate::alerts::store::{AlertEventStore, AlertRuleStore};
use crate::clock::Clock;
use crate::errors::Result;
use crate::notifications::NotificationDispatcher;
use crate::quotes::{QuoteService, ResolveMode};

/// Evaluates every active rule against the freshest quotes.
pub struct AlertEvaluator {
    rules: Arc<dyn AlertRuleStore>,
    events: Arc<dyn AlertEventStore>,
    quotes: Arc<QuoteService>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl AlertEvaluator {
    pub fn new(
        rules: Arc<dyn AlertRuleStore>,
        events: Arc<dyn AlertEventStore>,
        quotes: Arc<QuoteService>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rules,
            events,
            quotes,
            dispatcher,
            clock,
        }
    }

    /// Run one evaluation pass over all active rules.
    ///
    /// Store failures on individual events are logged and do not abort
    /// the rest of the pass; only a failure to list the rules at all is
    /// surfaced.
    pub async fn run_pass(&self) -> Result<()> {
        let rules = self.rules.list_active_rules().await?;
        if rules.is_empty() {
            return Ok(());
        }

        let symbols: HashSet<String> = rules
            .iter()
            .filter(|rule| rule.is_active)
            .map(|rule| rule.symbol.clone())
            .collect();

        let quotes = self.quotes.resolve_many(&symbols, ResolveMode::Monitor).await;
        debug!(
            "Alert pass: {} rules, {} symbols, {} quotes resolved",
            rules.len(),
            symbols.len(),
            quotes.len()
        );

        let mut fired = 0usize;
        for rule in rules.iter().filter(|rule| rule.is_active) {
            let Some(quote) = quotes.get(&rule.symbol) else {
                // Unresolvable this pass; re-evaluated on the next one.
                debug!("No quote for '{}', skipping rule {}", rule.symbol, rule.id);
                continue;
            };

            let Some(breach) = rule.evaluate(quote) else {
                continue;
            };

            let event = AlertEvent::for_breach(rule, quote, breach, self.clock.now());
            let event_id = match self.events.record(event.clone()).await {
                Ok(id) => id,
                Err(e) => {
                    warn!("Failed to record alert event for rule {}: {}", rule.id, e);
                    continue;
                }
            };

            fired += 1;
            self.dispatcher.dispatch(event_id, &event).await;
        }

        if fired > 0 {
            info!("Alert pass fired {} event(s)", fired);
        }
        Ok(())
    }
}
