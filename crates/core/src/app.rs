//! Top-level service wiring.
//!
//! The embedding application constructs one [`MarketWatch`] at startup
//! with its stores and providers, starts it, and tears it down at
//! shutdown. All shared state lives inside this object; there are no
//! process-wide singletons.

use futures::FutureExt;
use std::sync::Arc;

use marketwatch_market_data::{
    EastmoneyProvider, EastmoneySpotProvider, MarketDataProvider, ProviderRegistry, SinaProvider,
};

use crate::alerts::{AlertEvaluator, AlertEventStore, AlertRuleStore};
use crate::cache::ExpiringCache;
use crate::clock::Clock;
use crate::errors::Error;
use crate::market_hours::MarketHours;
use crate::notifications::{NotificationDispatcher, NotificationTargetStore};
use crate::quotes::QuoteService;
use crate::scheduler::{Scheduler, Trigger};
use crate::settings::Settings;
use crate::snapshot::{CacheInfo, SnapshotService};

/// The assembled monitoring core.
pub struct MarketWatch {
    snapshot: Arc<SnapshotService>,
    quotes: Arc<QuoteService>,
    evaluator: Arc<AlertEvaluator>,
    scheduler: Scheduler,
}

impl MarketWatch {
    /// Wire every service together and register the default jobs.
    pub fn new(
        settings: Settings,
        clock: Arc<dyn Clock>,
        registry: Arc<ProviderRegistry>,
        rule_store: Arc<dyn AlertRuleStore>,
        event_store: Arc<dyn AlertEventStore>,
        target_store: Arc<dyn NotificationTargetStore>,
    ) -> Self {
        let hours = MarketHours::default();

        let snapshot = Arc::new(SnapshotService::new(
            registry.clone(),
            clock.clone(),
            hours.clone(),
            &settings,
        ));
        let cache = Arc::new(ExpiringCache::from_settings(
            clock.clone(),
            hours,
            &settings,
        ));
        let quotes = Arc::new(QuoteService::new(
            snapshot.clone(),
            cache.clone(),
            registry,
            settings.batch_concurrency,
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            target_store,
            event_store.clone(),
            clock.clone(),
            &settings,
        ));
        let evaluator = Arc::new(AlertEvaluator::new(
            rule_store,
            event_store,
            quotes.clone(),
            dispatcher,
            clock.clone(),
        ));

        let mut scheduler = Scheduler::new(clock);
        register_default_jobs(
            &mut scheduler,
            &settings,
            snapshot.clone(),
            cache,
            evaluator.clone(),
        );

        Self {
            snapshot,
            quotes,
            evaluator,
            scheduler,
        }
    }

    /// Assemble with the production provider chain
    /// (Eastmoney, Sina, Eastmoney spot list).
    pub fn with_default_providers(
        settings: Settings,
        clock: Arc<dyn Clock>,
        rule_store: Arc<dyn AlertRuleStore>,
        event_store: Arc<dyn AlertEventStore>,
        target_store: Arc<dyn NotificationTargetStore>,
    ) -> Self {
        let providers: Vec<Arc<dyn MarketDataProvider>> = vec![
            Arc::new(EastmoneyProvider::new()),
            Arc::new(SinaProvider::new()),
            Arc::new(EastmoneySpotProvider::new()),
        ];
        let registry = Arc::new(ProviderRegistry::new(providers));
        Self::new(
            settings,
            clock,
            registry,
            rule_store,
            event_store,
            target_store,
        )
    }

    /// Quote resolution entry points for the request-handling glue.
    pub fn quotes(&self) -> &Arc<QuoteService> {
        &self.quotes
    }

    /// Alert evaluation entry point (scheduler-driven, also callable).
    pub fn evaluator(&self) -> &Arc<AlertEvaluator> {
        &self.evaluator
    }

    /// Manual full-market refresh (admin endpoint).
    pub async fn refresh_now(&self) -> bool {
        self.snapshot.refresh().await
    }

    /// Ops view of the snapshot cache.
    pub fn cache_info(&self) -> CacheInfo {
        self.snapshot.cache_info()
    }

    /// Start the scheduler loop (fires the warm-up refresh).
    pub fn start(&mut self) {
        self.scheduler.start();
    }

    /// Stop the scheduler, awaiting any in-flight job.
    pub async fn stop(&mut self) {
        self.scheduler.stop().await;
    }
}

/// Default cadences: refresh at session open, every ten minutes in
/// between, and after close; evaluate alerts every two minutes; sweep the
/// quote cache hourly. The warm-up refresh runs once at start so the
/// cache is populated before the first client request.
fn register_default_jobs(
    scheduler: &mut Scheduler,
    settings: &Settings,
    snapshot: Arc<SnapshotService>,
    cache: Arc<ExpiringCache<marketwatch_market_data::Quote>>,
    evaluator: Arc<AlertEvaluator>,
) {
    let refresh_job = {
        let snapshot = snapshot.clone();
        move || {
            let snapshot = snapshot.clone();
            async move {
                if snapshot.refresh().await {
                    Ok(())
                } else {
                    Err(Error::RefreshFailed)
                }
            }
            .boxed()
        }
    };

    scheduler.register(
        "market-refresh-open",
        Trigger::DailyAt {
            time: settings.open_refresh_at,
            weekdays_only: true,
        },
        false,
        refresh_job.clone(),
    );
    scheduler.register(
        "market-refresh-interval",
        Trigger::Every(settings.refresh_interval),
        true,
        refresh_job.clone(),
    );
    scheduler.register(
        "market-refresh-close",
        Trigger::DailyAt {
            time: settings.close_refresh_at,
            weekdays_only: true,
        },
        false,
        refresh_job,
    );

    scheduler.register(
        "alert-evaluation",
        Trigger::Every(settings.alert_check_interval),
        false,
        move || {
            let evaluator = evaluator.clone();
            async move { evaluator.run_pass().await }.boxed()
        },
    );

    scheduler.register(
        "cache-sweep",
        Trigger::Every(settings.sweep_idle_ceiling),
        false,
        move || {
            let cache = cache.clone();
            async move {
                cache.sweep();
                Ok(())
            }
            .boxed()
        },
    );
}
