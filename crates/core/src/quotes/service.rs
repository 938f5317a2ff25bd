//! Quote resolution service.
//!
//! Resolution walks cheap layers first: the full-market snapshot, then
//! the per-symbol expiring cache, then the provider chain. Each
//! successful provider fetch is written back to the mode's cache
//! namespace before it is returned. A symbol that exhausts every layer is
//! a miss, never an error; absence means "temporarily unknown".

use futures::future::join_all;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;

use marketwatch_market_data::{ProviderRegistry, Quote};

use crate::cache::{CacheNamespace, ExpiringCache};
use crate::snapshot::SnapshotService;

/// Who is asking, which controls cache namespace and freshness.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolveMode {
    /// Ad hoc UI requests; looser freshness.
    Interactive,
    /// Alert evaluation; tight freshness on a small working set.
    Monitor,
}

impl ResolveMode {
    fn namespace(self) -> CacheNamespace {
        match self {
            Self::Interactive => CacheNamespace::Interactive,
            Self::Monitor => CacheNamespace::Monitor,
        }
    }
}

/// Layered per-symbol quote resolver.
pub struct QuoteService {
    snapshot: Arc<SnapshotService>,
    cache: Arc<ExpiringCache<Quote>>,
    registry: Arc<ProviderRegistry>,
    batch_concurrency: usize,
}

impl QuoteService {
    pub fn new(
        snapshot: Arc<SnapshotService>,
        cache: Arc<ExpiringCache<Quote>>,
        registry: Arc<ProviderRegistry>,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            snapshot,
            cache,
            registry,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    /// Resolve one symbol through the layered chain.
    ///
    /// Layers, in order: valid market snapshot, per-symbol cache for this
    /// mode, then the provider chain (which itself falls through
    /// primary/secondary/tertiary). Resolution stops at the first hit.
    pub async fn resolve(&self, symbol: &str, mode: ResolveMode) -> Option<Quote> {
        if let Some(quote) = self.snapshot.get(symbol) {
            return Some(quote);
        }

        let namespace = mode.namespace();
        if let Some(quote) = self.cache.get(namespace, symbol) {
            return Some(quote);
        }

        match self.registry.latest_quote(symbol).await {
            Ok(quote) => {
                self.cache.set(namespace, symbol, quote.clone());
                Some(quote)
            }
            Err(e) => {
                debug!("All quote layers exhausted for '{}': {}", symbol, e);
                None
            }
        }
    }

    /// Resolve many symbols with bounded concurrency.
    ///
    /// Fans out one resolution per symbol under a counting semaphore.
    /// Symbols that fail every layer are simply absent from the result;
    /// the mapping carries no ordering.
    pub async fn resolve_many(
        &self,
        symbols: &HashSet<String>,
        mode: ResolveMode,
    ) -> HashMap<String, Quote> {
        let semaphore = Arc::new(Semaphore::new(self.batch_concurrency));

        let tasks = symbols.iter().map(|symbol| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                let quote = self.resolve(symbol, mode).await?;
                Some((symbol.clone(), quote))
            }
        });

        join_all(tasks).await.into_iter().flatten().collect()
    }
}
