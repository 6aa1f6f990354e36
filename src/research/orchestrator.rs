//! Cache-first, quota-bounded domain research
//!
//! A [`DomainResearcher`] answers `{name: [domain, ..]}` in three passes:
//!
//! 1. every domain is looked up in the durable cache;
//! 2. misses are admitted for live resolution while the call quota lasts,
//!    the rest are marked `max_calls_reached` and never cached;
//! 3. admitted domains are resolved concurrently through the configured
//!    [`Resolution`] strategy and every answer is written back to the cache.
//!
//! Nothing that happens to a single domain can fail the whole run.

use crate::cache::DomainCache;
use crate::config::ScoutConfig;
use crate::error::{DomainScoutError, Result};
use crate::providers::{AvailabilityProvider, BatchProvider, ProviderSet};
use crate::research::{join_error_message, PriceAggregator};
use crate::types::{
    Candidates, DomainOutcome, Research, ERROR_PROVIDER, MULTI_REGISTRAR_PROVIDER, NO_PROVIDER,
    QUOTA_PROVIDER,
};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Provider label of chain outcomes where no provider answered.
const NO_PROVIDER_LABEL: &str = "none";

/// Single-purpose availability providers tried in preference order.
#[derive(Clone)]
pub struct AvailabilityChain {
    providers: Vec<Arc<dyn AvailabilityProvider>>,
}

impl AvailabilityChain {
    pub fn new(providers: Vec<Arc<dyn AvailabilityProvider>>) -> Self {
        Self { providers }
    }

    /// The first answer with known availability wins.
    pub async fn resolve(&self, domain: &str) -> DomainOutcome {
        for provider in &self.providers {
            let outcome = provider.check(domain).await;
            if outcome.available.is_some() {
                return outcome;
            }
            tracing::debug!(
                domain = %domain,
                provider = provider.name(),
                error = ?outcome.error,
                "Availability unknown, trying next provider"
            );
        }
        DomainOutcome::failed(domain, NO_PROVIDER_LABEL, NO_PROVIDER)
    }
}

/// How pending domains get resolved. Chosen once per researcher.
#[derive(Clone)]
pub enum Resolution {
    /// Ask every registrar and merge their answers.
    Aggregate(PriceAggregator),
    /// Send the whole pending set to a bulk provider.
    Batch(Arc<dyn BatchProvider>),
    /// Ask availability providers one after another.
    Chain(AvailabilityChain),
}

impl Resolution {
    /// Multi-registrar when enabled, then the batch provider when enabled,
    /// then the availability chain.
    pub fn select(config: &ScoutConfig, providers: &ProviderSet) -> Self {
        if config.multi_registrar {
            Resolution::Aggregate(PriceAggregator::new(providers.pricing()))
        } else if providers.fastcheck.is_enabled() {
            Resolution::Batch(providers.fastcheck.clone())
        } else {
            Resolution::Chain(AvailabilityChain::new(providers.availability_chain()))
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Aggregate(_) => "multi-registrar",
            Resolution::Batch(_) => "batch",
            Resolution::Chain(_) => "chain",
        }
    }

    /// Resolve one domain. The batch strategy degrades to a one-element batch.
    pub async fn resolve(&self, domain: &str) -> DomainOutcome {
        match self {
            Resolution::Aggregate(aggregator) => aggregate(aggregator, domain).await,
            Resolution::Chain(chain) => chain.resolve(domain).await,
            Resolution::Batch(provider) => {
                let single = [domain.to_string()];
                let outcomes = provider.check_batch(&single).await;
                outcomes
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| DomainOutcome::missing_result(domain, provider.name()))
            }
        }
    }
}

/// Fold a price comparison into one outcome: availability from the first
/// registrar (in declaration order) that knew it, price from the best offer.
async fn aggregate(aggregator: &PriceAggregator, domain: &str) -> DomainOutcome {
    let comparison = aggregator.compare(domain).await;

    let answered = comparison.prices().iter().find(|p| p.is_available.is_some());
    let available = answered.and_then(|p| p.is_available);
    let provider = answered
        .map(|p| p.registrar.clone())
        .unwrap_or_else(|| MULTI_REGISTRAR_PROVIDER.to_string());
    let price = comparison.best_price().and_then(|best| best.price_usd);

    let outcome = DomainOutcome::new(domain, available, price, provider);
    let outcome = match available {
        Some(_) => outcome,
        None => outcome.with_error(NO_PROVIDER),
    };
    outcome.with_comparison(comparison)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchOptions {
    /// Live lookups allowed over the researcher's lifetime.
    pub max_calls: usize,
    /// Domains resolved at the same time by per-domain strategies.
    pub concurrency: usize,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            max_calls: 80,
            concurrency: 10,
        }
    }
}

impl From<&ScoutConfig> for ResearchOptions {
    fn from(config: &ScoutConfig) -> Self {
        Self {
            max_calls: config.max_calls,
            concurrency: config.concurrency,
        }
    }
}

/// A domain admitted for live resolution and where its answer goes.
struct Pending {
    name: String,
    slot: usize,
    domain: String,
}

/// The aggregation engine's entry point.
pub struct DomainResearcher {
    cache: Arc<DomainCache>,
    resolution: Arc<Resolution>,
    options: ResearchOptions,
    semaphore: Arc<Semaphore>,
    calls_made: AtomicUsize,
}

impl DomainResearcher {
    pub fn new(cache: Arc<DomainCache>, resolution: Resolution, options: ResearchOptions) -> Self {
        Self {
            cache,
            resolution: Arc::new(resolution),
            semaphore: Arc::new(Semaphore::new(options.concurrency.max(1))),
            options,
            calls_made: AtomicUsize::new(0),
        }
    }

    /// Open the cache and build every provider the configuration describes.
    pub async fn from_config(config: &ScoutConfig) -> Result<Self> {
        let cache = DomainCache::open(&config.cache_path).await?;
        let providers = ProviderSet::from_config(config)?;
        let resolution = Resolution::select(config, &providers);
        tracing::debug!(
            strategy = resolution.label(),
            cache = %config.cache_path.display(),
            max_calls = config.max_calls,
            "Domain researcher ready"
        );
        Ok(Self::new(Arc::new(cache), resolution, ResearchOptions::from(config)))
    }

    pub fn cache(&self) -> &DomainCache {
        &self.cache
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Live lookups dispatched so far.
    pub fn calls_made(&self) -> usize {
        self.calls_made.load(Ordering::SeqCst)
    }

    pub fn calls_remaining(&self) -> usize {
        self.options.max_calls.saturating_sub(self.calls_made())
    }

    /// Resolve every candidate domain.
    ///
    /// The result has one entry per input name and, under it, one
    /// `(domain, outcome)` pair per input domain in input order.
    pub async fn check(&self, candidates: &Candidates) -> Research {
        let started = Instant::now();
        let mut slots: BTreeMap<&str, Vec<Option<DomainOutcome>>> = BTreeMap::new();
        let mut pending = Vec::new();
        let (mut hits, mut blocked) = (0usize, 0usize);

        for (name, domains) in candidates {
            let entry = slots.entry(name.as_str()).or_default();
            for (slot, domain) in domains.iter().enumerate() {
                if let Some(cached) = self.cached(domain).await {
                    hits += 1;
                    entry.push(Some(cached));
                    continue;
                }
                match self.admit() {
                    Ok(()) => {
                        entry.push(None);
                        pending.push(Pending {
                            name: name.clone(),
                            slot,
                            domain: domain.clone(),
                        });
                    }
                    Err(e) => {
                        blocked += 1;
                        entry.push(Some(DomainOutcome::failed(
                            domain.as_str(),
                            QUOTA_PROVIDER,
                            e.to_outcome_error(),
                        )));
                    }
                }
            }
        }

        let dispatched = pending.len();
        let resolved = self.resolve_pending(&pending).await;

        for (item, outcome) in pending.iter().zip(resolved) {
            if let Err(e) = self.cache.set(&item.domain, &outcome).await {
                tracing::warn!(domain = %item.domain, error = %e, "Failed to cache domain outcome");
            }
            if let Some(entry) = slots.get_mut(item.name.as_str()) {
                entry[item.slot] = Some(outcome);
            }
        }

        let research: Research = candidates
            .iter()
            .map(|(name, domains)| {
                let outcomes = slots.remove(name.as_str()).unwrap_or_default();
                let pairs = domains
                    .iter()
                    .zip(outcomes)
                    .map(|(domain, outcome)| {
                        let outcome = outcome
                            .unwrap_or_else(|| DomainOutcome::missing_result(domain.as_str(), ERROR_PROVIDER));
                        (domain.clone(), outcome)
                    })
                    .collect();
                (name.clone(), pairs)
            })
            .collect();

        tracing::info!(
            names = %candidates.len(),
            cache_hits = %hits,
            dispatched = %dispatched,
            quota_blocked = %blocked,
            calls_made = %self.calls_made(),
            strategy = self.resolution.label(),
            duration_ms = %started.elapsed().as_millis(),
            "Domain research completed"
        );
        research
    }

    /// Cache lookup. A failed read counts as a miss.
    async fn cached(&self, domain: &str) -> Option<DomainOutcome> {
        match self.cache.get(domain).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Take one unit of quota if any is left.
    fn admit(&self) -> Result<()> {
        self.calls_made
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |made| {
                (made < self.options.max_calls).then_some(made + 1)
            })
            .map(|_| ())
            .map_err(|_| DomainScoutError::quota_exhausted(self.options.max_calls))
    }

    /// One outcome per pending item, in the same order.
    async fn resolve_pending(&self, pending: &[Pending]) -> Vec<DomainOutcome> {
        if pending.is_empty() {
            return Vec::new();
        }

        if let Resolution::Batch(provider) = self.resolution.as_ref() {
            return resolve_batch(Arc::clone(provider), pending).await;
        }

        let tasks = pending.iter().map(|item| {
            let resolution = Arc::clone(&self.resolution);
            let semaphore = Arc::clone(&self.semaphore);
            let domain = item.domain.clone();
            tokio::spawn(async move {
                // The semaphore is never closed, so a permit always arrives.
                let _permit = semaphore.acquire_owned().await.ok();
                resolution.resolve(&domain).await
            })
        });

        join_all(tasks)
            .await
            .into_iter()
            .zip(pending)
            .map(|(result, item)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = join_error_message(e);
                    tracing::warn!(domain = %item.domain, error = %message, "Domain resolution task failed");
                    DomainOutcome::failed(item.domain.as_str(), ERROR_PROVIDER, message)
                }
            })
            .collect()
    }
}

async fn resolve_batch(provider: Arc<dyn BatchProvider>, pending: &[Pending]) -> Vec<DomainOutcome> {
    let domains: Vec<String> = pending.iter().map(|item| item.domain.clone()).collect();
    let name = provider.name();
    let task = {
        let domains = domains.clone();
        tokio::spawn(async move { provider.check_batch(&domains).await })
    };

    match task.await {
        Ok(outcomes) => {
            let mut outcomes = outcomes.into_iter();
            domains
                .iter()
                .map(|domain| {
                    outcomes
                        .next()
                        .unwrap_or_else(|| DomainOutcome::missing_result(domain.as_str(), name))
                })
                .collect()
        }
        Err(e) => {
            let message = join_error_message(e);
            tracing::warn!(provider = name, error = %message, "Batch resolution task failed");
            domains
                .iter()
                .map(|domain| DomainOutcome::failed(domain.as_str(), ERROR_PROVIDER, message.as_str()))
                .collect()
        }
    }
}
