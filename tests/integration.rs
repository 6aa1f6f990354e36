//! Integration tests for domain-scout

use async_trait::async_trait;
use domain_scout::{
    cache::DomainCache,
    config::{FastCheckConfig, ProviderSettings, ScoutConfig, Secret},
    providers::{AvailabilityProvider, FastCheckClient, PriceProvider, RetryPolicy},
    research::{AvailabilityChain, DomainResearcher, PriceAggregator, Resolution, ResearchOptions},
    types::{Candidates, DomainOutcome, RegistrarPrice, MAX_CALLS_REACHED, MISSING_CREDENTIALS},
};
use httpmock::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Availability provider with a fixed answer that counts calls.
struct ScriptedProvider {
    answer: Option<bool>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl ScriptedProvider {
    fn build(available: Option<bool>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: available,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay,
        })
    }

    fn always(available: Option<bool>) -> Arc<Self> {
        Self::build(available, Duration::ZERO)
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Self::build(Some(true), delay)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvailabilityProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn check(&self, domain: &str) -> DomainOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if domain.starts_with("boom") {
            panic!("provider exploded on {}", domain);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.answer {
            Some(flag) => DomainOutcome::new(domain, Some(flag), None, "scripted"),
            None => DomainOutcome::failed(domain, "scripted", "transient_network: Network error: reset"),
        }
    }
}

struct FixedPrice {
    name: &'static str,
    price: Option<f64>,
    available: Option<bool>,
}

#[async_trait]
impl PriceProvider for FixedPrice {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn fetch_price(&self, _domain: &str) -> RegistrarPrice {
        RegistrarPrice::new(self.name, self.price, self.available)
    }
}

fn chain(provider: &Arc<ScriptedProvider>) -> Resolution {
    Resolution::Chain(AvailabilityChain::new(vec![
        Arc::clone(provider) as Arc<dyn AvailabilityProvider>
    ]))
}

fn researcher_with(cache: Arc<DomainCache>, resolution: Resolution, max_calls: usize) -> DomainResearcher {
    DomainResearcher::new(
        cache,
        resolution,
        ResearchOptions {
            max_calls,
            concurrency: 10,
        },
    )
}

fn single_name(name: &str, domains: &[String]) -> Candidates {
    let mut candidates = Candidates::new();
    candidates.insert(name.to_string(), domains.to_vec());
    candidates
}

fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{}.com", prefix, i)).collect()
}

#[tokio::test]
async fn test_cache_hit_makes_no_provider_calls() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(DomainCache::open(dir.path().join("cache.sqlite3")).await.unwrap());
    let cached = DomainOutcome::new("acme.com", Some(true), Some(10.0), "stub");
    cache.set("acme.com", &cached).await.unwrap();

    let provider = ScriptedProvider::always(Some(false));
    let researcher = researcher_with(cache, chain(&provider), 80);

    let research = researcher
        .check(&single_name("Acme", &["acme.com".to_string()]))
        .await;

    assert_eq!(provider.calls(), 0);
    assert_eq!(researcher.calls_made(), 0);
    assert_eq!(research["Acme"], vec![("acme.com".to_string(), cached)]);
}

#[tokio::test]
async fn test_quota_limits_dispatch_and_blocked_entries_are_not_cached() {
    let cache = Arc::new(DomainCache::in_memory().await.unwrap());
    let provider = ScriptedProvider::always(Some(true));
    let researcher = researcher_with(cache.clone(), chain(&provider), 3);

    let domains = numbered("quota", 5);
    let research = researcher.check(&single_name("q", &domains)).await;
    let outcomes = &research["q"];

    assert_eq!(provider.calls(), 3);
    assert_eq!(outcomes.len(), 5);
    for (domain, outcome) in &outcomes[..3] {
        assert_eq!(outcome.available, Some(true));
        assert!(cache.get(domain).await.unwrap().is_some());
    }
    for (domain, outcome) in &outcomes[3..] {
        assert_eq!(outcome.provider, "quota");
        assert_eq!(outcome.error.as_deref(), Some(MAX_CALLS_REACHED));
        assert!(outcome.is_quota_blocked());
        assert!(cache.get(domain).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_zero_quota_blocks_everything() {
    let provider = ScriptedProvider::always(Some(true));
    let researcher = researcher_with(Arc::new(DomainCache::in_memory().await.unwrap()), chain(&provider), 0);

    let research = researcher.check(&single_name("z", &numbered("zero", 3))).await;

    assert_eq!(provider.calls(), 0);
    assert!(research["z"].iter().all(|(_, o)| o.is_quota_blocked()));
}

#[tokio::test]
async fn test_best_price_across_registrars() {
    let aggregator = PriceAggregator::new(vec![
        Arc::new(FixedPrice {
            name: "A",
            price: Some(15.99),
            available: Some(true),
        }) as Arc<dyn PriceProvider>,
        Arc::new(FixedPrice {
            name: "B",
            price: Some(12.99),
            available: Some(true),
        }) as Arc<dyn PriceProvider>,
    ]);
    let cache = Arc::new(DomainCache::in_memory().await.unwrap());
    let researcher = researcher_with(cache.clone(), Resolution::Aggregate(aggregator), 10);

    let research = researcher
        .check(&single_name("Acme", &["acme.io".to_string()]))
        .await;
    let (_, outcome) = &research["Acme"][0];

    let comparison = outcome.price_comparison.as_ref().unwrap();
    let best = comparison.best_price().unwrap();
    assert_eq!(best.registrar, "B");
    assert_eq!(best.price_usd, Some(12.99));
    assert_eq!(outcome.price_usd, Some(12.99));
    assert_eq!(outcome.available, Some(true));
    assert_eq!(outcome.provider, "A");

    let stored = cache.get("acme.io").await.unwrap().unwrap();
    assert_eq!(stored.price_usd, Some(12.99));
    assert!(stored.price_comparison.is_none());
}

#[tokio::test]
async fn test_errors_are_cached_and_reused() {
    let cache = Arc::new(DomainCache::in_memory().await.unwrap());
    let provider = ScriptedProvider::always(None);
    let researcher = researcher_with(cache, chain(&provider), 10);
    let candidates = single_name("flaky", &["flaky.ai".to_string()]);

    let first = researcher.check(&candidates).await;
    let second = researcher.check(&candidates).await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(researcher.calls_made(), 1);
    assert_eq!(first["flaky"][0].1.error.as_deref(), Some("no_provider"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_panicking_lookup_only_fails_its_domain() {
    let cache = Arc::new(DomainCache::in_memory().await.unwrap());
    let provider = ScriptedProvider::always(Some(false));
    let researcher = researcher_with(cache, chain(&provider), 10);

    let domains = vec!["fine.com".to_string(), "boom.com".to_string(), "also-fine.com".to_string()];
    let research = researcher.check(&single_name("mixed", &domains)).await;
    let outcomes = &research["mixed"];

    assert_eq!(outcomes[0].1.available, Some(false));
    assert_eq!(outcomes[2].1.available, Some(false));

    let exploded = &outcomes[1].1;
    assert_eq!(exploded.provider, "error");
    assert!(exploded.available.is_none());
    assert!(exploded.error.as_deref().unwrap().contains("provider exploded"));
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let provider = ScriptedProvider::slow(Duration::from_millis(20));
    let researcher = DomainResearcher::new(
        Arc::new(DomainCache::in_memory().await.unwrap()),
        chain(&provider),
        ResearchOptions {
            max_calls: 100,
            concurrency: 2,
        },
    );

    let research = researcher.check(&single_name("c", &numbered("slow", 8))).await;

    assert_eq!(research["c"].len(), 8);
    assert_eq!(provider.calls(), 8);
    assert!(provider.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_batch_strategy_chunks_and_preserves_order() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/domains/check");
            then.status(200).json_body(json!({
                "results": [{ "domain": "batch0.com", "available": true, "price_usd": 9.99 }]
            }));
        })
        .await;

    let client = FastCheckClient::new(
        FastCheckConfig {
            settings: ProviderSettings::new(server.url("/v1/domains/check"), 0.0, 1),
            api_key: Some(Secret::new("key")),
            batch_size: 20,
        },
        RetryPolicy::none(),
    )
    .unwrap();
    let cache = Arc::new(DomainCache::in_memory().await.unwrap());
    let researcher = researcher_with(cache.clone(), Resolution::Batch(Arc::new(client)), 100);

    let domains = numbered("batch", 25);
    let research = researcher.check(&single_name("b", &domains)).await;
    let outcomes = &research["b"];

    assert_eq!(mock.hits_async().await, 2);
    assert_eq!(outcomes.len(), 25);
    for ((domain, outcome), expected) in outcomes.iter().zip(&domains) {
        assert_eq!(domain, expected);
        assert_eq!(&outcome.domain, expected);
    }
    assert_eq!(outcomes[0].1.price_usd, Some(9.99));
    assert_eq!(outcomes[1].1.error.as_deref(), Some("missing_result"));
    assert_eq!(cache.len().await.unwrap(), 25);
}

#[tokio::test]
async fn test_configured_researcher_end_to_end() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v4/domains:checkAvailability");
            then.status(200).json_body(json!({
                "results": [{ "purchasable": true, "purchasePrice": { "amount": 11.5 } }]
            }));
        })
        .await;

    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("scout.sqlite3");
    let vars: HashMap<&str, String> = HashMap::from([
        ("DOMAIN_CACHE_PATH", cache_path.to_string_lossy().to_string()),
        ("NAME_COM_BASE", server.url("/v4")),
        ("NAME_COM_USERNAME", "alice".to_string()),
        ("NAME_COM_API_KEY", "token".to_string()),
        ("NAMECOM_RPS", "0".to_string()),
    ]);
    let config = ScoutConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
    let researcher = DomainResearcher::from_config(&config).await.unwrap();
    assert_eq!(researcher.resolution().label(), "multi-registrar");

    let research = researcher
        .check(&single_name("Rocket", &["rocket.dev".to_string()]))
        .await;
    let outcome = &research["Rocket"][0].1;

    mock.assert_async().await;
    assert_eq!(outcome.provider, "namecom");
    assert_eq!(outcome.available, Some(true));
    assert_eq!(outcome.price_usd, Some(11.5));

    let comparison = outcome.price_comparison.as_ref().unwrap();
    let errors: Vec<_> = comparison
        .prices()
        .iter()
        .filter(|p| p.registrar != "namecom")
        .map(|p| p.error.as_deref())
        .collect();
    assert_eq!(errors, vec![Some(MISSING_CREDENTIALS); 3]);

    drop(researcher);
    let reopened = DomainCache::open(&cache_path).await.unwrap();
    assert_eq!(reopened.get("rocket.dev").await.unwrap().unwrap().provider, "namecom");
}
