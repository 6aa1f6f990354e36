//! Multi-registrar price comparison

use crate::providers::PriceProvider;
use crate::research::join_error_message;
use crate::types::{PriceComparison, RegistrarPrice};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;

/// Queries every enabled registrar for one domain at the same time and
/// keeps the cheapest real offer.
#[derive(Clone)]
pub struct PriceAggregator {
    providers: Vec<Arc<dyn PriceProvider>>,
}

impl PriceAggregator {
    /// `providers` in declaration order; that order is kept in every
    /// comparison this aggregator produces.
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn PriceProvider>] {
        &self.providers
    }

    pub fn enabled_count(&self) -> usize {
        self.providers.iter().filter(|p| p.is_enabled()).count()
    }

    /// Ask every enabled provider about `domain`.
    ///
    /// Each provider runs in its own task, so one that panics yields a
    /// failed entry for itself and leaves the others untouched.
    pub async fn compare(&self, domain: &str) -> PriceComparison {
        let started = Instant::now();
        let enabled: Vec<_> = self.providers.iter().filter(|p| p.is_enabled()).cloned().collect();
        if enabled.is_empty() {
            tracing::debug!(domain = %domain, "No registrars enabled");
            return PriceComparison::new(domain, Vec::new());
        }

        let tasks = enabled.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let domain = domain.to_string();
            tokio::spawn(async move { provider.fetch_price(&domain).await })
        });
        let results = join_all(tasks).await;

        let prices: Vec<RegistrarPrice> = enabled
            .iter()
            .zip(results)
            .map(|(provider, result)| match result {
                Ok(price) => price,
                Err(e) => {
                    let message = join_error_message(e);
                    tracing::warn!(domain = %domain, registrar = provider.name(), error = %message, "Registrar task failed");
                    RegistrarPrice::failed(provider.name(), message)
                }
            })
            .collect();

        let comparison = PriceComparison::new(domain, prices);
        tracing::debug!(
            domain = %domain,
            registrars = comparison.prices().len(),
            best = ?comparison.best_price().map(|b| b.registrar.as_str()),
            duration_ms = %started.elapsed().as_millis(),
            "Price comparison completed"
        );
        comparison
    }
}
