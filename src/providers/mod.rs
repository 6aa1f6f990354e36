//! Registrar and availability provider clients
//!
//! Every client is its own failure domain: it owns its rate limiter, its
//! timeout and its retry loop, and it turns every failure into a value.
//! Nothing a provider does can surface as an `Err` to the caller.

pub mod cloudflare;
pub mod domainr;
pub mod fastcheck;
pub mod godaddy;
pub mod http;
pub mod namecheap;
pub mod namecom;

pub use cloudflare::CloudflareClient;
pub use domainr::DomainrClient;
pub use fastcheck::FastCheckClient;
pub use godaddy::GoDaddyClient;
pub use http::RetryPolicy;
pub use namecheap::NamecheapClient;
pub use namecom::NameComClient;

use crate::config::ScoutConfig;
use crate::error::Result;
use crate::types::{DomainOutcome, RegistrarPrice};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A registrar that can quote a price for one domain.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Stable registrar identifier, e.g. `"godaddy"`.
    fn name(&self) -> &'static str;

    /// Administrative enable flag. Disabled providers are not dispatched.
    fn is_enabled(&self) -> bool;

    async fn fetch_price(&self, domain: &str) -> RegistrarPrice;
}

/// A service that reports availability (and maybe a price) for one domain.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, domain: &str) -> DomainOutcome;
}

/// A service that answers many domains per request.
#[async_trait]
pub trait BatchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// One outcome per input domain, in input order.
    async fn check_batch(&self, domains: &[String]) -> Vec<DomainOutcome>;
}

/// Every client the configuration describes, shared across strategies so a
/// provider used by both the aggregator and the chain keeps one limiter.
pub struct ProviderSet {
    pub namecom: Arc<NameComClient>,
    pub godaddy: Arc<GoDaddyClient>,
    pub cloudflare: Arc<CloudflareClient>,
    pub namecheap: Arc<NamecheapClient>,
    pub domainr: Arc<DomainrClient>,
    pub fastcheck: Arc<FastCheckClient>,
}

impl ProviderSet {
    pub fn from_config(config: &ScoutConfig) -> Result<Self> {
        let retry = RetryPolicy::new(config.retry_backoff.clone());
        Ok(Self {
            namecom: Arc::new(NameComClient::new(config.namecom.clone(), retry.clone())?),
            godaddy: Arc::new(GoDaddyClient::new(config.godaddy.clone(), retry.clone())?),
            cloudflare: Arc::new(CloudflareClient::new(config.cloudflare.clone())),
            namecheap: Arc::new(NamecheapClient::new(config.namecheap.clone(), retry.clone())?),
            domainr: Arc::new(DomainrClient::new(config.domainr.clone(), retry.clone())?),
            fastcheck: Arc::new(FastCheckClient::new(config.fastcheck.clone(), retry)?),
        })
    }

    /// Pricing providers in declaration order; this order breaks ties when
    /// registrars disagree about availability.
    pub fn pricing(&self) -> Vec<Arc<dyn PriceProvider>> {
        vec![
            self.namecom.clone() as Arc<dyn PriceProvider>,
            self.godaddy.clone() as Arc<dyn PriceProvider>,
            self.cloudflare.clone() as Arc<dyn PriceProvider>,
            self.namecheap.clone() as Arc<dyn PriceProvider>,
        ]
    }

    /// Availability providers in preference order.
    pub fn availability_chain(&self) -> Vec<Arc<dyn AvailabilityProvider>> {
        vec![
            self.namecom.clone() as Arc<dyn AvailabilityProvider>,
            self.domainr.clone() as Arc<dyn AvailabilityProvider>,
        ]
    }
}

/// Read a money amount that may arrive as a number or a numeric string.
pub(crate) fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    amount.is_finite().then_some(amount).filter(|a| *a >= 0.0)
}
