//! Name.com provider
//!
//! Uses the v4 `domains:checkAvailability` endpoint, which answers both
//! availability and pricing in one call, so the same client serves the
//! price aggregator and the availability chain.

use crate::config::{NameComConfig, Secret};
use crate::error::{DomainScoutError, Result};
use crate::providers::http::{self, RetryPolicy};
use crate::providers::{parse_amount, AvailabilityProvider, PriceProvider};
use crate::ratelimit::TokenBucket;
use crate::types::{DomainOutcome, RegistrarPrice};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const NAME: &str = "namecom";

/// Name.com API client
pub struct NameComClient {
    client: Client,
    config: NameComConfig,
    limiter: TokenBucket,
    retry: RetryPolicy,
}

/// What one availability check reported.
#[derive(Debug, Clone, PartialEq)]
struct NameComAnswer {
    purchasable: bool,
    purchase_price: Option<f64>,
    renewal_price: Option<f64>,
}

impl NameComClient {
    pub fn new(config: NameComConfig, retry: RetryPolicy) -> Result<Self> {
        let client = http::build_client(config.settings.timeout)?;
        let limiter = TokenBucket::new(config.settings.rate_per_sec, config.settings.burst);
        Ok(Self {
            client,
            config,
            limiter,
            retry,
        })
    }

    fn credentials(&self) -> Option<(&str, &Secret)> {
        if !self.config.settings.enabled {
            return None;
        }
        match (&self.config.username, &self.config.api_token) {
            (Some(user), Some(token)) => Some((user.as_str(), token)),
            _ => None,
        }
    }

    async fn query(&self, domain: &str) -> Result<NameComAnswer> {
        let (username, token) = self
            .credentials()
            .ok_or_else(|| DomainScoutError::missing_credentials(NAME))?;
        let url = format!(
            "{}/domains:checkAvailability",
            self.config.settings.base_url.trim_end_matches('/')
        );
        let payload = json!({ "domainNames": [domain] });
        let (client, url, payload) = (&self.client, url.as_str(), &payload);

        http::with_retry(NAME, &self.limiter, &self.retry, self.config.settings.timeout, move || async move {
            let response = client
                .post(url)
                .basic_auth(username, Some(token.expose()))
                .json(payload)
                .send()
                .await?;
            let body = http::read_json(NAME, response).await?;
            Ok::<_, DomainScoutError>(parse_answer(&body))
        })
        .await
    }
}

/// Read the first entry of `results`. Absent fields mean "not purchasable"
/// and "no price".
fn parse_answer(body: &Value) -> NameComAnswer {
    let item = body
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .cloned()
        .unwrap_or(Value::Null);

    NameComAnswer {
        purchasable: item.get("purchasable").and_then(Value::as_bool).unwrap_or(false),
        purchase_price: item.pointer("/purchasePrice/amount").and_then(parse_amount),
        renewal_price: item.pointer("/renewalPrice/amount").and_then(parse_amount),
    }
}

fn registration_url(domain: &str) -> String {
    format!("https://www.name.com/domain/search/{}", domain)
}

#[async_trait]
impl PriceProvider for NameComClient {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.config.settings.enabled
    }

    async fn fetch_price(&self, domain: &str) -> RegistrarPrice {
        match self.query(domain).await {
            Ok(answer) => RegistrarPrice::new(NAME, answer.purchase_price, Some(answer.purchasable))
                .with_renewal_price(answer.renewal_price)
                .with_registration_url(answer.purchasable.then(|| registration_url(domain))),
            Err(e) => RegistrarPrice::failed(NAME, e.to_outcome_error()),
        }
    }
}

#[async_trait]
impl AvailabilityProvider for NameComClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn check(&self, domain: &str) -> DomainOutcome {
        match self.query(domain).await {
            Ok(answer) => DomainOutcome::new(domain, Some(answer.purchasable), answer.purchase_price, NAME),
            Err(e) => DomainOutcome::failed(domain, NAME, e.to_outcome_error()),
        }
    }
}
