//! GoDaddy provider
//!
//! GoDaddy quotes prices in micro-units of the listed currency, either as a
//! bare number or as `{ "amount": .. }`. Only USD quotes are reported as
//! prices; other currencies keep availability and record an error.

use crate::config::{GoDaddyConfig, Secret};
use crate::error::{DomainScoutError, Result};
use crate::providers::http::{self, RetryPolicy};
use crate::providers::{parse_amount, PriceProvider};
use crate::ratelimit::TokenBucket;
use crate::types::RegistrarPrice;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const NAME: &str = "godaddy";
const MICROS_PER_UNIT: f64 = 1_000_000.0;

pub struct GoDaddyClient {
    client: Client,
    config: GoDaddyConfig,
    limiter: TokenBucket,
    retry: RetryPolicy,
}

impl GoDaddyClient {
    pub fn new(config: GoDaddyConfig, retry: RetryPolicy) -> Result<Self> {
        let client = http::build_client(config.settings.timeout)?;
        let limiter = TokenBucket::new(config.settings.rate_per_sec, config.settings.burst);
        Ok(Self {
            client,
            config,
            limiter,
            retry,
        })
    }

    fn authorization(&self) -> Option<String> {
        if !self.config.settings.enabled {
            return None;
        }
        match (&self.config.api_key, &self.config.api_secret) {
            (Some(key), Some(secret)) => Some(sso_key(key, secret)),
            _ => None,
        }
    }

    async fn query(&self, domain: &str) -> Result<RegistrarPrice> {
        let authorization = self
            .authorization()
            .ok_or_else(|| DomainScoutError::missing_credentials(NAME))?;
        let url = format!(
            "{}/domains/available",
            self.config.settings.base_url.trim_end_matches('/')
        );
        let (client, url, authorization) = (&self.client, url.as_str(), authorization.as_str());

        http::with_retry(NAME, &self.limiter, &self.retry, self.config.settings.timeout, move || async move {
            let response = client
                .get(url)
                .query(&[("domain", domain)])
                .header("Authorization", authorization)
                .header("Accept", "application/json")
                .send()
                .await?;
            let body = http::read_json(NAME, response).await?;
            Ok::<_, DomainScoutError>(parse_price(domain, &body))
        })
        .await
    }
}

fn sso_key(key: &Secret, secret: &Secret) -> String {
    format!("sso-key {}:{}", key.expose(), secret.expose())
}

fn parse_price(domain: &str, body: &Value) -> RegistrarPrice {
    let available = body.get("available").and_then(Value::as_bool).unwrap_or(false);
    let price = body
        .get("price")
        .and_then(|price| match price {
            Value::Object(_) => price.get("amount").and_then(parse_amount),
            other => parse_amount(other),
        })
        .map(|micros| micros / MICROS_PER_UNIT);
    let currency = body
        .get("currency")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("USD")
        .to_ascii_uppercase();
    let is_usd = currency == "USD";

    let quote = RegistrarPrice::new(NAME, price.filter(|_| is_usd), Some(available))
        .with_currency(currency.as_str())
        .with_registration_url(available.then(|| {
            format!("https://www.godaddy.com/domainsearch/find?domainToCheck={}", domain)
        }));
    match price {
        Some(_) if !is_usd => quote.with_error(format!("unsupported_currency: {}", currency)),
        _ => quote,
    }
}

#[async_trait]
impl PriceProvider for GoDaddyClient {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.config.settings.enabled
    }

    async fn fetch_price(&self, domain: &str) -> RegistrarPrice {
        self.query(domain)
            .await
            .unwrap_or_else(|e| RegistrarPrice::failed(NAME, e.to_outcome_error()))
    }
}
