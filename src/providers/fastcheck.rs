//! FastDomainCheck bulk availability service
//!
//! Accepts up to `batch_size` domains per request. Larger inputs are split
//! into chunks; whatever the service returns, the answer has exactly one
//! outcome per requested domain, in request order.

use crate::config::FastCheckConfig;
use crate::error::{DomainScoutError, Result};
use crate::providers::http::{self, RetryPolicy};
use crate::providers::{parse_amount, BatchProvider};
use crate::ratelimit::TokenBucket;
use crate::types::{DomainOutcome, MISSING_CREDENTIALS};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;

const NAME: &str = "fastcheck";

pub struct FastCheckClient {
    client: Client,
    config: FastCheckConfig,
    limiter: TokenBucket,
    retry: RetryPolicy,
}

impl FastCheckClient {
    pub fn new(config: FastCheckConfig, retry: RetryPolicy) -> Result<Self> {
        let client = http::build_client(config.settings.timeout)?;
        let limiter = TokenBucket::new(config.settings.rate_per_sec, config.settings.burst);
        Ok(Self {
            client,
            config,
            limiter,
            retry,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.settings.enabled
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    async fn post_chunk(&self, token: &str, chunk: &[String]) -> Result<Vec<DomainOutcome>> {
        let payload = json!({ "domains": chunk, "include_pricing": true });
        let (client, url, payload) = (&self.client, self.config.settings.base_url.as_str(), &payload);

        let body = http::with_retry(NAME, &self.limiter, &self.retry, self.config.settings.timeout, move || async move {
            let response = client.post(url).bearer_auth(token).json(payload).send().await?;
            http::read_json(NAME, response).await
        })
        .await?;

        let items = body
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| DomainScoutError::protocol(NAME, "response has no results array"))?;
        Ok(align_results(chunk, items))
    }
}

/// An item without availability always carries an error, its own when it
/// gave one.
fn outcome_from_item(domain: &str, item: &Value) -> DomainOutcome {
    let available = item.get("available").and_then(Value::as_bool);
    let error = item
        .get("error")
        .and_then(Value::as_str)
        .filter(|e| !e.trim().is_empty())
        .map(str::to_string);
    let error = match (available, error) {
        (None, None) => Some(
            DomainScoutError::protocol(NAME, "result has no availability").to_outcome_error(),
        ),
        (_, error) => error,
    };

    DomainOutcome {
        domain: domain.to_string(),
        available,
        price_usd: item.get("price_usd").and_then(parse_amount),
        provider: NAME.to_string(),
        error,
        price_comparison: None,
    }
}

/// Match returned items to requested domains: by echoed name when every
/// item carries one, by position otherwise. Gaps become `missing_result`.
fn align_results(requested: &[String], items: &[Value]) -> Vec<DomainOutcome> {
    let names: Option<Vec<String>> = items
        .iter()
        .map(|item| {
            item.get("domain")
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
                .map(str::to_ascii_lowercase)
        })
        .collect();

    match names {
        Some(names) => {
            let mut by_name: HashMap<String, &Value> = HashMap::with_capacity(items.len());
            for (name, item) in names.into_iter().zip(items) {
                by_name.entry(name).or_insert(item);
            }
            requested
                .iter()
                .map(|domain| match by_name.get(&domain.to_ascii_lowercase()) {
                    Some(item) => outcome_from_item(domain, item),
                    None => DomainOutcome::missing_result(domain.as_str(), NAME),
                })
                .collect()
        }
        None => requested
            .iter()
            .enumerate()
            .map(|(i, domain)| match items.get(i) {
                Some(item) => outcome_from_item(domain, item),
                None => DomainOutcome::missing_result(domain.as_str(), NAME),
            })
            .collect(),
    }
}

#[async_trait]
impl BatchProvider for FastCheckClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn check_batch(&self, domains: &[String]) -> Vec<DomainOutcome> {
        let token = match &self.config.api_key {
            Some(key) if self.is_enabled() => key.expose(),
            _ => {
                return domains
                    .iter()
                    .map(|d| DomainOutcome::failed(d.as_str(), NAME, MISSING_CREDENTIALS))
                    .collect()
            }
        };

        let mut outcomes = Vec::with_capacity(domains.len());
        for (index, chunk) in domains.chunks(self.batch_size()).enumerate() {
            let started = Instant::now();
            match self.post_chunk(token, chunk).await {
                Ok(results) => {
                    tracing::debug!(
                        chunk = index,
                        size = chunk.len(),
                        duration_ms = %started.elapsed().as_millis(),
                        "Batch chunk resolved"
                    );
                    outcomes.extend(results);
                }
                Err(e) => {
                    tracing::warn!(chunk = index, size = chunk.len(), error = %e, "Batch chunk failed");
                    let error = format!("batch_error: {}", e.to_outcome_error());
                    outcomes.extend(
                        chunk
                            .iter()
                            .map(|d| DomainOutcome::failed(d.as_str(), NAME, error.as_str())),
                    );
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderSettings, Secret};
    use crate::types::MISSING_RESULT;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn client_for(server: &MockServer, batch_size: usize) -> FastCheckClient {
        let config = FastCheckConfig {
            settings: ProviderSettings::new(server.url("/v1/domains/check"), 0.0, 1),
            api_key: Some(Secret::new("mcp-key")),
            batch_size,
        };
        FastCheckClient::new(config, RetryPolicy::new(vec![Duration::ZERO])).unwrap()
    }

    fn domains(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("name{}.com", i)).collect()
    }

    #[tokio::test]
    async fn test_chunks_preserve_order_and_length() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/domains/check")
                    .header("Authorization", "Bearer mcp-key");
                then.status(200).json_body(json!({ "results": [] }));
            })
            .await;

        let input = domains(25);
        let outcomes = client_for(&server, 20).check_batch(&input).await;

        assert_eq!(mock.hits_async().await, 2);
        assert_eq!(outcomes.len(), 25);
        for (outcome, domain) in outcomes.iter().zip(&input) {
            assert_eq!(&outcome.domain, domain);
            assert_eq!(outcome.error.as_deref(), Some(MISSING_RESULT));
        }
    }

    #[tokio::test]
    async fn test_results_are_matched_by_name() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/domains/check")
                    .json_body(json!({ "domains": ["a.com", "b.com", "c.com"], "include_pricing": true }));
                then.status(200).json_body(json!({
                    "results": [
                        { "domain": "c.com", "available": false },
                        { "domain": "a.com", "available": true, "price_usd": 9.5 }
                    ]
                }));
            })
            .await;

        let input = vec!["a.com".to_string(), "b.com".to_string(), "c.com".to_string()];
        let outcomes = client_for(&server, 20).check_batch(&input).await;

        assert_eq!(outcomes[0].available, Some(true));
        assert_eq!(outcomes[0].price_usd, Some(9.5));
        assert_eq!(outcomes[1].error.as_deref(), Some(MISSING_RESULT));
        assert_eq!(outcomes[2].available, Some(false));
        assert!(outcomes.iter().all(|o| o.provider == "fastcheck"));
    }

    #[test]
    fn test_positional_fallback() {
        let requested = vec!["a.com".to_string(), "b.com".to_string()];
        let items = vec![json!({ "available": true })];
        let outcomes = align_results(&requested, &items);
        assert_eq!(outcomes[0].domain, "a.com");
        assert_eq!(outcomes[0].available, Some(true));
        assert_eq!(outcomes[1].error.as_deref(), Some(MISSING_RESULT));
    }

    #[test]
    fn test_unknown_availability_always_has_an_error() {
        let requested = vec!["a.com".to_string(), "b.com".to_string(), "c.com".to_string()];
        let items = vec![
            json!({ "domain": "a.com" }),
            json!({ "domain": "b.com", "error": "registry timeout" }),
            json!({ "domain": "c.com", "available": false, "error": "" }),
        ];
        let outcomes = align_results(&requested, &items);

        assert!(outcomes[0].available.is_none());
        let error = outcomes[0].error.as_deref().unwrap();
        assert!(error.starts_with("provider_protocol: "));
        assert!(error.contains("result has no availability"));

        assert_eq!(outcomes[1].error.as_deref(), Some("registry timeout"));

        assert_eq!(outcomes[2].available, Some(false));
        assert!(outcomes[2].error.is_none());
    }

    #[tokio::test]
    async fn test_failed_chunk_marks_every_domain() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/domains/check");
                then.status(500);
            })
            .await;

        let outcomes = client_for(&server, 20).check_batch(&domains(3)).await;

        assert_eq!(mock.hits_async().await, 2);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| o.available.is_none() && o.error.as_deref().is_some_and(|e| e.starts_with("batch_error"))));
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_calls() {
        let config = FastCheckConfig {
            settings: FastCheckConfig::default().settings.with_rate(0.0, 1),
            ..FastCheckConfig::default()
        };
        let client = FastCheckClient::new(config, RetryPolicy::none()).unwrap();
        let outcomes = client.check_batch(&domains(2)).await;
        assert!(outcomes.iter().all(|o| o.error.as_deref() == Some(MISSING_CREDENTIALS)));
    }
}
