//! Domainr status API, availability only

use crate::config::DomainrConfig;
use crate::error::{DomainScoutError, Result};
use crate::providers::http::{self, RetryPolicy};
use crate::providers::AvailabilityProvider;
use crate::ratelimit::TokenBucket;
use crate::types::DomainOutcome;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const NAME: &str = "domainr";

/// Status words that mean the name can be registered.
const OPEN_STATUSES: [&str; 3] = ["inactive", "undelegated", "available"];

pub struct DomainrClient {
    client: Client,
    config: DomainrConfig,
    limiter: TokenBucket,
    retry: RetryPolicy,
}

impl DomainrClient {
    pub fn new(config: DomainrConfig, retry: RetryPolicy) -> Result<Self> {
        let client = http::build_client(config.settings.timeout)?;
        let limiter = TokenBucket::new(config.settings.rate_per_sec, config.settings.burst);
        Ok(Self {
            client,
            config,
            limiter,
            retry,
        })
    }

    async fn query(&self, domain: &str) -> Result<Option<bool>> {
        let key = match &self.config.api_key {
            Some(key) if self.config.settings.enabled => key.expose(),
            _ => return Err(DomainScoutError::missing_credentials(NAME)),
        };
        let url = format!("{}/v2/status", self.config.settings.base_url.trim_end_matches('/'));
        let (client, url) = (&self.client, url.as_str());

        http::with_retry(NAME, &self.limiter, &self.retry, self.config.settings.timeout, move || async move {
            let response = client
                .get(url)
                .query(&[("domain", domain), ("key", key)])
                .send()
                .await?;
            let body = http::read_json(NAME, response).await?;
            Ok::<_, DomainScoutError>(parse_status(&body))
        })
        .await
    }
}

/// Availability from the first status entry; `None` when there is none.
fn parse_status(body: &Value) -> Option<bool> {
    let status = body
        .get("status")?
        .as_array()?
        .first()?
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(OPEN_STATUSES.iter().any(|open| status.contains(open)))
}

#[async_trait]
impl AvailabilityProvider for DomainrClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn check(&self, domain: &str) -> DomainOutcome {
        match self.query(domain).await {
            Ok(available) => DomainOutcome::new(domain, available, None, NAME),
            Err(e) => DomainOutcome::failed(domain, NAME, e.to_outcome_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderSettings, Secret};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_status_words() {
        let parse = |s: &str| parse_status(&json!({ "status": [{ "domain": "x.io", "status": s }] }));
        assert_eq!(parse("undelegated inactive"), Some(true));
        assert_eq!(parse("inactive"), Some(true));
        assert_eq!(parse("active registrar"), Some(false));
        assert_eq!(parse_status(&json!({ "status": [] })), None);
        assert_eq!(parse_status(&json!({})), None);
    }

    #[tokio::test]
    async fn test_check_sends_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2/status")
                    .query_param("domain", "acme.io")
                    .query_param("key", "secret");
                then.status(200)
                    .json_body(json!({ "status": [{ "domain": "acme.io", "status": "undelegated inactive" }] }));
            })
            .await;

        let client = DomainrClient::new(
            DomainrConfig {
                settings: ProviderSettings::new(server.base_url(), 0.0, 1),
                api_key: Some(Secret::new("secret")),
            },
            RetryPolicy::none(),
        )
        .unwrap();

        let outcome = client.check("acme.io").await;
        mock.assert_async().await;
        assert_eq!(outcome.available, Some(true));
        assert_eq!(outcome.provider, "domainr");
        assert!(outcome.error.is_none());
    }
}
