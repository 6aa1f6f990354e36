//! Namecheap provider
//!
//! The `namecheap.domains.check` command answers availability in XML.
//! Standard pricing lives behind a separate `users.getPricing` call, so only
//! premium names come back priced.

use crate::config::NamecheapConfig;
use crate::error::{DomainScoutError, Result};
use crate::providers::http::{self, RetryPolicy};
use crate::providers::PriceProvider;
use crate::ratelimit::TokenBucket;
use crate::types::{RegistrarPrice, PRICING_REQUIRES_SEPARATE_API_CALL};
use async_trait::async_trait;
use reqwest::Client;

const NAME: &str = "namecheap";

pub struct NamecheapClient {
    client: Client,
    config: NamecheapConfig,
    limiter: TokenBucket,
    retry: RetryPolicy,
}

/// Attributes of one `<DomainCheckResult>` element.
#[derive(Debug, Clone, PartialEq)]
struct CheckResult {
    available: bool,
    premium_price: Option<f64>,
}

impl NamecheapClient {
    pub fn new(config: NamecheapConfig, retry: RetryPolicy) -> Result<Self> {
        let client = http::build_client(config.settings.timeout)?;
        let limiter = TokenBucket::new(config.settings.rate_per_sec, config.settings.burst);
        Ok(Self {
            client,
            config,
            limiter,
            retry,
        })
    }

    async fn query(&self, domain: &str) -> Result<CheckResult> {
        let (user, key) = match (&self.config.api_user, &self.config.api_key) {
            (Some(user), Some(key)) if self.config.settings.enabled => (user.as_str(), key.expose()),
            _ => return Err(DomainScoutError::missing_credentials(NAME)),
        };
        let params = [
            ("ApiUser", user),
            ("ApiKey", key),
            ("UserName", user),
            ("ClientIp", self.config.client_ip.as_str()),
            ("Command", "namecheap.domains.check"),
            ("DomainList", domain),
        ];
        let (client, url, params) = (&self.client, self.config.settings.base_url.as_str(), &params);

        http::with_retry(NAME, &self.limiter, &self.retry, self.config.settings.timeout, move || async move {
            let response = client.get(url).query(params).send().await?;
            let body = http::read_text(NAME, response).await?;
            parse_check_response(&body)
        })
        .await
    }
}

fn parse_check_response(xml: &str) -> Result<CheckResult> {
    if let Some(root) = tag_fragment(xml, "ApiResponse") {
        if extract_attr(root, "Status").as_deref() == Some("ERROR") {
            let message = extract_text(xml, "Error").unwrap_or_else(|| "unspecified API error".to_string());
            return Err(DomainScoutError::protocol(NAME, message));
        }
    }

    let result = tag_fragment(xml, "DomainCheckResult")
        .ok_or_else(|| DomainScoutError::protocol(NAME, "response has no DomainCheckResult"))?;
    let available = extract_attr(result, "Available")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .ok_or_else(|| DomainScoutError::protocol(NAME, "DomainCheckResult has no Available attribute"))?;
    let premium = extract_attr(result, "IsPremiumName").is_some_and(|v| v.eq_ignore_ascii_case("true"));
    let premium_price = premium
        .then(|| extract_attr(result, "PremiumRegistrationPrice"))
        .flatten()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p > 0.0);

    Ok(CheckResult {
        available,
        premium_price,
    })
}

/// The opening tag of the first `<tag ...>` element, attributes included.
fn tag_fragment<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let start = xml.find(&format!("<{} ", tag))?;
    let end = xml[start..].find('>')?;
    Some(&xml[start..start + end + 1])
}

fn extract_attr(fragment: &str, attr: &str) -> Option<String> {
    let needle = format!(" {}=\"", attr);
    let start = fragment.find(&needle)? + needle.len();
    let end = fragment[start..].find('"')?;
    Some(fragment[start..start + end].to_string())
}

/// Text of the first `<tag>` or `<tag ...>` element. Longer tag names that
/// merely start with `tag` are skipped.
fn extract_text(xml: &str, tag: &str) -> Option<String> {
    let open = [format!("<{}>", tag), format!("<{} ", tag)]
        .iter()
        .filter_map(|needle| xml.find(needle.as_str()))
        .min()?;
    let content_start = open + xml[open..].find('>')? + 1;
    let end = xml[content_start..].find(&format!("</{}>", tag))?;
    Some(xml[content_start..content_start + end].trim().to_string())
}

#[async_trait]
impl PriceProvider for NamecheapClient {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.config.settings.enabled
    }

    async fn fetch_price(&self, domain: &str) -> RegistrarPrice {
        match self.query(domain).await {
            Ok(result) => {
                let url = result.available.then(|| {
                    format!("https://www.namecheap.com/domains/registration/results/?domain={}", domain)
                });
                let price = RegistrarPrice::new(NAME, result.premium_price, Some(result.available))
                    .with_registration_url(url);
                match result.premium_price {
                    Some(_) => price,
                    None => price.with_error(PRICING_REQUIRES_SEPARATE_API_CALL),
                }
            }
            Err(e) => RegistrarPrice::failed(NAME, e.to_outcome_error()),
        }
    }
}
